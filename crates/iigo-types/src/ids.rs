//! Type-safe identifiers for the governance simulation.
//!
//! Islands are addressed by a small, totally ordered [`ClientId`] that stays
//! stable for the whole run. Its ordering is load-bearing: every
//! deterministic tie-break in the governance layer resolves to the lowest
//! `ClientId`.
//!
//! Ledger entries only need uniqueness and use UUID v7. Election ids are
//! derived from the turn and the contested role, so the same run always
//! logs the same ids.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::Role;

/// Identifier of an island (agent) taking part in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(pub u32);

impl ClientId {
    /// Return the raw numeric identifier.
    pub const fn into_inner(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for ClientId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "island-{}", self.0)
    }
}

impl From<u32> for ClientId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_id! {
    /// Unique identifier for a treasury ledger entry.
    LedgerEntryId
}

define_id! {
    /// Identifier for a single election run.
    ElectionId
}

impl LedgerEntryId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for LedgerEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl ElectionId {
    /// Identifier of the election for `role` held in `turn`.
    ///
    /// At most one election per role runs in a turn, so the pair is unique
    /// within a run.
    pub const fn for_turn(turn: u64, role: Role) -> Self {
        let seat = match role {
            Role::President => 1,
            Role::Judge => 2,
            Role::Speaker => 3,
        };
        Self(Uuid::from_u64_pair(turn, seat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ids_order_numerically() {
        let mut ids = vec![ClientId(4), ClientId(0), ClientId(2)];
        ids.sort();
        assert_eq!(ids, vec![ClientId(0), ClientId(2), ClientId(4)]);
    }

    #[test]
    fn client_id_serializes_as_number() {
        let json = serde_json::to_string(&ClientId(3)).ok();
        assert_eq!(json.as_deref(), Some("3"));
    }

    #[test]
    fn uuid_ids_are_unique() {
        assert_ne!(LedgerEntryId::new(), LedgerEntryId::new());
    }

    #[test]
    fn election_ids_follow_turn_and_role() {
        assert_eq!(
            ElectionId::for_turn(4, Role::Judge),
            ElectionId::for_turn(4, Role::Judge)
        );
        assert_ne!(
            ElectionId::for_turn(4, Role::Judge),
            ElectionId::for_turn(4, Role::Speaker)
        );
        assert_ne!(
            ElectionId::for_turn(4, Role::Judge),
            ElectionId::for_turn(5, Role::Judge)
        );
        assert_ne!(ElectionId::for_turn(0, Role::President).into_inner(), Uuid::nil());
    }
}
