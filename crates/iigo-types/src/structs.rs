//! Plain data structures exchanged between islands and the governance layer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{
    CommunicationFieldName, EntityType, LedgerEntryType, PresidentContentType, SanctionTier,
    VariableFieldName,
};
use crate::ids::{ClientId, LedgerEntryId};

/// An amount of resources. Uses [`Decimal`] so that treasury arithmetic is
/// exact.
pub type Resources = Decimal;

// ---------------------------------------------------------------------------
// Accountability
// ---------------------------------------------------------------------------

/// A named variable paired with its value for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableValuePair {
    /// Which variable this is.
    pub name: VariableFieldName,
    /// The value reported or derived for it.
    pub value: Decimal,
}

impl VariableValuePair {
    /// Pair a variable name with a value.
    pub const fn new(name: VariableFieldName, value: Decimal) -> Self {
        Self { name, value }
    }
}

/// A batch of variable values concerning one island.
///
/// A single turn may contain several records for the same island; they are
/// merged before history is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accountability {
    /// The island the values belong to.
    pub client_id: ClientId,
    /// The reported and derived values.
    pub pairs: Vec<VariableValuePair>,
}

/// Outcome of the external monitoring of a role-holder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorResult {
    /// Whether any monitoring took place this turn.
    pub performed: bool,
    /// If performed, whether the role-holder was found compliant.
    pub result: bool,
}

// ---------------------------------------------------------------------------
// Sanctions
// ---------------------------------------------------------------------------

/// A sanction in force against an island.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sanction {
    /// The sanctioned island.
    pub client_id: ClientId,
    /// How severe the sanction is.
    pub tier: SanctionTier,
    /// Remaining duration in turns.
    pub turns_left: u32,
}

// ---------------------------------------------------------------------------
// Reports and decisions
// ---------------------------------------------------------------------------

/// What an island disclosed about its private resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcesReport {
    /// Whether the island chose to report at all.
    pub reported: bool,
    /// The reported amount; meaningless when `reported` is false.
    pub amount: Resources,
}

/// Decision payload returned by a president.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresidentPayload {
    /// The rule picked for the speaker. Empty when there was nothing to pick.
    RuleProposal(String),
    /// Tax owed per island.
    Taxation(BTreeMap<ClientId, Resources>),
    /// Resources granted per island.
    Allocation(BTreeMap<ClientId, Resources>),
    /// Salary to pay the speaker.
    SpeakerSalary(Resources),
}

impl PresidentPayload {
    /// The content type this payload carries.
    pub const fn content_type(&self) -> PresidentContentType {
        match self {
            Self::RuleProposal(_) => PresidentContentType::RuleProposal,
            Self::Taxation(_) => PresidentContentType::Taxation,
            Self::Allocation(_) => PresidentContentType::Allocation,
            Self::SpeakerSalary(_) => PresidentContentType::SpeakerSalary,
        }
    }
}

/// Envelope returned by every presidential decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresidentReturnContent {
    /// Whether the president actually acted.
    pub action_taken: bool,
    /// The decision itself.
    pub payload: PresidentPayload,
}

impl PresidentReturnContent {
    /// An envelope for a decision that was taken.
    pub const fn taken(payload: PresidentPayload) -> Self {
        Self {
            action_taken: true,
            payload,
        }
    }

    /// An envelope for a decision that was declined or skipped.
    pub const fn declined(payload: PresidentPayload) -> Self {
        Self {
            action_taken: false,
            payload,
        }
    }

    /// The content type of the payload.
    pub const fn content_type(&self) -> PresidentContentType {
        self.payload.content_type()
    }
}

/// A ranked ballot. Earlier entries are preferred; an empty ballot abstains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    /// Candidates in order of preference.
    pub preferences: Vec<ClientId>,
}

impl Ballot {
    /// A ballot naming a single candidate.
    pub fn single(candidate: ClientId) -> Self {
        Self {
            preferences: vec![candidate],
        }
    }

    /// A ranked ballot.
    pub const fn ranked(preferences: Vec<ClientId>) -> Self {
        Self { preferences }
    }

    /// The most preferred candidate, if any.
    pub fn first_choice(&self) -> Option<ClientId> {
        self.preferences.first().copied()
    }
}

/// A value carried in a communication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommunicationContent {
    /// A resource amount.
    Amount(Resources),
    /// Free text.
    Text(String),
}

/// A message delivered by an institution to an island.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Communication {
    /// The role-holder that sent it.
    pub sender: ClientId,
    /// The turn it was sent in.
    pub turn: u64,
    /// Named fields of the message.
    pub content: BTreeMap<CommunicationFieldName, CommunicationContent>,
}

// ---------------------------------------------------------------------------
// Treasury ledger
// ---------------------------------------------------------------------------

/// One side of a treasury ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Party {
    /// Outside the governance layer.
    World,
    /// The shared common pool.
    CommonPool,
    /// An island's private pool.
    Client(ClientId),
    /// Sink for consumed resources.
    Void,
}

impl Party {
    /// The entity type of this party.
    pub const fn entity_type(self) -> EntityType {
        match self {
            Self::World => EntityType::World,
            Self::CommonPool => EntityType::CommonPool,
            Self::Client(_) => EntityType::Client,
            Self::Void => EntityType::Void,
        }
    }
}

/// A single resource movement in the treasury ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry identifier.
    pub id: LedgerEntryId,
    /// The turn the movement happened in.
    pub turn: u64,
    /// The category of movement.
    pub entry_type: LedgerEntryType,
    /// Where the resources came from (debit side).
    pub from: Party,
    /// Where the resources went (credit side).
    pub to: Party,
    /// Quantity moved; always positive.
    pub quantity: Resources,
    /// Reason for the movement (e.g. `"SERVICE_CHARGE"`).
    pub reason: String,
    /// Real-world timestamp.
    pub created_at: DateTime<Utc>,
}
