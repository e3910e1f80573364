//! The island-facing callback interface.
//!
//! The governance layer never reaches into an island's state. It asks
//! through [`IslandClient`] and treats every answer as untrusted: `None`,
//! an empty ballot or an out-of-range value degrades to an abstention or
//! no-action and never aborts the turn.
//!
//! Islands are always queried in ascending [`ClientId`] order through a
//! [`ClientDirectory`].

use std::collections::BTreeMap;

use iigo_types::{Ballot, ClientId, Communication, Resources, ResourcesReport, Role};

/// Islands taking part in the simulation, keyed by identifier.
pub type ClientDirectory<C = Box<dyn IslandClient>> = BTreeMap<ClientId, C>;

/// Decisions the governance layer solicits from an island.
pub trait IslandClient {
    /// Whether the island is still taking part. Dead islands are skipped.
    fn is_alive(&self) -> bool {
        true
    }

    /// Cast a ranked ballot for `role` among `candidates`, or abstain with
    /// `None`.
    fn vote_for_election(&mut self, role: Role, candidates: &[ClientId]) -> Option<Ballot>;

    /// Propose a rule for the speaker's agenda.
    fn rule_proposal(&mut self) -> Option<String>;

    /// Ask for resources from the common pool.
    fn common_pool_resource_request(&mut self) -> Option<Resources>;

    /// Disclose (or withhold) private resources for taxation.
    fn resource_report(&mut self) -> ResourcesReport;

    /// Receive a message from an institution.
    fn receive_communication(&mut self, communication: &Communication);
}

impl<T: IslandClient + ?Sized> IslandClient for Box<T> {
    fn is_alive(&self) -> bool {
        (**self).is_alive()
    }

    fn vote_for_election(&mut self, role: Role, candidates: &[ClientId]) -> Option<Ballot> {
        (**self).vote_for_election(role, candidates)
    }

    fn rule_proposal(&mut self) -> Option<String> {
        (**self).rule_proposal()
    }

    fn common_pool_resource_request(&mut self) -> Option<Resources> {
        (**self).common_pool_resource_request()
    }

    fn resource_report(&mut self) -> ResourcesReport {
        (**self).resource_report()
    }

    fn receive_communication(&mut self, communication: &Communication) {
        (**self).receive_communication(communication);
    }
}

/// Identifiers of every living island, ascending.
pub fn living_islands<C: IslandClient>(directory: &ClientDirectory<C>) -> Vec<ClientId> {
    directory
        .iter()
        .filter(|(_, client)| client.is_alive())
        .map(|(&id, _)| id)
        .collect()
}

/// An island that abstains from everything and keeps what it receives.
///
/// Stands in for islands whose strategy is not under test.
#[derive(Debug, Clone, Default)]
pub struct PassiveIsland {
    /// Communications received so far, oldest first.
    pub inbox: Vec<Communication>,
}

impl PassiveIsland {
    /// Create a passive island with an empty inbox.
    pub const fn new() -> Self {
        Self { inbox: Vec::new() }
    }
}

impl IslandClient for PassiveIsland {
    fn vote_for_election(&mut self, _role: Role, _candidates: &[ClientId]) -> Option<Ballot> {
        None
    }

    fn rule_proposal(&mut self) -> Option<String> {
        None
    }

    fn common_pool_resource_request(&mut self) -> Option<Resources> {
        None
    }

    fn resource_report(&mut self) -> ResourcesReport {
        ResourcesReport::default()
    }

    fn receive_communication(&mut self, communication: &Communication) {
        self.inbox.push(communication.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Ghost;

    impl IslandClient for Ghost {
        fn is_alive(&self) -> bool {
            false
        }
        fn vote_for_election(&mut self, _: Role, _: &[ClientId]) -> Option<Ballot> {
            None
        }
        fn rule_proposal(&mut self) -> Option<String> {
            None
        }
        fn common_pool_resource_request(&mut self) -> Option<Resources> {
            None
        }
        fn resource_report(&mut self) -> ResourcesReport {
            ResourcesReport::default()
        }
        fn receive_communication(&mut self, _: &Communication) {}
    }

    #[test]
    fn living_islands_skips_dead_and_sorts() {
        let mut directory: ClientDirectory = BTreeMap::new();
        directory.insert(ClientId(3), Box::new(PassiveIsland::new()));
        directory.insert(ClientId(1), Box::new(Ghost));
        directory.insert(ClientId(0), Box::new(PassiveIsland::new()));

        assert_eq!(living_islands(&directory), vec![ClientId(0), ClientId(3)]);
    }

    #[test]
    fn passive_island_abstains() {
        let mut island = PassiveIsland::new();
        assert!(island.vote_for_election(Role::Judge, &[ClientId(1)]).is_none());
        assert!(island.rule_proposal().is_none());
        assert!(!island.resource_report().reported);
    }
}
