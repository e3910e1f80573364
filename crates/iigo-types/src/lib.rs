//! Shared type definitions for the IIGO governance simulation.
//!
//! This crate is the single source of truth for the values exchanged between
//! islands and the institutional layer: identifiers, sanction tiers,
//! accountability records, presidential decision envelopes, ballots and
//! treasury ledger entries.
//!
//! # Modules
//!
//! - [`ids`] -- [`ClientId`] plus UUID wrappers for ledger entries and elections
//! - [`enums`] -- Roles, sanction tiers, voting methods, variable names
//! - [`structs`] -- Records, reports, ballots, communications, ledger entries

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    CommunicationFieldName, EntityType, LedgerEntryType, PresidentContentType, Role, SanctionTier,
    VariableFieldName, VotingMethod,
};
pub use ids::{ClientId, ElectionId, LedgerEntryId};
pub use structs::{
    Accountability, Ballot, Communication, CommunicationContent, LedgerEntry, MonitorResult,
    Party, PresidentPayload, PresidentReturnContent, Resources, ResourcesReport, Sanction,
    VariableValuePair,
};
