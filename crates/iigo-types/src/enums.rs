//! Enumeration types for the governance simulation.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// An institutional role held by one island at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Head of the executive branch.
    President,
    /// Head of the judiciary.
    Judge,
    /// Head of the legislative branch.
    Speaker,
}

impl Role {
    /// All roles, in a fixed order.
    pub const ALL: [Self; 3] = [Self::President, Self::Judge, Self::Speaker];
}

// ---------------------------------------------------------------------------
// Sanctions
// ---------------------------------------------------------------------------

/// Severity of a sanction imposed on an island.
///
/// Variants are declared from least to most severe, so the derived ordering
/// is the severity ordering: `NoSanction < Tier1 < ... < Tier5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanctionTier {
    /// No punishment.
    NoSanction,
    /// Lightest sanction.
    Tier1,
    /// Second tier.
    Tier2,
    /// Third tier.
    Tier3,
    /// Fourth tier.
    Tier4,
    /// Most severe sanction.
    Tier5,
}

impl SanctionTier {
    /// The punishable tiers, from least to most severe.
    pub const PUNISHABLE: [Self; 5] = [Self::Tier1, Self::Tier2, Self::Tier3, Self::Tier4, Self::Tier5];
}

// ---------------------------------------------------------------------------
// Voting
// ---------------------------------------------------------------------------

/// Rule used to aggregate ballots into a single winner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingMethod {
    /// The candidate with the most first preferences wins.
    #[default]
    Plurality,
    /// Each ballot awards `n - 1 - rank` points per ranked candidate.
    BordaCount,
    /// Repeatedly eliminate the weakest candidate until one has a majority.
    InstantRunoff,
}

// ---------------------------------------------------------------------------
// Accountability variables
// ---------------------------------------------------------------------------

/// Name of a variable an island reports (or has derived) for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableFieldName {
    /// Private resources the island claims to hold.
    IslandReportedPrivateResources,
    /// Private resources the island actually holds.
    IslandActualPrivateResources,
    /// Tax the island paid into the common pool.
    IslandTaxContribution,
    /// Tax the island was expected to pay.
    ExpectedTaxContribution,
    /// Resources the island took from the common pool.
    IslandAllocation,
    /// Resources the island was allocated.
    ExpectedAllocation,
    /// Whether the president made an allocation this turn.
    AllocationMade,
    /// Fixed sanction amount currently in force.
    ConstSanctionAmount,
    /// Whether the island reported its private resources at all.
    HasIslandReportPrivateResources,
    /// Sanction the island paid.
    SanctionPaid,
    /// Sanction the island was expected to pay.
    SanctionExpected,
}

// ---------------------------------------------------------------------------
// President decisions
// ---------------------------------------------------------------------------

/// Kind of decision carried by a president's return envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresidentContentType {
    /// A rule picked for the speaker's vote.
    RuleProposal,
    /// A per-island tax map.
    Taxation,
    /// A per-island allocation map.
    Allocation,
    /// The salary paid to the speaker.
    SpeakerSalary,
}

/// Field of a communication delivered to an island.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationFieldName {
    /// Tax the island must pay this turn.
    TaxAmount,
    /// Resources the island may take from the common pool.
    AllocationAmount,
    /// A rule selected for a vote.
    RuleName,
}

// ---------------------------------------------------------------------------
// Treasury ledger
// ---------------------------------------------------------------------------

/// The category of a resource movement recorded in the treasury ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryType {
    /// Resources entering the common pool from outside the governance layer.
    Endowment,
    /// Resources entering a private pool from outside the governance layer.
    Income,
    /// Tax paid by an island (client -> common pool).
    Taxation,
    /// Resources allocated to an island (common pool -> client).
    Allocation,
    /// Salary paid to a role-holder (common pool -> client).
    Salary,
    /// Cost of a privileged institutional action (common pool -> void).
    ServiceCharge,
}

/// The kind of party on one side of a treasury ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Outside the governance layer (source of endowments).
    World,
    /// The shared common pool.
    CommonPool,
    /// An island's private pool.
    Client,
    /// Sink for consumed resources.
    Void,
}
