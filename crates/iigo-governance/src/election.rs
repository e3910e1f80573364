//! The election state machine and ballot aggregation rules.
//!
//! An [`Election`] moves through four phases and never goes back:
//!
//! ```text
//! Proposed --open_ballot--> Open --vote/cast_ballot--> Voting --close_ballot--> Closed
//! ```
//!
//! `close_ballot` is also allowed straight from `Open`, which elects the
//! tie-break winner of an empty tally. Calling an operation in the wrong
//! phase returns [`ElectionError::InvalidPhase`]; that is always a bug in
//! the caller, never the result of island behaviour.
//!
//! # Tie-breaking
//!
//! Every rule breaks ties in favour of the lowest [`ClientId`]. A roster
//! that abstains completely therefore elects its lowest candidate, and an
//! instant-runoff tie for last place eliminates the highest id.

use std::collections::{BTreeMap, BTreeSet};

use iigo_types::{Ballot, ClientId, ElectionId, Role, VotingMethod};
use tracing::{debug, info};

use crate::client::{ClientDirectory, IslandClient};

/// Errors raised by misuse of an [`Election`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ElectionError {
    /// The operation is not allowed in the current phase.
    #[error("cannot {operation} an election in phase {phase:?}")]
    InvalidPhase {
        /// The attempted operation.
        operation: &'static str,
        /// The phase the election was in.
        phase: ElectionPhase,
    },

    /// The ballot was opened with no candidates.
    #[error("an election needs at least one candidate")]
    NoCandidates,
}

/// Lifecycle phase of an [`Election`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionPhase {
    /// Created, roster not yet registered.
    Proposed,
    /// Roster registered, no ballot cast yet.
    Open,
    /// At least one round of voting has run.
    Voting,
    /// Tallied. Terminal.
    Closed,
}

/// A single election for one role.
#[derive(Debug, Clone)]
pub struct Election {
    id: ElectionId,
    role: Role,
    method: VotingMethod,
    phase: ElectionPhase,
    voters: BTreeSet<ClientId>,
    candidates: BTreeSet<ClientId>,
    ballots: BTreeMap<ClientId, Ballot>,
    abstentions: BTreeSet<ClientId>,
    winner: Option<ClientId>,
}

impl Election {
    /// Propose the election for `role` in `turn`, decided by `method`.
    pub const fn propose(turn: u64, role: Role, method: VotingMethod) -> Self {
        Self {
            id: ElectionId::for_turn(turn, role),
            role,
            method,
            phase: ElectionPhase::Proposed,
            voters: BTreeSet::new(),
            candidates: BTreeSet::new(),
            ballots: BTreeMap::new(),
            abstentions: BTreeSet::new(),
            winner: None,
        }
    }

    /// Register the roster. Every voter is also a candidate.
    ///
    /// # Errors
    ///
    /// Returns [`ElectionError::InvalidPhase`] unless the election is
    /// `Proposed`, or [`ElectionError::NoCandidates`] for an empty roster.
    pub fn open_ballot(&mut self, voters: &[ClientId]) -> Result<(), ElectionError> {
        self.open_ballot_with_candidates(voters, voters)
    }

    /// Register the roster and a separate candidate list.
    ///
    /// # Errors
    ///
    /// Returns [`ElectionError::InvalidPhase`] unless the election is
    /// `Proposed`, or [`ElectionError::NoCandidates`] if `candidates` is
    /// empty.
    pub fn open_ballot_with_candidates(
        &mut self,
        voters: &[ClientId],
        candidates: &[ClientId],
    ) -> Result<(), ElectionError> {
        self.require(&[ElectionPhase::Proposed], "open")?;
        if candidates.is_empty() {
            return Err(ElectionError::NoCandidates);
        }
        self.voters = voters.iter().copied().collect();
        self.candidates = candidates.iter().copied().collect();
        self.phase = ElectionPhase::Open;
        debug!(
            election = %self.id.into_inner(),
            role = ?self.role,
            voters = self.voters.len(),
            candidates = self.candidates.len(),
            "Ballot opened"
        );
        Ok(())
    }

    /// Record one voter's ballot.
    ///
    /// Preferences naming non-candidates are dropped, as are repeats. A
    /// ballot left empty is recorded as an abstention. Voters outside the
    /// roster are ignored. A second ballot from the same voter replaces the
    /// first.
    ///
    /// Returns whether the ballot counts towards the tally.
    ///
    /// # Errors
    ///
    /// Returns [`ElectionError::InvalidPhase`] unless the election is
    /// `Open` or `Voting`.
    pub fn cast_ballot(&mut self, voter: ClientId, ballot: Ballot) -> Result<bool, ElectionError> {
        self.require(&[ElectionPhase::Open, ElectionPhase::Voting], "vote in")?;
        self.phase = ElectionPhase::Voting;

        if !self.voters.contains(&voter) {
            debug!(voter = %voter, "Ballot from outside the roster ignored");
            return Ok(false);
        }

        let mut seen = BTreeSet::new();
        let preferences: Vec<ClientId> = ballot
            .preferences
            .into_iter()
            .filter(|c| self.candidates.contains(c) && seen.insert(*c))
            .collect();

        if preferences.is_empty() {
            self.ballots.remove(&voter);
            self.abstentions.insert(voter);
            return Ok(false);
        }

        self.abstentions.remove(&voter);
        self.ballots.insert(voter, Ballot::ranked(preferences));
        Ok(true)
    }

    /// Ask every voter on the roster for a ballot, in ascending order.
    ///
    /// Voters missing from the directory, dead, or answering `None` abstain.
    /// Returns the number of ballots that count.
    ///
    /// # Errors
    ///
    /// Returns [`ElectionError::InvalidPhase`] unless the election is
    /// `Open` or `Voting`.
    pub fn vote<C: IslandClient>(
        &mut self,
        directory: &mut ClientDirectory<C>,
    ) -> Result<usize, ElectionError> {
        self.require(&[ElectionPhase::Open, ElectionPhase::Voting], "vote in")?;
        self.phase = ElectionPhase::Voting;

        let candidates: Vec<ClientId> = self.candidates.iter().copied().collect();
        let voters: Vec<ClientId> = self.voters.iter().copied().collect();
        let mut counted = 0_usize;

        for voter in voters {
            let ballot = directory
                .get_mut(&voter)
                .filter(|client| client.is_alive())
                .and_then(|client| client.vote_for_election(self.role, &candidates))
                .unwrap_or_default();
            if self.cast_ballot(voter, ballot)? {
                counted = counted.saturating_add(1);
            }
        }

        Ok(counted)
    }

    /// Tally the ballots and return the winner.
    ///
    /// # Errors
    ///
    /// Returns [`ElectionError::InvalidPhase`] unless the election is
    /// `Open` or `Voting`. In particular a second call fails.
    pub fn close_ballot(&mut self) -> Result<ClientId, ElectionError> {
        self.require(&[ElectionPhase::Open, ElectionPhase::Voting], "close")?;

        let ballots: Vec<&Ballot> = self.ballots.values().collect();
        let winner = tally(self.method, &self.candidates, &ballots).ok_or(ElectionError::NoCandidates)?;

        self.winner = Some(winner);
        self.phase = ElectionPhase::Closed;
        info!(
            election = %self.id.into_inner(),
            role = ?self.role,
            method = ?self.method,
            ballots = self.ballots.len(),
            abstentions = self.abstentions.len(),
            winner = %winner,
            "Election closed"
        );
        Ok(winner)
    }

    /// Election identifier.
    pub const fn id(&self) -> ElectionId {
        self.id
    }

    /// The contested role.
    pub const fn role(&self) -> Role {
        self.role
    }

    /// The aggregation rule.
    pub const fn method(&self) -> VotingMethod {
        self.method
    }

    /// Current phase.
    pub const fn phase(&self) -> ElectionPhase {
        self.phase
    }

    /// Winner, once closed.
    pub const fn winner(&self) -> Option<ClientId> {
        self.winner
    }

    /// Counted ballots, keyed by voter.
    pub const fn ballots(&self) -> &BTreeMap<ClientId, Ballot> {
        &self.ballots
    }

    /// Voters recorded as abstaining.
    pub const fn abstentions(&self) -> &BTreeSet<ClientId> {
        &self.abstentions
    }

    fn require(&self, allowed: &[ElectionPhase], operation: &'static str) -> Result<(), ElectionError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(ElectionError::InvalidPhase {
                operation,
                phase: self.phase,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation rules
// ---------------------------------------------------------------------------

/// Aggregate `ballots` over `candidates` under `method`.
///
/// Ballots are assumed to name only candidates. Returns `None` only when
/// there are no candidates.
pub fn tally(
    method: VotingMethod,
    candidates: &BTreeSet<ClientId>,
    ballots: &[&Ballot],
) -> Option<ClientId> {
    match method {
        VotingMethod::Plurality => plurality(candidates, ballots),
        VotingMethod::BordaCount => borda_count(candidates, ballots),
        VotingMethod::InstantRunoff => instant_runoff(candidates, ballots),
    }
}

/// Candidate with the highest score; the lowest id wins ties.
fn highest(scores: &BTreeMap<ClientId, u64>) -> Option<(ClientId, u64)> {
    let mut best: Option<(ClientId, u64)> = None;
    for (&candidate, &score) in scores {
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }
    best
}

/// Candidate with the lowest score; the highest id loses ties, so the
/// lowest id survives them.
fn lowest(scores: &BTreeMap<ClientId, u64>) -> Option<ClientId> {
    let mut worst: Option<(ClientId, u64)> = None;
    for (&candidate, &score) in scores {
        if worst.is_none_or(|(_, bottom)| score <= bottom) {
            worst = Some((candidate, score));
        }
    }
    worst.map(|(candidate, _)| candidate)
}

fn zero_scores(candidates: &BTreeSet<ClientId>) -> BTreeMap<ClientId, u64> {
    candidates.iter().map(|&c| (c, 0)).collect()
}

fn plurality(candidates: &BTreeSet<ClientId>, ballots: &[&Ballot]) -> Option<ClientId> {
    let mut counts = zero_scores(candidates);
    for ballot in ballots {
        if let Some(first) = ballot.first_choice()
            && let Some(count) = counts.get_mut(&first)
        {
            *count = count.saturating_add(1);
        }
    }
    highest(&counts).map(|(winner, _)| winner)
}

/// Each ballot gives `n - 1 - rank` points to the candidate at `rank`,
/// where `n` is the number of candidates. Unranked candidates get nothing.
fn borda_count(candidates: &BTreeSet<ClientId>, ballots: &[&Ballot]) -> Option<ClientId> {
    let top = u64::try_from(candidates.len()).unwrap_or(u64::MAX).saturating_sub(1);
    let mut points = zero_scores(candidates);
    for ballot in ballots {
        for (rank, candidate) in ballot.preferences.iter().enumerate() {
            let rank = u64::try_from(rank).unwrap_or(u64::MAX);
            if let Some(score) = points.get_mut(candidate) {
                *score = score.saturating_add(top.saturating_sub(rank));
            }
        }
    }
    highest(&points).map(|(winner, _)| winner)
}

/// Eliminate the candidate with the fewest first preferences until one
/// holds a strict majority of the ballots still naming a remaining
/// candidate. If no ballot names a remaining candidate, the lowest
/// remaining id wins.
fn instant_runoff(candidates: &BTreeSet<ClientId>, ballots: &[&Ballot]) -> Option<ClientId> {
    let mut remaining = candidates.clone();

    while remaining.len() > 1 {
        let mut counts = zero_scores(&remaining);
        let mut active = 0_u64;
        for ballot in ballots {
            let choice = ballot.preferences.iter().find(|c| remaining.contains(c));
            if let Some(count) = choice.and_then(|c| counts.get_mut(c)) {
                *count = count.saturating_add(1);
                active = active.saturating_add(1);
            }
        }

        if active == 0 {
            break;
        }
        if let Some((leader, votes)) = highest(&counts)
            && votes.saturating_mul(2) > active
        {
            return Some(leader);
        }
        if let Some(loser) = lowest(&counts) {
            remaining.remove(&loser);
        }
    }

    remaining.first().copied()
}
