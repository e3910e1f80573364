//! The executive branch: presidential duties paid for from the common pool.
//!
//! Every privileged action follows the same sequence:
//!
//! 1. check that a president is seated where the action needs one;
//! 2. burn the action's service charge from the common pool, debiting the
//!    president's role budget ([`Treasury::charge_service`]);
//! 3. ask the seated [`President`](crate::President) or the islands;
//! 4. act on the answer.
//!
//! If step 2 fails the action is skipped, nothing has moved, and
//! [`GovernanceError::InsufficientFunds`] is returned.

use std::collections::BTreeMap;

use iigo_ledger::Treasury;
use iigo_types::{
    ClientId, Communication, CommunicationContent, CommunicationFieldName, PresidentContentType,
    PresidentPayload, PresidentReturnContent, Resources, ResourcesReport, Role, VotingMethod,
};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::client::{ClientDirectory, IslandClient};
use crate::config::{ActionCostsConfig, PresidentConfig};
use crate::election::{Election, ElectionError};
use crate::error::GovernanceError;
use crate::roles::{President, PresidentSeat, build_president};

/// The actions the executive charges for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExecutiveAction {
    /// Collect rule proposals from islands.
    RequestRuleProposals,
    /// Collect allocation requests from islands.
    RequestAllocationRequests,
    /// Pick a rule for the speaker.
    PickRule,
    /// Broadcast the tax map.
    BroadcastTaxation,
    /// Answer allocation requests.
    ReplyAllocationRequests,
    /// Elect the next speaker.
    AppointNextSpeaker,
    /// Pay the speaker.
    PaySpeaker,
}

impl ExecutiveAction {
    /// Stable name used in ledger entries and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequestRuleProposals => "REQUEST_RULE_PROPOSALS",
            Self::RequestAllocationRequests => "REQUEST_ALLOCATION_REQUESTS",
            Self::PickRule => "PICK_RULE",
            Self::BroadcastTaxation => "BROADCAST_TAXATION",
            Self::ReplyAllocationRequests => "REPLY_ALLOCATION_REQUESTS",
            Self::AppointNextSpeaker => "APPOINT_NEXT_SPEAKER",
            Self::PaySpeaker => "PAY_SPEAKER",
        }
    }

    const fn cost(self, costs: &ActionCostsConfig) -> Decimal {
        match self {
            Self::RequestRuleProposals => costs.request_rule_proposals,
            Self::RequestAllocationRequests => costs.request_allocation_requests,
            Self::PickRule => costs.pick_rule,
            Self::BroadcastTaxation => costs.broadcast_taxation,
            Self::ReplyAllocationRequests => costs.reply_allocation_requests,
            Self::AppointNextSpeaker => costs.appoint_next_speaker,
            Self::PaySpeaker => costs.pay_speaker,
        }
    }
}

/// The president's office and its pending work for the turn.
#[derive(Debug)]
pub struct Executive {
    seat: PresidentSeat,
    costs: ActionCostsConfig,
    president: PresidentConfig,
    rule_proposals: Vec<String>,
    allocation_requests: BTreeMap<ClientId, Resources>,
    speaker_salary: Resources,
}

impl Executive {
    /// Create an executive with an empty seat.
    pub const fn new(costs: ActionCostsConfig, president: PresidentConfig) -> Self {
        Self {
            seat: PresidentSeat::Vacant,
            costs,
            president,
            rule_proposals: Vec::new(),
            allocation_requests: BTreeMap::new(),
            speaker_salary: Decimal::ZERO,
        }
    }

    /// Seat `holder` with the configured strategy.
    pub fn load_president(&mut self, holder: ClientId) {
        self.seat = PresidentSeat::Held {
            holder,
            strategy: build_president(&self.president),
        };
        info!(holder = %holder, strategy = ?self.president.strategy, "President seated");
    }

    /// Seat `holder` with a caller-supplied strategy.
    pub fn load_president_with(&mut self, holder: ClientId, strategy: Box<dyn President>) {
        self.seat = PresidentSeat::Held { holder, strategy };
    }

    /// The president's seat.
    pub const fn seat(&self) -> &PresidentSeat {
        &self.seat
    }

    /// Rule proposals collected this turn.
    pub fn rule_proposals(&self) -> &[String] {
        &self.rule_proposals
    }

    /// Allocation requests collected this turn.
    pub const fn allocation_requests(&self) -> &BTreeMap<ClientId, Resources> {
        &self.allocation_requests
    }

    /// Return to the zero state: no president, nothing pending, zero
    /// salary.
    pub fn reset(&mut self) {
        self.seat = PresidentSeat::Vacant;
        self.rule_proposals.clear();
        self.allocation_requests.clear();
        self.speaker_salary = Decimal::ZERO;
    }

    // -----------------------------------------------------------------------
    // Collection
    // -----------------------------------------------------------------------

    /// Ask every living island for a rule proposal. Blank proposals are
    /// dropped. Returns the number collected.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::InsufficientFunds`] if the action cannot
    /// be paid for.
    pub fn request_rule_proposal<C: IslandClient>(
        &mut self,
        turn: u64,
        treasury: &mut Treasury,
        directory: &mut ClientDirectory<C>,
    ) -> Result<usize, GovernanceError> {
        self.charge(turn, treasury, ExecutiveAction::RequestRuleProposals)?;

        self.rule_proposals.clear();
        for client in directory.values_mut().filter(|c| c.is_alive()) {
            if let Some(rule) = client.rule_proposal()
                && !rule.trim().is_empty()
            {
                self.rule_proposals.push(rule);
            }
        }
        debug!(turn, proposals = self.rule_proposals.len(), "Rule proposals collected");
        Ok(self.rule_proposals.len())
    }

    /// Ask every living island for a common pool request. Missing and
    /// non-positive requests are dropped. Returns the number collected.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::InsufficientFunds`] if the action cannot
    /// be paid for.
    pub fn request_allocation_request<C: IslandClient>(
        &mut self,
        turn: u64,
        treasury: &mut Treasury,
        directory: &mut ClientDirectory<C>,
    ) -> Result<usize, GovernanceError> {
        self.charge(turn, treasury, ExecutiveAction::RequestAllocationRequests)?;

        self.allocation_requests.clear();
        for (&id, client) in directory.iter_mut().filter(|(_, c)| c.is_alive()) {
            if let Some(amount) = client.common_pool_resource_request()
                && amount > Decimal::ZERO
            {
                self.allocation_requests.insert(id, amount);
            }
        }
        debug!(turn, requests = self.allocation_requests.len(), "Allocation requests collected");
        Ok(self.allocation_requests.len())
    }

    // -----------------------------------------------------------------------
    // Decisions
    // -----------------------------------------------------------------------

    /// Have the president pick one of this turn's proposals for the
    /// speaker.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::InvalidState`] if the seat is vacant, or
    /// [`GovernanceError::InsufficientFunds`] if the action cannot be paid
    /// for.
    pub fn get_rule_for_speaker(
        &mut self,
        turn: u64,
        treasury: &mut Treasury,
    ) -> Result<PresidentReturnContent, GovernanceError> {
        self.require_president()?;
        self.charge(turn, treasury, ExecutiveAction::PickRule)?;

        let PresidentSeat::Held { strategy, .. } = &mut self.seat else {
            return Err(GovernanceError::InvalidState {
                role: Role::President,
            });
        };
        Ok(strategy.pick_rule_to_vote(&self.rule_proposals))
    }

    /// Collect resource reports, have the president set taxes, and send
    /// each living island its amount.
    ///
    /// Nothing is sent unless the president acted and returned a tax map.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::InvalidState`] if the seat is vacant, or
    /// [`GovernanceError::InsufficientFunds`] if the action cannot be paid
    /// for.
    pub fn broadcast_taxation<C: IslandClient>(
        &mut self,
        turn: u64,
        treasury: &mut Treasury,
        directory: &mut ClientDirectory<C>,
    ) -> Result<PresidentReturnContent, GovernanceError> {
        let sender = self.require_president()?;
        self.charge(turn, treasury, ExecutiveAction::BroadcastTaxation)?;

        let reports: BTreeMap<ClientId, ResourcesReport> = directory
            .iter_mut()
            .filter(|(_, c)| c.is_alive())
            .map(|(&id, client)| (id, client.resource_report()))
            .collect();

        let PresidentSeat::Held { strategy, .. } = &mut self.seat else {
            return Err(GovernanceError::InvalidState {
                role: Role::President,
            });
        };
        let decision = strategy.set_taxation_amount(&reports);

        if decision.action_taken
            && decision.content_type() == PresidentContentType::Taxation
            && let PresidentPayload::Taxation(taxes) = &decision.payload
        {
            let sent = send_amounts(directory, sender, turn, CommunicationFieldName::TaxAmount, taxes);
            info!(turn, islands = sent, "Taxation broadcast");
        }
        Ok(decision)
    }

    /// Have the president answer this turn's allocation requests and send
    /// each living island its grant.
    ///
    /// Nothing is sent unless the president acted and returned an
    /// allocation map.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::InvalidState`] if the seat is vacant, or
    /// [`GovernanceError::InsufficientFunds`] if the action cannot be paid
    /// for.
    pub fn reply_allocation_request<C: IslandClient>(
        &mut self,
        turn: u64,
        treasury: &mut Treasury,
        directory: &mut ClientDirectory<C>,
    ) -> Result<PresidentReturnContent, GovernanceError> {
        let sender = self.require_president()?;
        self.charge(turn, treasury, ExecutiveAction::ReplyAllocationRequests)?;

        let common_pool = treasury.common_pool();
        let PresidentSeat::Held { strategy, .. } = &mut self.seat else {
            return Err(GovernanceError::InvalidState {
                role: Role::President,
            });
        };
        let decision = strategy.evaluate_allocation_requests(&self.allocation_requests, common_pool);

        if decision.action_taken
            && decision.content_type() == PresidentContentType::Allocation
            && let PresidentPayload::Allocation(grants) = &decision.payload
        {
            let sent = send_amounts(directory, sender, turn, CommunicationFieldName::AllocationAmount, grants);
            info!(turn, islands = sent, "Allocation broadcast");
        }
        Ok(decision)
    }

    // -----------------------------------------------------------------------
    // Speaker
    // -----------------------------------------------------------------------

    /// Elect the next speaker by plurality among `candidates`, who are also
    /// the voters.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::InsufficientFunds`] if the action cannot
    /// be paid for, or [`GovernanceError::Election`] if `candidates` is
    /// empty.
    pub fn appoint_next_speaker<C: IslandClient>(
        &mut self,
        turn: u64,
        treasury: &mut Treasury,
        directory: &mut ClientDirectory<C>,
        candidates: &[ClientId],
    ) -> Result<ClientId, GovernanceError> {
        if candidates.is_empty() {
            return Err(ElectionError::NoCandidates.into());
        }
        self.charge(turn, treasury, ExecutiveAction::AppointNextSpeaker)?;

        let mut election = Election::propose(turn, Role::Speaker, VotingMethod::Plurality);
        election.open_ballot(candidates)?;
        election.vote(directory)?;
        Ok(election.close_ballot()?)
    }

    /// Pay the speaker the salary the president chooses, from the common
    /// pool into the speaker's private pool. Returns the amount paid.
    ///
    /// A declined or zero salary pays nothing but still costs the service
    /// charge. The pool must cover the charge and the salary together, or
    /// neither is taken.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::InvalidState`] if the seat is vacant, or
    /// [`GovernanceError::InsufficientFunds`] if the charge plus the salary
    /// exceeds the common pool.
    pub fn send_speaker_salary(
        &mut self,
        turn: u64,
        treasury: &mut Treasury,
        speaker: ClientId,
    ) -> Result<Resources, GovernanceError> {
        let configured = self.president.speaker_salary;
        let PresidentSeat::Held { strategy, .. } = &mut self.seat else {
            return Err(GovernanceError::InvalidState {
                role: Role::President,
            });
        };
        let decision = strategy.pay_speaker(configured);
        let amount = match decision.payload {
            PresidentPayload::SpeakerSalary(amount) if decision.action_taken => amount,
            _ => Decimal::ZERO,
        }
        .max(Decimal::ZERO);

        let total = ExecutiveAction::PaySpeaker
            .cost(&self.costs)
            .checked_add(amount)
            .unwrap_or(Decimal::MAX);
        let available = treasury.common_pool();
        if total > available {
            debug!(turn, %total, %available, "Speaker salary skipped");
            return Err(GovernanceError::InsufficientFunds {
                action: ExecutiveAction::PaySpeaker.as_str(),
                cost: total,
                available,
            });
        }

        self.charge(turn, treasury, ExecutiveAction::PaySpeaker)?;
        if amount.is_zero() {
            self.speaker_salary = Decimal::ZERO;
            return Ok(Decimal::ZERO);
        }

        treasury
            .pay_salary(turn, speaker, amount)
            .map_err(|e| GovernanceError::from_ledger("SPEAKER_SALARY", e))?;
        self.speaker_salary = amount;
        info!(turn, speaker = %speaker, %amount, "Speaker salary paid");
        Ok(amount)
    }

    /// The salary most recently paid to the speaker.
    pub const fn return_speaker_salary(&self) -> Resources {
        self.speaker_salary
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn require_president(&self) -> Result<ClientId, GovernanceError> {
        self.seat.holder().ok_or(GovernanceError::InvalidState {
            role: Role::President,
        })
    }

    fn charge(
        &self,
        turn: u64,
        treasury: &mut Treasury,
        action: ExecutiveAction,
    ) -> Result<(), GovernanceError> {
        treasury
            .charge_service(turn, Role::President, action.cost(&self.costs), action.as_str())
            .map_err(|e| {
                debug!(turn, action = action.as_str(), "Executive action skipped");
                GovernanceError::from_ledger(action.as_str(), e)
            })
    }
}

/// Send `amounts[id]` under `field` to every living island listed.
fn send_amounts<C: IslandClient>(
    directory: &mut ClientDirectory<C>,
    sender: ClientId,
    turn: u64,
    field: CommunicationFieldName,
    amounts: &BTreeMap<ClientId, Resources>,
) -> usize {
    let mut sent = 0_usize;
    for (id, amount) in amounts {
        let Some(client) = directory.get_mut(id).filter(|c| c.is_alive()) else {
            continue;
        };
        let mut content = BTreeMap::new();
        content.insert(field, CommunicationContent::Amount(*amount));
        client.receive_communication(&Communication {
            sender,
            turn,
            content,
        });
        sent = sent.saturating_add(1);
    }
    sent
}
