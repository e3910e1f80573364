//! Presidential strategies and the president's seat.
//!
//! A [`President`] makes the executive's decisions. It never touches the
//! treasury; the [`Executive`](crate::Executive) charges for each action,
//! asks the president, and carries out what comes back. Every decision is
//! wrapped in a [`PresidentReturnContent`] so the president can decline.
//!
//! Two strategies are provided:
//!
//! | Strategy | Allocation cap | Tax rate | Salary |
//! |----------|----------------|----------|--------|
//! | [`BasePresident`] | 75% of the pool | 10% | full |
//! | [`AusterityPresident`] | 50% of the pool | 20% | half |
//!
//! Requests under the cap are granted in full. Otherwise every grant is
//! scaled down by the same factor and rounded down to two decimal places,
//! so the total never exceeds the cap.

use std::collections::BTreeMap;

use iigo_types::{ClientId, PresidentPayload, PresidentReturnContent, Resources, ResourcesReport};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::{PresidentConfig, PresidentStrategy};

/// Decisions delegated to whoever holds the presidency.
pub trait President {
    /// Pick the rule the speaker should put to a vote.
    fn pick_rule_to_vote(&mut self, proposals: &[String]) -> PresidentReturnContent;

    /// Decide how much of each request to grant from `common_pool`.
    fn evaluate_allocation_requests(
        &mut self,
        requests: &BTreeMap<ClientId, Resources>,
        common_pool: Resources,
    ) -> PresidentReturnContent;

    /// Set each island's tax from what it reported.
    fn set_taxation_amount(
        &mut self,
        reports: &BTreeMap<ClientId, ResourcesReport>,
    ) -> PresidentReturnContent;

    /// Decide the speaker's salary given the configured amount.
    fn pay_speaker(&mut self, salary: Resources) -> PresidentReturnContent;
}

/// Build the configured strategy.
pub fn build_president(config: &PresidentConfig) -> Box<dyn President> {
    match config.strategy {
        PresidentStrategy::Base => Box::new(BasePresident::new(config.unreported_tax)),
        PresidentStrategy::Austerity => Box::new(AusterityPresident::new(config.unreported_tax)),
    }
}

// ---------------------------------------------------------------------------
// Shared decision helpers
// ---------------------------------------------------------------------------

fn first_proposal(proposals: &[String]) -> PresidentReturnContent {
    match proposals.iter().find(|rule| !rule.trim().is_empty()) {
        Some(rule) => PresidentReturnContent::taken(PresidentPayload::RuleProposal(rule.clone())),
        None => PresidentReturnContent::declined(PresidentPayload::RuleProposal(String::new())),
    }
}

/// Grant requests in full if their total is below `share` of the pool,
/// otherwise scale them down to that total. Non-positive requests are
/// ignored.
fn capped_allocation(
    requests: &BTreeMap<ClientId, Resources>,
    common_pool: Resources,
    share: Decimal,
) -> PresidentReturnContent {
    let valid: BTreeMap<ClientId, Resources> = requests
        .iter()
        .filter(|(_, amount)| amount.is_sign_positive() && !amount.is_zero())
        .map(|(&client, &amount)| (client, amount))
        .collect();
    if valid.is_empty() {
        return PresidentReturnContent::declined(PresidentPayload::Allocation(BTreeMap::new()));
    }

    let cap = common_pool.max(Decimal::ZERO).saturating_mul(share);
    let total = valid.values().fold(Decimal::ZERO, |acc, v| acc.saturating_add(*v));

    let grants = if total < cap {
        valid
    } else {
        let factor = cap.checked_div(total).unwrap_or(Decimal::ZERO);
        valid
            .into_iter()
            .map(|(client, amount)| {
                let scaled = amount
                    .saturating_mul(factor)
                    .round_dp_with_strategy(2, RoundingStrategy::ToZero);
                (client, scaled)
            })
            .collect()
    };

    PresidentReturnContent::taken(PresidentPayload::Allocation(grants))
}

/// Tax `rate` of each reported amount, or `unreported` for islands that
/// did not report. Negative reports are treated as zero.
fn proportional_tax(
    reports: &BTreeMap<ClientId, ResourcesReport>,
    rate: Decimal,
    unreported: Resources,
) -> PresidentReturnContent {
    if reports.is_empty() {
        return PresidentReturnContent::declined(PresidentPayload::Taxation(BTreeMap::new()));
    }
    let taxes = reports
        .iter()
        .map(|(&client, report)| {
            let tax = if report.reported {
                report.amount.max(Decimal::ZERO).saturating_mul(rate)
            } else {
                unreported
            };
            (client, tax)
        })
        .collect();
    PresidentReturnContent::taken(PresidentPayload::Taxation(taxes))
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// The default president.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasePresident {
    unreported_tax: Resources,
}

impl BasePresident {
    const ALLOCATION_SHARE: Decimal = Decimal::from_parts(75, 0, 0, false, 2);
    const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

    /// Create a base president charging `unreported_tax` to islands that do
    /// not report.
    pub const fn new(unreported_tax: Resources) -> Self {
        Self { unreported_tax }
    }
}

impl President for BasePresident {
    fn pick_rule_to_vote(&mut self, proposals: &[String]) -> PresidentReturnContent {
        first_proposal(proposals)
    }

    fn evaluate_allocation_requests(
        &mut self,
        requests: &BTreeMap<ClientId, Resources>,
        common_pool: Resources,
    ) -> PresidentReturnContent {
        capped_allocation(requests, common_pool, Self::ALLOCATION_SHARE)
    }

    fn set_taxation_amount(
        &mut self,
        reports: &BTreeMap<ClientId, ResourcesReport>,
    ) -> PresidentReturnContent {
        proportional_tax(reports, Self::TAX_RATE, self.unreported_tax)
    }

    fn pay_speaker(&mut self, salary: Resources) -> PresidentReturnContent {
        PresidentReturnContent::taken(PresidentPayload::SpeakerSalary(salary))
    }
}

/// A president that protects the common pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AusterityPresident {
    unreported_tax: Resources,
}

impl AusterityPresident {
    const ALLOCATION_SHARE: Decimal = Decimal::from_parts(50, 0, 0, false, 2);
    const TAX_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

    /// Create an austerity president charging `unreported_tax` to islands
    /// that do not report.
    pub const fn new(unreported_tax: Resources) -> Self {
        Self { unreported_tax }
    }
}

impl President for AusterityPresident {
    fn pick_rule_to_vote(&mut self, proposals: &[String]) -> PresidentReturnContent {
        first_proposal(proposals)
    }

    fn evaluate_allocation_requests(
        &mut self,
        requests: &BTreeMap<ClientId, Resources>,
        common_pool: Resources,
    ) -> PresidentReturnContent {
        capped_allocation(requests, common_pool, Self::ALLOCATION_SHARE)
    }

    fn set_taxation_amount(
        &mut self,
        reports: &BTreeMap<ClientId, ResourcesReport>,
    ) -> PresidentReturnContent {
        proportional_tax(reports, Self::TAX_RATE, self.unreported_tax)
    }

    fn pay_speaker(&mut self, salary: Resources) -> PresidentReturnContent {
        let half = salary.checked_div(Decimal::TWO).unwrap_or(Decimal::ZERO);
        PresidentReturnContent::taken(PresidentPayload::SpeakerSalary(half))
    }
}

// ---------------------------------------------------------------------------
// Seat
// ---------------------------------------------------------------------------

/// Who holds the presidency, if anyone.
pub enum PresidentSeat {
    /// Nobody holds the role.
    Vacant,
    /// An island holds the role and decides with `strategy`.
    Held {
        /// The holder.
        holder: ClientId,
        /// The holder's decision logic.
        strategy: Box<dyn President>,
    },
}

impl PresidentSeat {
    /// The holder, if the seat is filled.
    pub const fn holder(&self) -> Option<ClientId> {
        match self {
            Self::Vacant => None,
            Self::Held { holder, .. } => Some(*holder),
        }
    }

    /// Whether nobody holds the seat.
    pub const fn is_vacant(&self) -> bool {
        matches!(self, Self::Vacant)
    }
}

impl core::fmt::Debug for PresidentSeat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Vacant => f.write_str("Vacant"),
            Self::Held { holder, .. } => f.debug_struct("Held").field("holder", holder).finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use iigo_types::PresidentContentType;
    use rust_decimal_macros::dec;

    use super::*;

    fn requests(amounts: &[(u32, Decimal)]) -> BTreeMap<ClientId, Resources> {
        amounts.iter().map(|&(c, a)| (ClientId(c), a)).collect()
    }

    fn allocation(content: &PresidentReturnContent) -> BTreeMap<ClientId, Resources> {
        match &content.payload {
            PresidentPayload::Allocation(map) => map.clone(),
            _ => BTreeMap::new(),
        }
    }

    #[test]
    fn base_grants_small_requests_in_full() {
        let mut president = BasePresident::new(dec!(5));
        let content =
            president.evaluate_allocation_requests(&requests(&[(0, dec!(10)), (1, dec!(20))]), dec!(100));
        assert!(content.action_taken);
        assert_eq!(allocation(&content), requests(&[(0, dec!(10)), (1, dec!(20))]));
    }

    #[test]
    fn base_scales_large_requests_to_cap() {
        let mut president = BasePresident::new(dec!(5));
        let content =
            president.evaluate_allocation_requests(&requests(&[(0, dec!(100)), (1, dec!(50))]), dec!(100));
        let grants = allocation(&content);
        assert_eq!(grants.get(&ClientId(0)), Some(&dec!(50)));
        assert_eq!(grants.get(&ClientId(1)), Some(&dec!(25)));
    }

    #[test]
    fn austerity_caps_at_half_the_pool() {
        let mut president = AusterityPresident::new(dec!(5));
        let content = president
            .evaluate_allocation_requests(&requests(&[(0, dec!(30)), (1, dec!(30)), (2, dec!(30))]), dec!(90));
        let total: Decimal = allocation(&content).values().copied().sum();
        assert!(total <= dec!(45));
        assert_eq!(allocation(&content).get(&ClientId(2)), Some(&dec!(15)));
    }

    #[test]
    fn non_positive_requests_are_ignored() {
        let mut president = BasePresident::new(dec!(5));
        let content =
            president.evaluate_allocation_requests(&requests(&[(0, dec!(-10)), (1, Decimal::ZERO)]), dec!(100));
        assert!(!content.action_taken);
        assert_eq!(content.content_type(), PresidentContentType::Allocation);
    }

    #[test]
    fn tax_follows_reports() {
        let mut reports = BTreeMap::new();
        reports.insert(ClientId(0), ResourcesReport { reported: true, amount: dec!(200) });
        reports.insert(ClientId(1), ResourcesReport { reported: false, amount: dec!(999) });

        let base = BasePresident::new(dec!(7)).set_taxation_amount(&reports);
        let austerity = AusterityPresident::new(dec!(7)).set_taxation_amount(&reports);

        let expected_base: BTreeMap<_, _> = [(ClientId(0), dec!(20)), (ClientId(1), dec!(7))].into();
        let expected_austerity: BTreeMap<_, _> = [(ClientId(0), dec!(40)), (ClientId(1), dec!(7))].into();
        assert_eq!(base.payload, PresidentPayload::Taxation(expected_base));
        assert_eq!(austerity.payload, PresidentPayload::Taxation(expected_austerity));
    }

    #[test]
    fn rule_pick_skips_blank_and_declines_when_empty() {
        let mut president = BasePresident::new(dec!(5));
        let picked = president.pick_rule_to_vote(&[String::from("  "), String::from("curfew")]);
        assert_eq!(picked, PresidentReturnContent::taken(PresidentPayload::RuleProposal("curfew".into())));

        let none = president.pick_rule_to_vote(&[]);
        assert!(!none.action_taken);
    }

    #[test]
    fn austerity_halves_salary() {
        let content = AusterityPresident::new(dec!(5)).pay_speaker(dec!(50));
        assert_eq!(content.payload, PresidentPayload::SpeakerSalary(dec!(25)));
    }

    #[test]
    fn seat_reports_holder() {
        let seat = PresidentSeat::Held {
            holder: ClientId(3),
            strategy: build_president(&PresidentConfig::default()),
        };
        assert_eq!(seat.holder(), Some(ClientId(3)));
        assert!(PresidentSeat::Vacant.is_vacant());
        assert_eq!(format!("{:?}", PresidentSeat::Vacant), "Vacant");
    }
}
