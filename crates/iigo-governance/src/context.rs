//! The owned state of one governance run.
//!
//! [`GovernanceContext`] holds everything the institutions mutate: the
//! treasury, accountability records, the judiciary's history and schedules,
//! the executive, and who holds which role. It is built once per run,
//! validated up front, and passed by reference to every turn.

use std::collections::BTreeMap;

use iigo_ledger::Treasury;
use iigo_types::{Accountability, ClientId, Role};
use tracing::info;

use crate::accountability::AccountabilityLedger;
use crate::config::SimulationConfig;
use crate::error::SetupError;
use crate::executive::Executive;
use crate::judiciary::Judiciary;

/// All governance state for a simulation run.
#[derive(Debug)]
pub struct GovernanceContext {
    pub(crate) config: SimulationConfig,
    pub(crate) treasury: Treasury,
    pub(crate) accountability: AccountabilityLedger,
    pub(crate) judiciary: Judiciary,
    pub(crate) executive: Executive,
    pub(crate) role_holders: BTreeMap<Role, ClientId>,
    pub(crate) turns_in_power: BTreeMap<Role, u64>,
    pub(crate) last_turn: Option<u64>,
}

impl GovernanceContext {
    /// Build and fund the context.
    ///
    /// Every role in [`Role::ALL`] must be held by one of `islands`. The
    /// common pool, role budgets and private pools are funded from
    /// `config.treasury` at turn 0, and the president is seated with the
    /// configured strategy.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] if the configuration is out of range, there
    /// are no islands, a role is unassigned or held by an unknown island.
    pub fn new(
        config: SimulationConfig,
        islands: &[ClientId],
        role_holders: BTreeMap<Role, ClientId>,
    ) -> Result<Self, SetupError> {
        config.validate()?;
        if islands.is_empty() {
            return Err(SetupError::NoIslands);
        }
        for role in Role::ALL {
            let holder = role_holders
                .get(&role)
                .copied()
                .ok_or(SetupError::MissingRoleHolder { role })?;
            if !islands.contains(&holder) {
                return Err(SetupError::UnknownRoleHolder {
                    role,
                    client: holder,
                });
            }
        }

        let mut treasury = Treasury::new();
        if !config.treasury.initial_common_pool.is_zero() {
            treasury.fund_common_pool(0, config.treasury.initial_common_pool)?;
        }
        for (&role, &budget) in &config.treasury.role_budgets {
            treasury.set_role_budget(role, budget);
        }
        if !config.treasury.initial_private_resources.is_zero() {
            for &island in islands {
                treasury.credit_private_pool(0, island, config.treasury.initial_private_resources)?;
            }
        }

        let mut executive = Executive::new(config.action_costs.clone(), config.president.clone());
        if let Some(&president) = role_holders.get(&Role::President) {
            executive.load_president(president);
        }

        let judiciary = Judiciary::new(config.judiciary.clone(), config.rules.clone());
        let turns_in_power = Role::ALL.iter().map(|&role| (role, 0)).collect();

        info!(
            islands = islands.len(),
            common_pool = %treasury.common_pool(),
            "Governance context ready"
        );

        Ok(Self {
            config,
            treasury,
            accountability: AccountabilityLedger::new(),
            judiciary,
            executive,
            role_holders,
            turns_in_power,
            last_turn: None,
        })
    }

    /// The configuration the context was built from.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Live balances and the ledger.
    pub const fn treasury(&self) -> &Treasury {
        &self.treasury
    }

    /// Mutable treasury, for the economic activity that happens outside
    /// governance (income, tax payments, taking allocations).
    pub const fn treasury_mut(&mut self) -> &mut Treasury {
        &mut self.treasury
    }

    /// Record an accountability entry for `turn`. It is judged when that
    /// turn runs.
    pub fn record_accountability(&mut self, turn: u64, record: Accountability) {
        self.accountability.record(turn, record);
    }

    /// The accountability records and lie totals.
    pub const fn accountability(&self) -> &AccountabilityLedger {
        &self.accountability
    }

    /// History, sanctions and pardons.
    pub const fn judiciary(&self) -> &Judiciary {
        &self.judiciary
    }

    /// The executive.
    pub const fn executive(&self) -> &Executive {
        &self.executive
    }

    /// Mutable executive, for driving single actions directly.
    pub const fn executive_mut(&mut self) -> &mut Executive {
        &mut self.executive
    }

    /// Current holder of `role`.
    pub fn role_holder(&self, role: Role) -> Option<ClientId> {
        self.role_holders.get(&role).copied()
    }

    /// Consecutive turns the current holder of `role` has served.
    pub fn turns_in_power(&self, role: Role) -> u64 {
        self.turns_in_power.get(&role).copied().unwrap_or(0)
    }

    /// The last turn that completed, if any.
    pub const fn last_turn(&self) -> Option<u64> {
        self.last_turn
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;

    fn holders(president: u32, judge: u32, speaker: u32) -> BTreeMap<Role, ClientId> {
        [
            (Role::President, ClientId(president)),
            (Role::Judge, ClientId(judge)),
            (Role::Speaker, ClientId(speaker)),
        ]
        .into()
    }

    fn islands() -> Vec<ClientId> {
        (0..3).map(ClientId).collect()
    }

    #[test]
    fn builds_and_funds_from_config() {
        let context = GovernanceContext::new(SimulationConfig::default(), &islands(), holders(0, 1, 2));
        assert!(context.is_ok());
        let context = context.ok();

        let treasury = context.as_ref().map(GovernanceContext::treasury);
        assert_eq!(treasury.map(Treasury::common_pool), Some(dec!(1000)));
        assert_eq!(treasury.map(|t| t.private_pool(ClientId(2))), Some(dec!(100)));
        assert_eq!(treasury.map(|t| t.role_budget(Role::Judge)), Some(dec!(100)));
        assert_eq!(
            context.as_ref().and_then(|c| c.executive().seat().holder()),
            Some(ClientId(0))
        );
    }

    #[test]
    fn missing_role_is_rejected() {
        let mut roles = holders(0, 1, 2);
        roles.remove(&Role::Judge);
        let result = GovernanceContext::new(SimulationConfig::default(), &islands(), roles);
        assert!(matches!(result, Err(SetupError::MissingRoleHolder { role: Role::Judge })));
    }

    #[test]
    fn unknown_holder_is_rejected() {
        let result = GovernanceContext::new(SimulationConfig::default(), &islands(), holders(0, 1, 9));
        assert!(matches!(
            result,
            Err(SetupError::UnknownRoleHolder { role: Role::Speaker, .. })
        ));
    }

    #[test]
    fn no_islands_is_rejected() {
        let result = GovernanceContext::new(SimulationConfig::default(), &[], holders(0, 1, 2));
        assert!(matches!(result, Err(SetupError::NoIslands)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = SimulationConfig::default();
        config.treasury.initial_common_pool = Decimal::NEGATIVE_ONE;
        let result = GovernanceContext::new(config, &islands(), holders(0, 1, 2));
        assert!(matches!(result, Err(SetupError::InvalidConfig { .. })));
    }
}
