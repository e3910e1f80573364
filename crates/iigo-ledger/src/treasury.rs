//! Live balances for the common pool, role budgets and island private pools.
//!
//! The [`Treasury`] is the only writer of these balances. Every change goes
//! through a [`Ledger`] entry first, so [`Treasury::verify`] can reconcile
//! the live figures against the ledger at any point.
//!
//! Withdrawals are all-or-nothing: if the paying balance cannot cover the
//! full amount, nothing moves and [`LedgerError::InsufficientFunds`] is
//! returned.
//!
//! Role budgets are bookkeeping figures, not pools. A service charge debits
//! the acting role's budget after the common pool has paid it, and budgets
//! may go negative.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use iigo_types::{ClientId, LedgerEntryType, Party, Role};

use crate::conservation::{ConservationResult, reconcile};
use crate::{Ledger, LedgerError, TransferParams};

/// Balances owned by the governance layer.
#[derive(Debug, Clone, Default)]
pub struct Treasury {
    common_pool: Decimal,
    role_budgets: BTreeMap<Role, Decimal>,
    private_pools: BTreeMap<ClientId, Decimal>,
    ledger: Ledger,
}

impl Treasury {
    /// Create a treasury with an empty common pool and no budgets.
    pub const fn new() -> Self {
        Self {
            common_pool: Decimal::ZERO,
            role_budgets: BTreeMap::new(),
            private_pools: BTreeMap::new(),
            ledger: Ledger::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    /// Current common pool balance.
    pub const fn common_pool(&self) -> Decimal {
        self.common_pool
    }

    /// Budget remaining for a role. Roles never funded report zero.
    pub fn role_budget(&self, role: Role) -> Decimal {
        self.role_budgets.get(&role).copied().unwrap_or(Decimal::ZERO)
    }

    /// Private pool of an island. Unknown islands report zero.
    pub fn private_pool(&self, client: ClientId) -> Decimal {
        self.private_pools.get(&client).copied().unwrap_or(Decimal::ZERO)
    }

    /// All private pools, keyed by island.
    pub const fn private_pools(&self) -> &BTreeMap<ClientId, Decimal> {
        &self.private_pools
    }

    /// The ledger backing every balance change.
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    // -----------------------------------------------------------------------
    // Funding
    // -----------------------------------------------------------------------

    /// Add resources to the common pool from outside the governance layer.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the amount is not positive or the balance
    /// would overflow.
    pub fn fund_common_pool(&mut self, turn: u64, amount: Decimal) -> Result<(), LedgerError> {
        let updated = self
            .common_pool
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("common pool"))?;
        self.ledger.record_transfer(TransferParams {
            turn,
            entry_type: LedgerEntryType::Endowment,
            quantity: amount,
            from: Party::World,
            to: Party::CommonPool,
            reason: "ENDOWMENT".to_owned(),
        })?;
        self.common_pool = updated;
        Ok(())
    }

    /// Add resources to an island's private pool from outside the
    /// governance layer.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the amount is not positive or the balance
    /// would overflow.
    pub fn credit_private_pool(
        &mut self,
        turn: u64,
        client: ClientId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        let updated = self
            .private_pool(client)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("private pool"))?;
        self.ledger.record_transfer(TransferParams {
            turn,
            entry_type: LedgerEntryType::Income,
            quantity: amount,
            from: Party::World,
            to: Party::Client(client),
            reason: "INCOME".to_owned(),
        })?;
        self.private_pools.insert(client, updated);
        Ok(())
    }

    /// Set the budget figure for a role. Budgets are bookkeeping only and
    /// do not hold resources, so no ledger entry is written.
    pub fn set_role_budget(&mut self, role: Role, amount: Decimal) {
        self.role_budgets.insert(role, amount);
    }

    // -----------------------------------------------------------------------
    // Withdrawals
    // -----------------------------------------------------------------------

    /// Burn a service charge from the common pool on behalf of a role.
    ///
    /// A zero cost succeeds without touching any balance. On success the
    /// role's budget is debited by the same amount.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientFunds`] if the common pool holds
    /// less than `cost`; no balance changes in that case.
    pub fn charge_service(
        &mut self,
        turn: u64,
        role: Role,
        cost: Decimal,
        action: &str,
    ) -> Result<(), LedgerError> {
        if cost.is_zero() {
            return Ok(());
        }
        let pool = self.withdraw_common_pool(cost)?;
        let budget = self
            .role_budget(role)
            .checked_sub(cost)
            .ok_or(LedgerError::Overflow("role budget"))?;

        self.ledger.record_transfer(TransferParams {
            turn,
            entry_type: LedgerEntryType::ServiceCharge,
            quantity: cost,
            from: Party::CommonPool,
            to: Party::Void,
            reason: action.to_owned(),
        })?;
        self.common_pool = pool;
        self.role_budgets.insert(role, budget);

        debug!(turn, ?role, %cost, action, "Service charge withdrawn");
        Ok(())
    }

    /// Pay a salary from the common pool into an island's private pool.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientFunds`] if the common pool cannot
    /// cover the salary, or another [`LedgerError`] if the amount is not
    /// positive.
    pub fn pay_salary(
        &mut self,
        turn: u64,
        recipient: ClientId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        self.pay_out(turn, LedgerEntryType::Salary, recipient, amount, "SALARY")
    }

    /// Grant an allocation from the common pool to an island.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientFunds`] if the common pool cannot
    /// cover the allocation, or another [`LedgerError`] if the amount is not
    /// positive.
    pub fn allocate(
        &mut self,
        turn: u64,
        recipient: ClientId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        self.pay_out(turn, LedgerEntryType::Allocation, recipient, amount, "ALLOCATION")
    }

    /// Move a tax payment from an island's private pool to the common pool.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientFunds`] if the island cannot pay
    /// the full amount, or another [`LedgerError`] if the amount is not
    /// positive.
    pub fn collect_tax(
        &mut self,
        turn: u64,
        payer: ClientId,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        let available = self.private_pool(payer);
        if available < amount {
            warn!(turn, client = %payer, %amount, %available, "Tax payment exceeds private pool");
            return Err(LedgerError::InsufficientFunds {
                party: Party::Client(payer),
                requested: amount,
                available,
            });
        }
        let private = available
            .checked_sub(amount)
            .ok_or(LedgerError::Overflow("private pool"))?;
        let pool = self
            .common_pool
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("common pool"))?;

        self.ledger.record_transfer(TransferParams {
            turn,
            entry_type: LedgerEntryType::Taxation,
            quantity: amount,
            from: Party::Client(payer),
            to: Party::CommonPool,
            reason: "TAX".to_owned(),
        })?;
        self.private_pools.insert(payer, private);
        self.common_pool = pool;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Verification
    // -----------------------------------------------------------------------

    /// Reconcile live balances against the ledger.
    pub fn verify(&self) -> ConservationResult {
        let mut live: BTreeMap<Party, Decimal> = self
            .private_pools
            .iter()
            .map(|(&client, &balance)| (Party::Client(client), balance))
            .collect();
        live.insert(Party::CommonPool, self.common_pool);
        reconcile(self.ledger.all_entries(), &live)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Compute the common pool balance after withdrawing `amount`, without
    /// applying it.
    fn withdraw_common_pool(&self, amount: Decimal) -> Result<Decimal, LedgerError> {
        if self.common_pool < amount {
            warn!(requested = %amount, available = %self.common_pool, "Common pool cannot cover withdrawal");
            return Err(LedgerError::InsufficientFunds {
                party: Party::CommonPool,
                requested: amount,
                available: self.common_pool,
            });
        }
        self.common_pool
            .checked_sub(amount)
            .ok_or(LedgerError::Overflow("common pool"))
    }

    fn pay_out(
        &mut self,
        turn: u64,
        entry_type: LedgerEntryType,
        recipient: ClientId,
        amount: Decimal,
        reason: &str,
    ) -> Result<(), LedgerError> {
        let pool = self.withdraw_common_pool(amount)?;
        let private = self
            .private_pool(recipient)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("private pool"))?;

        self.ledger.record_transfer(TransferParams {
            turn,
            entry_type,
            quantity: amount,
            from: Party::CommonPool,
            to: Party::Client(recipient),
            reason: reason.to_owned(),
        })?;
        self.common_pool = pool;
        self.private_pools.insert(recipient, private);

        debug!(turn, ?entry_type, client = %recipient, %amount, "Paid out of common pool");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn funded(amount: Decimal) -> Treasury {
        let mut treasury = Treasury::new();
        assert!(treasury.fund_common_pool(0, amount).is_ok());
        treasury
    }

    #[test]
    fn service_charge_debits_pool_and_role_budget() {
        let mut treasury = funded(dec!(100));
        treasury.set_role_budget(Role::President, dec!(30));

        let result = treasury.charge_service(1, Role::President, dec!(10), "BROADCAST_TAXATION");

        assert!(result.is_ok());
        assert_eq!(treasury.common_pool(), dec!(90));
        assert_eq!(treasury.role_budget(Role::President), dec!(20));
        assert_eq!(treasury.ledger().len(), 2);
    }

    #[test]
    fn service_charge_refused_without_partial_withdrawal() {
        let mut treasury = funded(dec!(5));

        let result = treasury.charge_service(1, Role::President, dec!(10), "PAY_SPEAKER");

        assert!(matches!(result, Err(LedgerError::InsufficientFunds { .. })));
        assert_eq!(treasury.common_pool(), dec!(5));
        assert_eq!(treasury.role_budget(Role::President), Decimal::ZERO);
        assert_eq!(treasury.ledger().len(), 1);
    }

    #[test]
    fn zero_cost_is_a_no_op() {
        let mut treasury = Treasury::new();
        assert!(treasury.charge_service(1, Role::Judge, Decimal::ZERO, "FREE").is_ok());
        assert!(treasury.ledger().is_empty());
    }

    #[test]
    fn role_budget_may_go_negative() {
        let mut treasury = funded(dec!(50));
        assert!(treasury.charge_service(1, Role::Speaker, dec!(10), "ACTION").is_ok());
        assert_eq!(treasury.role_budget(Role::Speaker), dec!(-10));
    }

    #[test]
    fn salary_moves_pool_into_private_pool() {
        let mut treasury = funded(dec!(100));
        assert!(treasury.pay_salary(2, ClientId(4), dec!(25)).is_ok());
        assert_eq!(treasury.common_pool(), dec!(75));
        assert_eq!(treasury.private_pool(ClientId(4)), dec!(25));
    }

    #[test]
    fn tax_requires_full_payment() {
        let mut treasury = funded(dec!(10));
        assert!(treasury.credit_private_pool(0, ClientId(1), dec!(8)).is_ok());

        assert!(treasury.collect_tax(1, ClientId(1), dec!(9)).is_err());
        assert_eq!(treasury.private_pool(ClientId(1)), dec!(8));

        assert!(treasury.collect_tax(1, ClientId(1), dec!(3)).is_ok());
        assert_eq!(treasury.private_pool(ClientId(1)), dec!(5));
        assert_eq!(treasury.common_pool(), dec!(13));
    }

    #[test]
    fn balances_reconcile_after_mixed_activity() {
        let mut treasury = funded(dec!(200));
        let _ = treasury.credit_private_pool(0, ClientId(0), dec!(40));
        let _ = treasury.collect_tax(1, ClientId(0), dec!(4));
        let _ = treasury.allocate(1, ClientId(1), dec!(30));
        let _ = treasury.charge_service(1, Role::President, dec!(10), "ALLOCATION");
        let _ = treasury.pay_salary(1, ClientId(2), dec!(50));

        assert_eq!(treasury.verify(), ConservationResult::Balanced);
        assert_eq!(treasury.ledger().verify_conservation(1), ConservationResult::Balanced);
        assert_eq!(treasury.common_pool(), dec!(114));
    }
}
