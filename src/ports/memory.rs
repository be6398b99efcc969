//! In-process implementations of the host interfaces, used by the daemon
//! when no host is attached and by tests.

use super::{BuffProvider, Ledger, Statistics};
use anyhow::{bail, Result};
use dashmap::DashMap;
use uuid::Uuid;

/// Balances kept in a concurrent map. Unknown owners have a zero balance.
#[derive(Default)]
pub struct MemoryLedger {
    balances: DashMap<Uuid, f64>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, owner: Uuid, amount: f64) {
        self.balances.insert(owner, amount);
    }
}

impl Ledger for MemoryLedger {
    fn has(&self, owner: &Uuid, amount: f64) -> Result<bool> {
        Ok(self.balances.get(owner).map(|b| *b >= amount).unwrap_or(amount <= 0.0))
    }

    fn withdraw(&self, owner: &Uuid, amount: f64) -> Result<()> {
        if !amount.is_finite() || amount < 0.0 {
            bail!("invalid withdrawal amount {}", amount);
        }
        // The entry guard makes check-and-debit atomic per owner
        let mut balance = self.balances.entry(*owner).or_insert(0.0);
        if *balance < amount {
            bail!("balance {:.2} cannot cover {:.2}", *balance, amount);
        }
        *balance -= amount;
        Ok(())
    }

    fn deposit(&self, owner: &Uuid, amount: f64) -> Result<()> {
        if !amount.is_finite() || amount < 0.0 {
            bail!("invalid deposit amount {}", amount);
        }
        *self.balances.entry(*owner).or_insert(0.0) += amount;
        Ok(())
    }

    fn balance(&self, owner: &Uuid) -> Result<f64> {
        Ok(self.balances.get(owner).map(|b| *b).unwrap_or(0.0))
    }
}

/// Provider that grants nothing
pub struct NoBuffs;

impl BuffProvider for NoBuffs {}

/// Bonus percentages for one owner
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OwnerBuffs {
    pub income_interval_reduction: f64,
    pub income_amount_bonus: f64,
    pub flat_income_bonus: f64,
    pub tax_reduction: f64,
    pub income_capacity_bonus: f64,
    pub extra_ownership_slots: u32,
}

/// Fixed per-owner bonuses
#[derive(Default)]
pub struct StaticBuffs {
    owners: DashMap<Uuid, OwnerBuffs>,
}

impl StaticBuffs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, owner: Uuid, buffs: OwnerBuffs) {
        self.owners.insert(owner, buffs);
    }

    fn of(&self, owner: &Uuid) -> OwnerBuffs {
        self.owners.get(owner).map(|b| *b).unwrap_or_default()
    }
}

impl BuffProvider for StaticBuffs {
    fn income_interval_reduction(&self, owner: &Uuid) -> Result<f64> {
        Ok(self.of(owner).income_interval_reduction)
    }

    fn income_amount_bonus(&self, owner: &Uuid, _apartment_id: &str) -> Result<f64> {
        Ok(self.of(owner).income_amount_bonus)
    }

    fn flat_income_bonus(&self, owner: &Uuid, _apartment_id: &str) -> Result<f64> {
        Ok(self.of(owner).flat_income_bonus)
    }

    fn tax_reduction(&self, owner: &Uuid) -> Result<f64> {
        Ok(self.of(owner).tax_reduction)
    }

    fn income_capacity_bonus(&self, owner: &Uuid) -> Result<f64> {
        Ok(self.of(owner).income_capacity_bonus)
    }

    fn extra_ownership_slots(&self, owner: &Uuid) -> Result<u32> {
        Ok(self.of(owner).extra_ownership_slots)
    }
}

/// Lifetime totals for one owner
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OwnerTotals {
    pub taxes_paid: f64,
    pub income_earned: f64,
}

#[derive(Default)]
pub struct MemoryStatistics {
    totals: DashMap<Uuid, OwnerTotals>,
}

impl MemoryStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn totals(&self, owner: &Uuid) -> OwnerTotals {
        self.totals.get(owner).map(|t| *t).unwrap_or_default()
    }
}

impl Statistics for MemoryStatistics {
    fn record_tax_paid(&self, owner: &Uuid, amount: f64) {
        self.totals.entry(*owner).or_default().taxes_paid += amount;
    }

    fn record_income(&self, owner: &Uuid, amount: f64) {
        self.totals.entry(*owner).or_default().income_earned += amount;
    }
}
