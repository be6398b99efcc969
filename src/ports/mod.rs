//! Interfaces to collaborators owned by the host: the money ledger, the
//! bonus provider and lifetime statistics.
//!
//! Implementations are synchronous and must bound their own latency. The
//! engines treat any `Err` from the ledger as "insufficient funds" and any
//! `Err` from the buff provider as "no bonus".

mod memory;

pub use memory::{MemoryLedger, MemoryStatistics, NoBuffs, OwnerBuffs, OwnerTotals, StaticBuffs};

use crate::error::EconomyError;
use anyhow::Result;
use tracing::warn;
use uuid::Uuid;

/// Monetary account interface
pub trait Ledger: Send + Sync {
    fn has(&self, owner: &Uuid, amount: f64) -> Result<bool>;

    /// Must fail without side effects when the balance cannot cover `amount`
    fn withdraw(&self, owner: &Uuid, amount: f64) -> Result<()>;

    fn deposit(&self, owner: &Uuid, amount: f64) -> Result<()>;

    fn balance(&self, owner: &Uuid) -> Result<f64>;
}

/// Shop and research bonuses. All percentages; defaults mean "no bonus".
pub trait BuffProvider: Send + Sync {
    fn income_interval_reduction(&self, _owner: &Uuid) -> Result<f64> {
        Ok(0.0)
    }

    fn income_amount_bonus(&self, _owner: &Uuid, _apartment_id: &str) -> Result<f64> {
        Ok(0.0)
    }

    /// Flat amount added to each income roll before the percentage bonus
    fn flat_income_bonus(&self, _owner: &Uuid, _apartment_id: &str) -> Result<f64> {
        Ok(0.0)
    }

    fn tax_reduction(&self, _owner: &Uuid) -> Result<f64> {
        Ok(0.0)
    }

    fn income_capacity_bonus(&self, _owner: &Uuid) -> Result<f64> {
        Ok(0.0)
    }

    fn extra_ownership_slots(&self, _owner: &Uuid) -> Result<u32> {
        Ok(0)
    }
}

/// Best-effort lifetime counters
pub trait Statistics: Send + Sync {
    fn record_tax_paid(&self, owner: &Uuid, amount: f64);

    fn record_income(&self, owner: &Uuid, amount: f64);
}

/// Withdraw `amount` from `owner`, mapping every ledger failure to
/// [`EconomyError::InsufficientFunds`].
pub fn charge(ledger: &dyn Ledger, owner: &Uuid, amount: f64) -> Result<(), EconomyError> {
    let insufficient = EconomyError::InsufficientFunds { required: amount };

    match ledger.has(owner, amount) {
        Ok(true) => {}
        Ok(false) => return Err(insufficient),
        Err(e) => {
            warn!(owner = %owner, error = %e, "Ledger balance check failed");
            return Err(insufficient);
        }
    }

    ledger.withdraw(owner, amount).map_err(|e| {
        warn!(owner = %owner, amount, error = %e, "Ledger withdrawal failed");
        insufficient
    })
}

/// Read a buff value, falling back to `fallback` when the provider errors
pub fn buff_or<T: Copy>(value: Result<T>, fallback: T, buff: &'static str, owner: &Uuid) -> T {
    value.unwrap_or_else(|e| {
        warn!(owner = %owner, buff, error = %e, "Buff provider unavailable, using no bonus");
        fallback
    })
}
