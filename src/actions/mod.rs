//! Player- and admin-initiated operations on a single apartment.
//!
//! Every operation runs inside the apartment's exclusive section in the
//! registry, so it never interleaves with a tax or income tick touching the
//! same apartment.

use crate::apartment::{Apartment, MAX_LEVEL};
use crate::config::{IncomeConfig, OwnershipConfig};
use crate::error::EconomyError;
use crate::event::{EventBus, EventKind};
use crate::ports::{buff_or, charge, BuffProvider, Ledger, Statistics};
use crate::registry::ApartmentRegistry;
use crate::status::{StatusResolver, TaxStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;


/// Result of a successful tax payment
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub invoice_ids: Vec<String>,
    pub amount: f64,
    pub status: TaxStatus,
}

pub struct ApartmentActions {
    registry: Arc<ApartmentRegistry>,
    resolver: StatusResolver,
    ledger: Arc<dyn Ledger>,
    buffs: Arc<dyn BuffProvider>,
    stats: Arc<dyn Statistics>,
    events: EventBus,
    ownership: OwnershipConfig,
    income: IncomeConfig,
}

impl ApartmentActions {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<ApartmentRegistry>,
        resolver: StatusResolver,
        ledger: Arc<dyn Ledger>,
        buffs: Arc<dyn BuffProvider>,
        stats: Arc<dyn Statistics>,
        events: EventBus,
        ownership: OwnershipConfig,
        income: IncomeConfig,
    ) -> Self {
        Self {
            registry,
            resolver,
            ledger,
            buffs,
            stats,
            events,
            ownership,
            income,
        }
    }

    /// Current status from the published snapshot
    pub fn status(&self, id: &str, now: DateTime<Utc>) -> Result<TaxStatus, EconomyError> {
        let apartment = self
            .registry
            .get(id)
            .ok_or_else(|| EconomyError::NotFound(id.to_string()))?;
        Ok(self.resolver.resolve(now, &apartment.invoices))
    }

    /// How many apartments `owner` may hold, including buff slots
    pub fn ownership_limit(&self, owner: &Uuid) -> usize {
        let extra = buff_or(
            self.buffs.extra_ownership_slots(owner),
            0,
            "extra_ownership_slots",
            owner,
        );
        self.ownership.max_apartments_per_owner + extra as usize
    }

    pub fn purchase(&self, id: &str, buyer: Uuid, now: DateTime<Utc>) -> Result<(), EconomyError> {
        let limit = self.ownership_limit(&buyer);
        let owned = self.registry.count_owned_by(&buyer);
        if owned >= limit {
            return Err(EconomyError::OwnershipLimit { owned, limit });
        }

        self.with(id, |apartment| {
            if apartment.is_owned() {
                return Err(EconomyError::AlreadyOwned);
            }
            charge(self.ledger.as_ref(), &buyer, apartment.price)?;
            apartment.assign_owner(buyer, now);

            info!(apartment_id = %apartment.id, owner = %buyer, price = apartment.price, "Apartment purchased");
            Ok(())
        })
    }

    /// Sell back to the market. Pending income goes to the seller first.
    pub fn release(&self, id: &str, owner: Uuid, now: DateTime<Utc>) -> Result<(), EconomyError> {
        self.with(id, |apartment| {
            self.require_owner(apartment, &owner)?;
            self.require_unfrozen(apartment, now)?;

            if apartment.pending_income > 0.0 {
                if let Err(e) = self.ledger.deposit(&owner, apartment.pending_income) {
                    // Still owned with income pending; the owner can retry
                    warn!(apartment_id = %apartment.id, owner = %owner, error = %e, "Could not pay out pending income on release");
                    return Err(EconomyError::LedgerUnavailable);
                }
            }
            apartment.reset();

            info!(apartment_id = %apartment.id, former_owner = %owner, "Apartment released to market");
            self.events.publish(
                &apartment.id,
                now,
                EventKind::OwnershipReleased {
                    former_owner: owner,
                },
            );
            Ok(())
        })
    }

    /// Pay every unpaid invoice. Allowed in any status short of repossession.
    pub fn pay_invoices(
        &self,
        id: &str,
        payer: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PaymentReceipt, EconomyError> {
        self.with(id, |apartment| {
            self.require_owner(apartment, &payer)?;
            self.require_not_repossessed(apartment, now)?;

            let total = apartment.total_unpaid();
            if total <= 0.0 {
                return Err(EconomyError::NoUnpaidInvoices);
            }
            charge(self.ledger.as_ref(), &payer, total)?;

            let invoice_ids = apartment.invoices.pay_all(now);
            Ok(self.settle(apartment, payer, invoice_ids, total, now))
        })
    }

    pub fn pay_invoice(
        &self,
        id: &str,
        payer: Uuid,
        invoice_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PaymentReceipt, EconomyError> {
        self.with(id, |apartment| {
            self.require_owner(apartment, &payer)?;
            self.require_not_repossessed(apartment, now)?;

            let amount = match apartment.invoices.get(invoice_id) {
                Some(invoice) if !invoice.is_paid() => invoice.amount(),
                _ => return Err(EconomyError::InvoiceNotFound(invoice_id.to_string())),
            };
            charge(self.ledger.as_ref(), &payer, amount)?;
            apartment.invoices.pay(invoice_id, now);

            Ok(self.settle(apartment, payer, vec![invoice_id.to_string()], amount, now))
        })
    }

    pub fn set_auto_tax_payment(&self, id: &str, owner: Uuid, enabled: bool) -> Result<(), EconomyError> {
        self.with(id, |apartment| {
            self.require_owner(apartment, &owner)?;
            apartment.auto_tax_payment = enabled;
            Ok(())
        })
    }

    /// Move pending income to the owner's balance. Returns the amount claimed.
    pub fn claim_income(&self, id: &str, owner: Uuid, now: DateTime<Utc>) -> Result<f64, EconomyError> {
        self.with(id, |apartment| {
            self.require_owner(apartment, &owner)?;
            self.require_unfrozen(apartment, now)?;

            let amount = apartment.pending_income;
            if amount <= 0.0 {
                return Err(EconomyError::NothingToClaim);
            }
            if let Err(e) = self.ledger.deposit(&owner, amount) {
                // Keep the income pending so it can be claimed again
                warn!(apartment_id = %apartment.id, owner = %owner, error = %e, "Income deposit failed");
                return Err(EconomyError::LedgerUnavailable);
            }
            apartment.pending_income = 0.0;
            Ok(amount)
        })
    }

    /// Raise the level by one, paying the next level's upgrade cost. Returns the new level.
    pub fn upgrade(&self, id: &str, owner: Uuid, now: DateTime<Utc>) -> Result<u8, EconomyError> {
        self.with(id, |apartment| {
            self.require_owner(apartment, &owner)?;
            self.require_unfrozen(apartment, now)?;

            if apartment.level >= MAX_LEVEL {
                return Err(EconomyError::MaxLevel);
            }
            let next = apartment.level + 1;
            let Some(level) = self.income.level(next) else {
                warn!(apartment_id = %apartment.id, level = next, "No level configuration, upgrade refused");
                return Err(EconomyError::MissingLevelConfig(next));
            };

            if level.upgrade_cost > 0.0 {
                charge(self.ledger.as_ref(), &owner, level.upgrade_cost)?;
            }
            apartment.level = next;

            info!(apartment_id = %apartment.id, owner = %owner, level = next, "Apartment upgraded");
            Ok(next)
        })
    }

    /// Admin override: drop an invoice, paid or not
    pub fn admin_remove_invoice(&self, id: &str, invoice_id: &str) -> Result<(), EconomyError> {
        self.with(id, |apartment| {
            apartment
                .invoices
                .remove(invoice_id)
                .ok_or_else(|| EconomyError::InvoiceNotFound(invoice_id.to_string()))?;
            info!(apartment_id = %apartment.id, invoice_id = %invoice_id, "Invoice removed by admin");
            Ok(())
        })
    }

    fn settle(
        &self,
        apartment: &mut Apartment,
        payer: Uuid,
        invoice_ids: Vec<String>,
        amount: f64,
        now: DateTime<Utc>,
    ) -> PaymentReceipt {
        apartment.last_tax_payment = Some(now);
        self.stats.record_tax_paid(&payer, amount);

        info!(apartment_id = %apartment.id, owner = %payer, amount, invoices = invoice_ids.len(), "Taxes paid");
        self.events.publish(
            &apartment.id,
            now,
            EventKind::InvoicePaid {
                owner: payer,
                invoice_ids: invoice_ids.clone(),
                amount,
                automatic: false,
            },
        );

        PaymentReceipt {
            invoice_ids,
            amount,
            status: self.resolver.resolve(now, &apartment.invoices),
        }
    }

    fn with<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Apartment) -> Result<R, EconomyError>,
    ) -> Result<R, EconomyError> {
        self.registry
            .modify(id, f)
            .unwrap_or_else(|| Err(EconomyError::NotFound(id.to_string())))
    }

    fn require_owner(&self, apartment: &Apartment, who: &Uuid) -> Result<(), EconomyError> {
        match apartment.owner {
            None => Err(EconomyError::Unowned),
            Some(owner) if owner == *who => Ok(()),
            Some(_) => Err(EconomyError::NotOwner),
        }
    }

    fn require_unfrozen(&self, apartment: &Apartment, now: DateTime<Utc>) -> Result<(), EconomyError> {
        let status = self.resolver.resolve(now, &apartment.invoices);
        if status.is_frozen() {
            return Err(EconomyError::Frozen(status));
        }
        Ok(())
    }

    fn require_not_repossessed(&self, apartment: &Apartment, now: DateTime<Utc>) -> Result<(), EconomyError> {
        let status = self.resolver.resolve(now, &apartment.invoices);
        if status == TaxStatus::Repossession {
            return Err(EconomyError::Frozen(status));
        }
        Ok(())
    }
}
