// Daily tax tick: invoice issuance, auto-pay, escalation and repossession

use crate::apartment::Apartment;
use crate::config::TaxConfig;
use crate::event::{EventBus, EventKind};
use crate::ports::{buff_or, charge, BuffProvider, Ledger, Statistics};
use crate::registry::ApartmentRegistry;
use crate::status::{StatusResolver, TaxStatus};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;


/// Counts from one [`TaxEngine::tick`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaxTickReport {
    pub processed: usize,
    pub invoices_issued: usize,
    pub auto_paid: usize,
    pub amount_collected: f64,
    pub escalated: usize,
    pub repossessed: usize,
}

/// What happened to one apartment during a tick
#[derive(Debug, Default)]
struct Outcome {
    issued: bool,
    collected: Option<f64>,
    escalated: bool,
    repossessed: bool,
}

pub struct TaxEngine {
    registry: Arc<ApartmentRegistry>,
    resolver: StatusResolver,
    ledger: Arc<dyn Ledger>,
    buffs: Arc<dyn BuffProvider>,
    stats: Arc<dyn Statistics>,
    events: EventBus,
    config: TaxConfig,

    /// Last status reported per apartment, so escalation fires once per stage.
    /// Runtime only: after a restart the first tick may report a stage again.
    observed: DashMap<String, TaxStatus>,
}

impl TaxEngine {
    pub fn new(
        registry: Arc<ApartmentRegistry>,
        resolver: StatusResolver,
        ledger: Arc<dyn Ledger>,
        buffs: Arc<dyn BuffProvider>,
        stats: Arc<dyn Statistics>,
        events: EventBus,
        config: TaxConfig,
    ) -> Self {
        Self {
            registry,
            resolver,
            ledger,
            buffs,
            stats,
            events,
            config,
            observed: DashMap::new(),
        }
    }

    /// Run one tax pass over every owned apartment.
    ///
    /// Each apartment is processed inside its own exclusive section; order
    /// between apartments is unspecified. Calling this again within the same
    /// billing period issues no new invoices.
    pub fn tick(&self, now: DateTime<Utc>) -> TaxTickReport {
        let mut report = TaxTickReport::default();

        for id in self.registry.ids() {
            let outcome = self
                .registry
                .modify(&id, |apartment| self.process(apartment, now));

            let Some(Some(outcome)) = outcome else {
                continue;
            };

            report.processed += 1;
            report.invoices_issued += usize::from(outcome.issued);
            if let Some(amount) = outcome.collected {
                report.auto_paid += 1;
                report.amount_collected += amount;
            }
            report.escalated += usize::from(outcome.escalated);
            report.repossessed += usize::from(outcome.repossessed);
        }

        // Forget apartments deleted from the registry
        self.observed.retain(|id, _| self.registry.contains(id));

        debug!(
            processed = report.processed,
            issued = report.invoices_issued,
            auto_paid = report.auto_paid,
            repossessed = report.repossessed,
            "Tax tick complete"
        );

        report
    }

    /// Invoice amount for one billing period, after the owner's tax reduction
    pub fn invoice_amount(&self, apartment: &Apartment, owner: &Uuid) -> f64 {
        let base = apartment.price * self.config.base_percent_per_level / 100.0
            * f64::from(apartment.level);
        let reduction = buff_or(self.buffs.tax_reduction(owner), 0.0, "tax_reduction", owner)
            .clamp(0.0, 100.0);
        base * (1.0 - reduction / 100.0)
    }

    /// Unowned apartments are skipped (None).
    fn process(&self, apartment: &mut Apartment, now: DateTime<Utc>) -> Option<Outcome> {
        let Some(owner) = apartment.owner else {
            self.observed.remove(&apartment.id);
            return None;
        };
        let mut outcome = Outcome::default();

        // No new bill for an apartment that is about to be reclaimed
        if self.resolver.resolve(now, &apartment.invoices) != TaxStatus::Repossession {
            outcome.issued = self.issue_invoice(apartment, owner, now);
        }

        if apartment.auto_tax_payment && apartment.invoices.has_unpaid() {
            outcome.collected = self.auto_pay(apartment, owner, now);
        }

        let status = self.resolver.resolve(now, &apartment.invoices);
        let previous = self
            .observed
            .get(&apartment.id)
            .map(|s| *s)
            .unwrap_or(TaxStatus::Active);

        if status > previous {
            outcome.escalated = true;
            info!(
                apartment_id = %apartment.id,
                owner = %owner,
                from = %previous,
                to = %status,
                "Apartment tax status escalated"
            );
            self.events.publish(
                &apartment.id,
                now,
                EventKind::StatusEscalated {
                    owner,
                    from: previous,
                    to: status,
                },
            );
        }

        if status == TaxStatus::Repossession {
            self.repossess(apartment, now);
            outcome.repossessed = true;
        } else {
            self.observed.insert(apartment.id.clone(), status);
        }

        Some(outcome)
    }

    /// Issue at most one invoice per billing period
    fn issue_invoice(&self, apartment: &mut Apartment, owner: Uuid, now: DateTime<Utc>) -> bool {
        let due = match apartment.last_invoice_at {
            None => true,
            Some(last) => now - last >= self.config.billing_period(),
        };
        if !due {
            return false;
        }

        apartment.last_invoice_at = Some(now);

        let amount = self.invoice_amount(apartment, &owner);
        if !(amount.is_finite() && amount > 0.0) {
            // Free apartments (or a 100% reduction) owe nothing this period
            return false;
        }

        let invoice = apartment
            .invoices
            .issue(amount, now, self.config.due_window());

        debug!(
            apartment_id = %apartment.id,
            invoice_id = %invoice.id(),
            amount,
            "Invoice issued"
        );
        self.events.publish(
            &apartment.id,
            now,
            EventKind::InvoiceCreated {
                owner,
                invoice_id: invoice.id().to_string(),
                amount,
                due_at: invoice.due_at(),
            },
        );
        true
    }

    /// Collect every unpaid invoice at once, or nothing
    fn auto_pay(&self, apartment: &mut Apartment, owner: Uuid, now: DateTime<Utc>) -> Option<f64> {
        let total = apartment.total_unpaid();

        if let Err(e) = charge(self.ledger.as_ref(), &owner, total) {
            debug!(apartment_id = %apartment.id, owner = %owner, error = %e, "Auto-pay skipped");
            return None;
        }

        let invoice_ids = apartment.invoices.pay_all(now);
        apartment.last_tax_payment = Some(now);
        self.stats.record_tax_paid(&owner, total);

        info!(
            apartment_id = %apartment.id,
            owner = %owner,
            amount = total,
            invoices = invoice_ids.len(),
            "Taxes auto-paid"
        );
        self.events.publish(
            &apartment.id,
            now,
            EventKind::InvoicePaid {
                owner,
                invoice_ids,
                amount: total,
                automatic: true,
            },
        );
        Some(total)
    }

    fn repossess(&self, apartment: &mut Apartment, now: DateTime<Utc>) {
        let unpaid = apartment.total_unpaid();
        let Some(former_owner) = apartment.reset() else {
            return;
        };
        self.observed.remove(&apartment.id);

        info!(
            apartment_id = %apartment.id,
            former_owner = %former_owner,
            unpaid,
            "Apartment repossessed for unpaid taxes"
        );
        self.events.publish(
            &apartment.id,
            now,
            EventKind::ApartmentRepossessed { former_owner },
        );
    }
}
