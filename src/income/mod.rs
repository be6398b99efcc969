// Periodic income accrual with capacity caps and stacked bonuses

mod roll;

pub use roll::{FixedRoll, IncomeRoll, RandomRoll};

use crate::apartment::Apartment;
use crate::config::IncomeConfig;
use crate::event::{EventBus, EventKind};
use crate::ports::{buff_or, BuffProvider, Statistics};
use crate::registry::ApartmentRegistry;
use crate::status::StatusResolver;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};
use uuid::Uuid;


/// Longest interval cut a buff can grant, in percent
const MAX_INTERVAL_REDUCTION: f64 = 90.0;

/// Counts from one [`IncomeEngine::tick`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncomeTickReport {
    pub accrued: usize,
    /// Owned but not ACTIVE
    pub suspended: usize,
    /// Accrual interval not yet elapsed
    pub not_due: usize,
    /// Level has no configuration
    pub unconfigured: usize,
    /// Already at capacity, nothing added
    pub at_capacity: usize,
    pub total_accrued: f64,
}

enum Accrual {
    Unowned,
    Suspended,
    NotDue,
    Unconfigured,
    Added(f64),
}

pub struct IncomeEngine {
    registry: Arc<ApartmentRegistry>,
    resolver: StatusResolver,
    buffs: Arc<dyn BuffProvider>,
    stats: Arc<dyn Statistics>,
    events: EventBus,
    config: IncomeConfig,
    roll: Mutex<Box<dyn IncomeRoll>>,
}

impl IncomeEngine {
    pub fn new(
        registry: Arc<ApartmentRegistry>,
        resolver: StatusResolver,
        buffs: Arc<dyn BuffProvider>,
        stats: Arc<dyn Statistics>,
        events: EventBus,
        config: IncomeConfig,
        roll: Box<dyn IncomeRoll>,
    ) -> Self {
        Self {
            registry,
            resolver,
            buffs,
            stats,
            events,
            config,
            roll: Mutex::new(roll),
        }
    }

    /// Accrue income for every owned ACTIVE apartment whose interval has elapsed.
    pub fn tick(&self, now: DateTime<Utc>) -> IncomeTickReport {
        let mut report = IncomeTickReport::default();

        for id in self.registry.ids() {
            let Some(accrual) = self.registry.modify(&id, |apartment| self.accrue(apartment, now))
            else {
                continue;
            };

            match accrual {
                Accrual::Unowned => {}
                Accrual::Suspended => report.suspended += 1,
                Accrual::NotDue => report.not_due += 1,
                Accrual::Unconfigured => report.unconfigured += 1,
                Accrual::Added(amount) if amount > 0.0 => {
                    report.accrued += 1;
                    report.total_accrued += amount;
                }
                Accrual::Added(_) => report.at_capacity += 1,
            }
        }

        debug!(
            accrued = report.accrued,
            suspended = report.suspended,
            total = report.total_accrued,
            "Income tick complete"
        );

        report
    }

    /// Capacity of an apartment for its owner, including research bonuses
    pub fn capacity(&self, apartment: &Apartment, owner: &Uuid) -> Option<f64> {
        let level = self.config.level(apartment.level)?;
        let bonus = buff_or(
            self.buffs.income_capacity_bonus(owner),
            0.0,
            "income_capacity_bonus",
            owner,
        );
        Some(level.income_capacity * (1.0 + bonus / 100.0))
    }

    /// Time between accruals for this owner after interval-reduction buffs
    pub fn interval_for(&self, owner: &Uuid) -> Duration {
        let reduction = buff_or(
            self.buffs.income_interval_reduction(owner),
            0.0,
            "income_interval_reduction",
            owner,
        )
        .clamp(0.0, MAX_INTERVAL_REDUCTION);

        let base_ms = self.config.interval().num_milliseconds() as f64;
        Duration::milliseconds((base_ms * (1.0 - reduction / 100.0)) as i64)
    }

    fn accrue(&self, apartment: &mut Apartment, now: DateTime<Utc>) -> Accrual {
        let Some(owner) = apartment.owner else {
            return Accrual::Unowned;
        };

        if !self.resolver.resolve(now, &apartment.invoices).accrues_income() {
            return Accrual::Suspended;
        }

        if let Some(last) = apartment.last_income_at {
            if now - last < self.interval_for(&owner) {
                return Accrual::NotDue;
            }
        }

        let Some(level) = self.config.level(apartment.level) else {
            warn!(
                apartment_id = %apartment.id,
                level = apartment.level,
                "No level configuration, skipping income"
            );
            return Accrual::Unconfigured;
        };

        let base = self
            .roll
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .roll(level.min_income, level.max_income);

        let flat = buff_or(
            self.buffs.flat_income_bonus(&owner, &apartment.id),
            0.0,
            "flat_income_bonus",
            &owner,
        );
        let percent = buff_or(
            self.buffs.income_amount_bonus(&owner, &apartment.id),
            0.0,
            "income_amount_bonus",
            &owner,
        );
        let income = ((base + flat) * (1.0 + percent / 100.0)).max(0.0);

        let capacity = self.capacity(apartment, &owner).unwrap_or(level.income_capacity);

        // Excess above the cap is dropped; pending income is never reduced here
        let before = apartment.pending_income;
        let after = (before + income).min(capacity).max(before);
        let added = after - before;

        apartment.pending_income = after;
        apartment.last_income_at = Some(now);

        if added > 0.0 {
            self.stats.record_income(&owner, added);
            self.events.publish(
                &apartment.id,
                now,
                EventKind::IncomeAccrued {
                    owner,
                    amount: added,
                    pending_income: after,
                },
            );
        }

        debug!(
            apartment_id = %apartment.id,
            rolled = base,
            income,
            added,
            pending = after,
            capacity,
            "Income accrued"
        );

        Accrual::Added(added)
    }
}
