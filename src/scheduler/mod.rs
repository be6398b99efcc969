// Background loops driving the tax tick, income tick and persistence flush

use crate::config::SharedRuntimeConfig;
use crate::income::IncomeEngine;
use crate::registry::ApartmentRegistry;
use crate::store::ApartmentStore;
use crate::tax::TaxEngine;
use chrono::Utc;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};


/// Run the tax tick every `period_seconds` while `tax_enabled` is set.
///
/// The first tick fires immediately. Ticks run on the blocking pool since
/// they call into the host ledger synchronously.
pub async fn run_tax_loop(engine: Arc<TaxEngine>, runtime: SharedRuntimeConfig, period_seconds: u64) {
    let mut ticker = interval(Duration::from_secs(period_seconds));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(period_seconds, "Starting tax loop");

    loop {
        ticker.tick().await;

        if !runtime.read().unwrap_or_else(PoisonError::into_inner).tax_enabled {
            debug!("Tax tick disabled, skipping");
            continue;
        }

        let engine = Arc::clone(&engine);
        match tokio::task::spawn_blocking(move || engine.tick(Utc::now())).await {
            Ok(report) => {
                if report.invoices_issued > 0 || report.escalated > 0 || report.repossessed > 0 {
                    info!(
                        processed = report.processed,
                        invoices_issued = report.invoices_issued,
                        auto_paid = report.auto_paid,
                        collected = report.amount_collected,
                        escalated = report.escalated,
                        repossessed = report.repossessed,
                        "Tax tick complete"
                    );
                }
            }
            Err(e) => error!(error = %e, "Tax tick panicked"),
        }
    }
}

/// Run the income tick every `period_seconds` while `income_enabled` is set.
pub async fn run_income_loop(
    engine: Arc<IncomeEngine>,
    runtime: SharedRuntimeConfig,
    period_seconds: u64,
) {
    let mut ticker = interval(Duration::from_secs(period_seconds));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(period_seconds, "Starting income loop");

    loop {
        ticker.tick().await;

        if !runtime.read().unwrap_or_else(PoisonError::into_inner).income_enabled {
            debug!("Income tick disabled, skipping");
            continue;
        }

        let engine = Arc::clone(&engine);
        if let Err(e) = tokio::task::spawn_blocking(move || engine.tick(Utc::now())).await {
            error!(error = %e, "Income tick panicked");
        }
    }
}

/// Flush the registry to disk every `period_seconds` if it changed.
pub async fn run_flush_loop(
    store: Arc<ApartmentStore>,
    registry: Arc<ApartmentRegistry>,
    period_seconds: u64,
) {
    let mut ticker = interval(Duration::from_secs(period_seconds));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(
        period_seconds,
        path = %store.path().display(),
        "Starting flush loop"
    );

    loop {
        ticker.tick().await;

        let store = Arc::clone(&store);
        let registry = Arc::clone(&registry);
        match tokio::task::spawn_blocking(move || store.flush(&registry)).await {
            Ok(Ok(true)) => debug!("Apartments flushed"),
            Ok(Ok(false)) => {}
            Ok(Err(e)) => error!(error = %e, "Failed to flush apartments"),
            Err(e) => error!(error = %e, "Flush task panicked"),
        }
    }
}
