use anyhow::{Context, Result};
use apartments::config::{load_config, new_runtime_config, EconomyConfig};
use apartments::event::EventBus;
use apartments::income::{IncomeEngine, RandomRoll};
use apartments::ports::{MemoryLedger, MemoryStatistics, NoBuffs};
use apartments::registry::ApartmentRegistry;
use apartments::scheduler::{run_flush_loop, run_income_loop, run_tax_loop};
use apartments::status::StatusResolver;
use apartments::store::ApartmentStore;
use apartments::tax::TaxEngine;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "apartments=info".into()),
        )
        .init();

    info!("Apartment economy starting...");

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("apartments.toml"));

    let config = if config_path.exists() {
        load_config(&config_path)?
    } else {
        warn!(path = %config_path.display(), "Config file not found, using defaults");
        let config = EconomyConfig::default();
        config.validate()?;
        config
    };

    info!(
        config = %config_path.display(),
        data = %config.persistence.path.display(),
        tax_tick_seconds = config.scheduler.tax_tick_seconds,
        income_tick_seconds = config.scheduler.income_tick_seconds,
        "Configuration loaded"
    );

    let runtime = new_runtime_config();

    // Load persisted apartments
    let store = Arc::new(ApartmentStore::new(config.persistence.path.clone()));
    let registry = Arc::new(ApartmentRegistry::new());
    registry.load(store.load().context("Failed to load apartment data")?);

    // Standalone mode: in-memory host collaborators
    let ledger = Arc::new(MemoryLedger::new());
    let buffs = Arc::new(NoBuffs);
    let stats = Arc::new(MemoryStatistics::new());
    let events = EventBus::default();
    let resolver = StatusResolver::new(config.status);

    let mut event_rx = events.subscribe();
    let event_handle = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => info!(event = %json, "Economy event"),
                    Err(e) => warn!(error = %e, "Failed to serialize event"),
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event logger lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let tax = Arc::new(TaxEngine::new(
        Arc::clone(&registry),
        resolver,
        ledger,
        buffs.clone(),
        stats.clone(),
        events.clone(),
        config.tax.clone(),
    ));
    let income = Arc::new(IncomeEngine::new(
        Arc::clone(&registry),
        resolver,
        buffs,
        stats,
        events,
        config.income.clone(),
        Box::new(RandomRoll::from_entropy()),
    ));

    let handles = vec![
        tokio::spawn(run_tax_loop(
            tax,
            Arc::clone(&runtime),
            config.scheduler.tax_tick_seconds,
        )),
        tokio::spawn(run_income_loop(
            income,
            Arc::clone(&runtime),
            config.scheduler.income_tick_seconds,
        )),
        tokio::spawn(run_flush_loop(
            Arc::clone(&store),
            Arc::clone(&registry),
            config.persistence.flush_interval_seconds,
        )),
    ];

    info!(apartments = registry.len(), "Apartment economy running");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    for handle in handles {
        handle.abort();
    }
    event_handle.abort();

    // Final flush
    if let Err(e) = store.flush(&registry) {
        error!(error = %e, "Final flush failed");
    }
    info!("Apartment economy stopped");

    Ok(())
}
