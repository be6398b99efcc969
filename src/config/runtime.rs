use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Switches the loops read before every tick, so an operator can pause
/// billing or accrual without restarting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub tax_enabled: bool,
    pub income_enabled: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tax_enabled: true,
            income_enabled: true,
        }
    }
}

impl RuntimeConfig {
    /// Build from env vars, falling back to defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("APARTMENTS_TAX_ENABLED") {
            if let Ok(b) = v.parse::<bool>() {
                cfg.tax_enabled = b;
            }
        }
        if let Ok(v) = std::env::var("APARTMENTS_INCOME_ENABLED") {
            if let Ok(b) = v.parse::<bool>() {
                cfg.income_enabled = b;
            }
        }

        cfg
    }
}

pub type SharedRuntimeConfig = Arc<RwLock<RuntimeConfig>>;

pub fn new_runtime_config() -> SharedRuntimeConfig {
    Arc::new(RwLock::new(RuntimeConfig::from_env()))
}
