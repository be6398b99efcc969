pub mod runtime;
pub use runtime::{new_runtime_config, RuntimeConfig, SharedRuntimeConfig};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// Re-export thresholds, they live with the resolver
pub use crate::status::StatusThresholds;

/// Upper bound for configured periods (100 years), keeps durations and
/// timestamp arithmetic in range
pub const MAX_PERIOD_HOURS: i64 = 24 * 365 * 100;

/// Complete economy configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EconomyConfig {
    #[serde(default)]
    pub tax: TaxConfig,
    #[serde(default)]
    pub status: StatusThresholds,
    #[serde(default)]
    pub income: IncomeConfig,
    #[serde(default)]
    pub ownership: OwnershipConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl EconomyConfig {
    pub fn validate(&self) -> Result<()> {
        self.status.validate()?;

        if !(1..=MAX_PERIOD_HOURS).contains(&self.tax.billing_period_hours) {
            bail!(
                "tax.billing_period_hours must be between 1 and {}",
                MAX_PERIOD_HOURS
            );
        }
        if !(0..=MAX_PERIOD_HOURS).contains(&self.tax.due_window_hours) {
            bail!(
                "tax.due_window_hours must be between 0 and {}",
                MAX_PERIOD_HOURS
            );
        }
        if self.tax.base_percent_per_level < 0.0 {
            bail!("tax.base_percent_per_level must not be negative");
        }
        if !(1..=MAX_PERIOD_HOURS * 60).contains(&self.income.interval_minutes) {
            bail!(
                "income.interval_minutes must be between 1 and {}",
                MAX_PERIOD_HOURS * 60
            );
        }
        for level in &self.income.levels {
            if level.min_income > level.max_income {
                bail!(
                    "income level {}: min_income {} exceeds max_income {}",
                    level.level,
                    level.min_income,
                    level.max_income
                );
            }
        }
        if self.scheduler.tax_tick_seconds == 0 || self.scheduler.income_tick_seconds == 0 {
            bail!("scheduler tick periods must be positive");
        }
        if self.persistence.flush_interval_seconds == 0 {
            bail!("persistence.flush_interval_seconds must be positive");
        }
        Ok(())
    }
}

/// Invoice issuance
#[derive(Debug, Clone, Deserialize)]
pub struct TaxConfig {
    #[serde(default = "default_billing_period_hours")]
    pub billing_period_hours: i64,
    /// Informational due date offset written on each invoice
    #[serde(default = "default_due_window_hours")]
    pub due_window_hours: i64,
    /// Invoice amount = price × base_percent_per_level% × level
    #[serde(default = "default_base_percent_per_level")]
    pub base_percent_per_level: f64,
}

fn default_billing_period_hours() -> i64 {
    24
}

fn default_due_window_hours() -> i64 {
    24
}

fn default_base_percent_per_level() -> f64 {
    2.5
}

impl TaxConfig {
    pub fn billing_period(&self) -> chrono::Duration {
        chrono::Duration::hours(self.billing_period_hours)
    }

    pub fn due_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.due_window_hours)
    }
}

impl Default for TaxConfig {
    fn default() -> Self {
        Self {
            billing_period_hours: default_billing_period_hours(),
            due_window_hours: default_due_window_hours(),
            base_percent_per_level: default_base_percent_per_level(),
        }
    }
}

/// Per-level economics, read-only
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LevelConfig {
    pub level: u8,
    pub min_income: f64,
    pub max_income: f64,
    /// Cost to upgrade *to* this level
    #[serde(default)]
    pub upgrade_cost: f64,
    pub income_capacity: f64,
}

/// Income accrual
#[derive(Debug, Clone, Deserialize)]
pub struct IncomeConfig {
    /// Base time between two accruals of the same apartment
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: i64,
    #[serde(default = "default_levels")]
    pub levels: Vec<LevelConfig>,
}

fn default_interval_minutes() -> i64 {
    60
}

fn default_levels() -> Vec<LevelConfig> {
    let level = |level, min_income, max_income, upgrade_cost, income_capacity| LevelConfig {
        level,
        min_income,
        max_income,
        upgrade_cost,
        income_capacity,
    };
    vec![
        level(1, 10.0, 20.0, 0.0, 50.0),
        level(2, 20.0, 35.0, 5_000.0, 100.0),
        level(3, 35.0, 55.0, 12_000.0, 180.0),
        level(4, 55.0, 80.0, 25_000.0, 300.0),
        level(5, 80.0, 120.0, 50_000.0, 500.0),
    ]
}

impl IncomeConfig {
    pub fn interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.interval_minutes)
    }

    pub fn level(&self, level: u8) -> Option<&LevelConfig> {
        self.levels.iter().find(|l| l.level == level)
    }
}

impl Default for IncomeConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            levels: default_levels(),
        }
    }
}

/// Purchase limits
#[derive(Debug, Clone, Deserialize)]
pub struct OwnershipConfig {
    /// Before extra slots from buffs
    #[serde(default = "default_max_apartments_per_owner")]
    pub max_apartments_per_owner: usize,
}

fn default_max_apartments_per_owner() -> usize {
    1
}

impl Default for OwnershipConfig {
    fn default() -> Self {
        Self {
            max_apartments_per_owner: default_max_apartments_per_owner(),
        }
    }
}

/// Persisted document location and flush cadence
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_path")]
    pub path: PathBuf,
    #[serde(default = "default_flush_interval_seconds")]
    pub flush_interval_seconds: u64,
}

fn default_path() -> PathBuf {
    PathBuf::from("apartments.json")
}

fn default_flush_interval_seconds() -> u64 {
    300
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            flush_interval_seconds: default_flush_interval_seconds(),
        }
    }
}

/// How often the loops wake up. The tax tick is gated per billing period,
/// so it can safely run more often than once a day.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tax_tick_seconds")]
    pub tax_tick_seconds: u64,
    #[serde(default = "default_income_tick_seconds")]
    pub income_tick_seconds: u64,
}

fn default_tax_tick_seconds() -> u64 {
    3600
}

fn default_income_tick_seconds() -> u64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tax_tick_seconds: default_tax_tick_seconds(),
            income_tick_seconds: default_income_tick_seconds(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &Path) -> Result<EconomyConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: EconomyConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EconomyConfig::default();
        assert_eq!(config.tax.billing_period_hours, 24);
        assert_eq!(config.tax.base_percent_per_level, 2.5);
        assert_eq!(config.status, StatusThresholds::new(0, 3, 5).unwrap());
        assert_eq!(config.income.levels.len(), 5);
        assert_eq!(config.income.level(1).unwrap().income_capacity, 50.0);
        assert_eq!(config.ownership.max_apartments_per_owner, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [tax]
            billing_period_hours = 12
            due_window_hours = 48
            base_percent_per_level = 1.5

            [status]
            overdue_days = 1
            inactive_days = 4
            repossess_days = 7

            [income]
            interval_minutes = 30

            [[income.levels]]
            level = 1
            min_income = 5.0
            max_income = 8.0
            income_capacity = 40.0

            [ownership]
            max_apartments_per_owner = 3

            [persistence]
            path = "/tmp/apartments.json"
            flush_interval_seconds = 60

            [scheduler]
            tax_tick_seconds = 600
            income_tick_seconds = 30
        "#;

        let config: EconomyConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.tax.billing_period_hours, 12);
        assert_eq!(config.tax.due_window(), chrono::Duration::hours(48));
        assert_eq!(config.status.repossess_days, 7);
        assert_eq!(config.income.interval(), chrono::Duration::minutes(30));
        assert_eq!(config.income.levels.len(), 1);
        assert_eq!(config.income.level(1).unwrap().upgrade_cost, 0.0);
        assert!(config.income.level(2).is_none());
        assert_eq!(config.ownership.max_apartments_per_owner, 3);
        assert_eq!(config.persistence.path, PathBuf::from("/tmp/apartments.json"));
        assert_eq!(config.scheduler.income_tick_seconds, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [status]
            repossess_days = 10
        "#;

        let config: EconomyConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.status.overdue_days, 0); // Default
        assert_eq!(config.status.inactive_days, 3); // Default
        assert_eq!(config.status.repossess_days, 10);
        assert_eq!(config.tax.billing_period_hours, 24); // Default
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let toml = r#"
            [status]
            overdue_days = 4
            inactive_days = 3
            repossess_days = 5
        "#;

        let config: EconomyConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_income_range_rejected() {
        let mut config = EconomyConfig::default();
        config.income.levels[0].min_income = 30.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_periods_rejected() {
        let mut config = EconomyConfig::default();
        config.tax.billing_period_hours = i64::MAX;
        assert!(config.validate().is_err());

        let mut config = EconomyConfig::default();
        config.tax.due_window_hours = MAX_PERIOD_HOURS + 1;
        assert!(config.validate().is_err());

        let mut config = EconomyConfig::default();
        config.income.interval_minutes = i64::MAX / 2;
        assert!(config.validate().is_err());

        let mut config = EconomyConfig::default();
        config.tax.billing_period_hours = MAX_PERIOD_HOURS;
        config.income.interval_minutes = MAX_PERIOD_HOURS * 60;
        assert!(config.validate().is_ok());
        assert_eq!(
            config.tax.billing_period(),
            chrono::Duration::hours(MAX_PERIOD_HOURS)
        );
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("apartments.toml");
        std::fs::write(&path, "[ownership]\nmax_apartments_per_owner = 2\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.ownership.max_apartments_per_owner, 2);

        assert!(load_config(&dir.path().join("missing.toml")).is_err());
    }
}
