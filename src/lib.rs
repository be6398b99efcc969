// Apartment records and invoices
pub mod apartment;

// Tax status derivation
pub mod status;

// Domain errors
pub mod error;

// Concurrent apartment registry
pub mod registry;

// Economy events
pub mod event;

// Host interfaces: ledger, buffs, statistics
pub mod ports;

// Configuration (TOML + runtime toggles)
pub mod config;

// Tax billing, escalation and repossession
pub mod tax;

// Income accrual
pub mod income;

// Player and admin operations
pub mod actions;

// JSON persistence
pub mod store;

// Background loops
pub mod scheduler;
