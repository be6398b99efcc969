use crate::status::TaxStatus;
use std::fmt;

/// Domain failures of direct actions and registry edits
#[derive(Debug, Clone, PartialEq)]
pub enum EconomyError {
    NotFound(String),
    AlreadyExists(String),
    NotOwner,
    AlreadyOwned,
    Unowned,
    Frozen(TaxStatus),
    InsufficientFunds { required: f64 },
    OwnershipLimit { owned: usize, limit: usize },
    NoUnpaidInvoices,
    InvoiceNotFound(String),
    NothingToClaim,
    MaxLevel,
    MissingLevelConfig(u8),
    LedgerUnavailable,
}

impl fmt::Display for EconomyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EconomyError::NotFound(id) => write!(f, "apartment '{}' not found", id),
            EconomyError::AlreadyExists(id) => write!(f, "apartment '{}' already exists", id),
            EconomyError::NotOwner => write!(f, "caller does not own this apartment"),
            EconomyError::AlreadyOwned => write!(f, "apartment is already owned"),
            EconomyError::Unowned => write!(f, "apartment has no owner"),
            EconomyError::Frozen(status) => {
                write!(f, "apartment is {} and only accepts tax payments", status)
            }
            EconomyError::InsufficientFunds { required } => {
                write!(f, "insufficient funds: {:.2} required", required)
            }
            EconomyError::OwnershipLimit { owned, limit } => {
                write!(f, "ownership limit reached ({}/{})", owned, limit)
            }
            EconomyError::NoUnpaidInvoices => write!(f, "no unpaid invoices"),
            EconomyError::InvoiceNotFound(id) => write!(f, "invoice '{}' not found or already paid", id),
            EconomyError::NothingToClaim => write!(f, "no pending income to claim"),
            EconomyError::MaxLevel => write!(f, "apartment is already at max level"),
            EconomyError::MissingLevelConfig(level) => {
                write!(f, "no level configuration for level {}", level)
            }
            EconomyError::LedgerUnavailable => write!(f, "ledger is unavailable, try again later"),
        }
    }
}

impl std::error::Error for EconomyError {}
