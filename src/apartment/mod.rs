// Apartment records and their billing invoices

mod invoice;

pub use invoice::{Invoice, InvoiceLedger};

use chrono::serde::ts_milliseconds_option;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

#[cfg(test)]
mod tests;

/// Highest level an apartment can be upgraded to
pub const MAX_LEVEL: u8 = 5;

/// Apartment is one ownable economic unit tracked by the registry.
///
/// Serialized with the kebab-case keys of the persisted document. The id is
/// the document key, so it is not part of the record body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Apartment {
    #[serde(skip)]
    pub id: String,

    /// Spatial region backing this apartment (opaque to the economy)
    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub world: String,

    /// Current owner, absent when the apartment is on the market
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Uuid>,

    pub price: f64,

    /// 1..=MAX_LEVEL
    #[serde(deserialize_with = "deserialize_level")]
    pub level: u8,

    /// Unclaimed accrued income
    #[serde(default)]
    pub pending_income: f64,

    #[serde(
        default,
        with = "ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_tax_payment: Option<DateTime<Utc>>,

    #[serde(default)]
    pub auto_tax_payment: bool,

    /// Billing gate: a new invoice is issued once a full billing period has passed
    #[serde(
        default,
        with = "ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_invoice_at: Option<DateTime<Utc>>,

    /// Last time income accrued (per-owner interval reduction is measured from here)
    #[serde(
        default,
        with = "ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_income_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_message: Option<String>,

    #[serde(default, rename = "tax-invoices")]
    pub invoices: InvoiceLedger,
}

impl Apartment {
    /// Create an unowned apartment at the given level (clamped to 1..=MAX_LEVEL)
    pub fn new(id: &str, region: &str, world: &str, price: f64, level: u8) -> Self {
        Self {
            id: id.to_string(),
            region: region.to_string(),
            world: world.to_string(),
            owner: None,
            price,
            level: level.clamp(1, MAX_LEVEL),
            pending_income: 0.0,
            last_tax_payment: None,
            auto_tax_payment: false,
            last_invoice_at: None,
            last_income_at: None,
            display_name: None,
            welcome_message: None,
            invoices: InvoiceLedger::new(),
        }
    }

    pub fn is_owned(&self) -> bool {
        self.owner.is_some()
    }

    pub fn is_owned_by(&self, who: &Uuid) -> bool {
        self.owner.as_ref() == Some(who)
    }

    /// Sum of unpaid invoice amounts, always derived from the invoice list
    pub fn total_unpaid(&self) -> f64 {
        self.invoices.total_unpaid()
    }

    /// Hand the apartment to a new owner, starting a fresh billing cycle at `now`.
    pub fn assign_owner(&mut self, owner: Uuid, now: DateTime<Utc>) {
        self.reset();
        self.owner = Some(owner);
        self.last_tax_payment = Some(now);
        self.last_invoice_at = Some(now);
        self.last_income_at = Some(now);
    }

    /// Return the apartment to the unowned pool.
    ///
    /// Returns the former owner, if any.
    pub fn reset(&mut self) -> Option<Uuid> {
        let former = self.owner.take();
        self.invoices.clear();
        self.pending_income = 0.0;
        self.auto_tax_payment = false;
        self.last_tax_payment = None;
        self.last_invoice_at = None;
        self.last_income_at = None;
        self.display_name = None;
        self.welcome_message = None;
        former
    }

    /// Enforce `owner == None => no invoices and no pending income`.
    ///
    /// Returns true if anything had to be cleared.
    pub fn normalize(&mut self) -> bool {
        if self.owner.is_some() {
            return false;
        }
        let dirty = !self.invoices.is_empty() || self.pending_income != 0.0;
        if dirty {
            self.invoices.clear();
            self.pending_income = 0.0;
        }
        dirty
    }
}

fn deserialize_level<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let level = u8::deserialize(deserializer)?;
    if (1..=MAX_LEVEL).contains(&level) {
        Ok(level)
    } else {
        Err(serde::de::Error::custom(format!(
            "level {} out of range 1..={}",
            level, MAX_LEVEL
        )))
    }
}
