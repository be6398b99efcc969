use chrono::serde::{ts_milliseconds, ts_milliseconds_option};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

/// One billing obligation.
///
/// `paid_at` is write-once: an invoice can be paid but never un-paid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Invoice {
    id: String,
    amount: f64,
    #[serde(with = "ts_milliseconds")]
    created_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    due_at: DateTime<Utc>,
    #[serde(default, with = "ts_milliseconds_option")]
    paid_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Create an unpaid invoice with a fresh time-ordered id
    pub fn new(amount: f64, created_at: DateTime<Utc>, due_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            amount,
            created_at,
            due_at,
            paid_at: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn due_at(&self) -> DateTime<Utc> {
        self.due_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn is_paid(&self) -> bool {
        self.paid_at.is_some()
    }

    /// Mark paid at `at`. Returns false (and changes nothing) if already paid.
    pub fn mark_paid(&mut self, at: DateTime<Utc>) -> bool {
        if self.paid_at.is_some() {
            return false;
        }
        self.paid_at = Some(at);
        true
    }

    fn is_well_formed(&self) -> bool {
        !self.id.is_empty() && self.amount.is_finite() && self.amount > 0.0
    }
}

/// Ordered invoice history of one apartment.
///
/// Deserialization is lenient: malformed entries are logged and dropped, the
/// rest are kept in their original order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct InvoiceLedger {
    invoices: Vec<Invoice>,
}

impl InvoiceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw records, skipping the ones that do not parse
    pub fn from_raw(raw: Vec<Value>) -> Self {
        let mut invoices = Vec::with_capacity(raw.len());
        for (index, value) in raw.into_iter().enumerate() {
            match serde_json::from_value::<Invoice>(value) {
                Ok(invoice) if invoice.is_well_formed() => invoices.push(invoice),
                Ok(invoice) => {
                    warn!(
                        index,
                        invoice_id = %invoice.id,
                        amount = invoice.amount,
                        "Invoice record has invalid id or amount, skipping"
                    );
                }
                Err(e) => {
                    warn!(index, error = %e, "Malformed invoice record, skipping");
                }
            }
        }
        Self { invoices }
    }

    /// Append a new unpaid invoice and return a copy of it
    pub fn issue(&mut self, amount: f64, now: DateTime<Utc>, due_window: Duration) -> Invoice {
        let invoice = Invoice::new(amount, now, now + due_window);
        self.invoices.push(invoice.clone());
        invoice
    }

    pub fn push(&mut self, invoice: Invoice) {
        self.invoices.push(invoice);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Invoice> {
        self.invoices.iter()
    }

    pub fn unpaid(&self) -> impl Iterator<Item = &Invoice> {
        self.invoices.iter().filter(|i| !i.is_paid())
    }

    pub fn has_unpaid(&self) -> bool {
        self.unpaid().next().is_some()
    }

    /// Recomputed on every call; there is no cached total to drift.
    pub fn total_unpaid(&self) -> f64 {
        self.unpaid().map(Invoice::amount).sum()
    }

    pub fn get(&self, invoice_id: &str) -> Option<&Invoice> {
        self.invoices.iter().find(|i| i.id == invoice_id)
    }

    /// Pay every unpaid invoice. Returns the ids that were paid.
    pub fn pay_all(&mut self, at: DateTime<Utc>) -> Vec<String> {
        self.invoices
            .iter_mut()
            .filter_map(|i| i.mark_paid(at).then(|| i.id.clone()))
            .collect()
    }

    /// Pay a single invoice. Returns its amount, or None if unknown or already paid.
    pub fn pay(&mut self, invoice_id: &str, at: DateTime<Utc>) -> Option<f64> {
        let invoice = self.invoices.iter_mut().find(|i| i.id == invoice_id)?;
        invoice.mark_paid(at).then_some(invoice.amount)
    }

    pub fn remove(&mut self, invoice_id: &str) -> Option<Invoice> {
        let index = self.invoices.iter().position(|i| i.id == invoice_id)?;
        Some(self.invoices.remove(index))
    }

    pub fn clear(&mut self) {
        self.invoices.clear();
    }

    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }
}

impl<'de> Deserialize<'de> for InvoiceLedger {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Vec::<Value>::deserialize(deserializer)?;
        Ok(Self::from_raw(raw))
    }
}
