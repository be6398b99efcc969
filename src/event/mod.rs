use crate::status::TaxStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;


/// EconomyEvent is a fire-and-forget notification about one apartment.
///
/// Consumed by notification and statistics layers outside this crate;
/// delivery is best-effort (lagging or absent receivers simply miss events).
#[derive(Clone, Debug, Serialize)]
pub struct EconomyEvent {
    pub apartment_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EventKind {
    InvoiceCreated {
        owner: Uuid,
        invoice_id: String,
        amount: f64,
        due_at: DateTime<Utc>,
    },
    InvoicePaid {
        owner: Uuid,
        invoice_ids: Vec<String>,
        amount: f64,
        /// True when collected by the tax tick rather than by the owner
        automatic: bool,
    },
    StatusEscalated {
        owner: Uuid,
        from: TaxStatus,
        to: TaxStatus,
    },
    /// Ownership-scoped state (ratings, guests) must be dropped by consumers
    ApartmentRepossessed { former_owner: Uuid },
    /// Owner sold the apartment back to the market
    OwnershipReleased { former_owner: Uuid },
    IncomeAccrued {
        owner: Uuid,
        amount: f64,
        pending_income: f64,
    },
}

/// Broadcast bus for [`EconomyEvent`]s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EconomyEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish; having no subscribers is fine
    pub fn publish(&self, apartment_id: &str, timestamp: DateTime<Utc>, kind: EventKind) {
        let _ = self.tx.send(EconomyEvent {
            apartment_id: apartment_id.to_string(),
            timestamp,
            kind,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EconomyEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}
