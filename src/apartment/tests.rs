use super::*;
use chrono::{Duration, TimeZone};
use serde_json::json;
use std::collections::HashSet;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

#[test]
fn test_total_unpaid_tracks_payments() {
    let mut ledger = InvoiceLedger::new();
    let a = ledger.issue(25.0, t0(), Duration::hours(24));
    ledger.issue(40.0, t0() + Duration::days(1), Duration::hours(24));
    ledger.issue(10.0, t0() + Duration::days(2), Duration::hours(24));

    assert_eq!(ledger.total_unpaid(), 75.0);

    assert_eq!(ledger.pay(a.id(), t0() + Duration::days(3)), Some(25.0));
    assert_eq!(ledger.total_unpaid(), 50.0);

    let expected: f64 = ledger.iter().filter(|i| !i.is_paid()).map(|i| i.amount()).sum();
    assert_eq!(ledger.total_unpaid(), expected);
}

#[test]
fn test_paid_invoice_cannot_be_paid_again() {
    let mut ledger = InvoiceLedger::new();
    let invoice = ledger.issue(25.0, t0(), Duration::hours(24));

    let first = t0() + Duration::hours(1);
    let second = t0() + Duration::hours(2);
    assert_eq!(ledger.pay(invoice.id(), first), Some(25.0));
    assert_eq!(ledger.pay(invoice.id(), second), None);

    // paid_at keeps the first payment time
    assert_eq!(ledger.get(invoice.id()).unwrap().paid_at(), Some(first));
}

#[test]
fn test_pay_all_only_reports_newly_paid() {
    let mut ledger = InvoiceLedger::new();
    let a = ledger.issue(5.0, t0(), Duration::hours(24));
    let b = ledger.issue(7.0, t0(), Duration::hours(24));
    ledger.pay(a.id(), t0());

    let paid = ledger.pay_all(t0() + Duration::hours(1));
    assert_eq!(paid, vec![b.id().to_string()]);
    assert!(!ledger.has_unpaid());
    assert_eq!(ledger.total_unpaid(), 0.0);
}

#[test]
fn test_invoice_list_survives_serialization() {
    let mut ledger = InvoiceLedger::new();
    let a = ledger.issue(25.0, t0(), Duration::hours(24));
    ledger.issue(30.0, t0() + Duration::days(1), Duration::hours(48));
    ledger.pay(a.id(), t0() + Duration::hours(5));

    let encoded = serde_json::to_value(&ledger).unwrap();
    let decoded: InvoiceLedger = serde_json::from_value(encoded).unwrap();

    let tuples = |l: &InvoiceLedger| -> HashSet<(u64, i64, i64, Option<i64>)> {
        l.iter()
            .map(|i| {
                (
                    i.amount().to_bits(),
                    i.created_at().timestamp_millis(),
                    i.due_at().timestamp_millis(),
                    i.paid_at().map(|p| p.timestamp_millis()),
                )
            })
            .collect()
    };
    assert_eq!(tuples(&ledger), tuples(&decoded));
}

#[test]
fn test_malformed_invoices_are_skipped() {
    let raw = json!([
        {"id": "inv-1", "amount": 25.0, "created-at": 1_000, "due-at": 2_000},
        {"id": "inv-2", "amount": "lots", "created-at": 1_000, "due-at": 2_000},
        {"id": "inv-3", "amount": -4.0, "created-at": 1_000, "due-at": 2_000},
        {"amount": 12.0},
        {"id": "inv-5", "amount": 12.5, "created-at": 3_000, "due-at": 4_000, "paid-at": 3_500}
    ]);

    let ledger: InvoiceLedger = serde_json::from_value(raw).unwrap();
    let ids: Vec<&str> = ledger.iter().map(|i| i.id()).collect();
    assert_eq!(ids, vec!["inv-1", "inv-5"]);
    assert_eq!(ledger.total_unpaid(), 25.0);
}

#[test]
fn test_reset_clears_ownership_state() {
    let owner = Uuid::new_v4();
    let mut apartment = Apartment::new("apt_1", "region_1", "world", 1000.0, 2);
    apartment.assign_owner(owner, t0());
    apartment.invoices.issue(50.0, t0(), Duration::hours(24));
    apartment.pending_income = 17.0;
    apartment.auto_tax_payment = true;

    assert_eq!(apartment.reset(), Some(owner));
    assert!(apartment.owner.is_none());
    assert!(apartment.invoices.is_empty());
    assert_eq!(apartment.pending_income, 0.0);
    assert!(!apartment.auto_tax_payment);
    // Level and price belong to the apartment, not the owner
    assert_eq!(apartment.level, 2);
    assert_eq!(apartment.price, 1000.0);
}

#[test]
fn test_normalize_unowned_record() {
    let mut apartment = Apartment::new("apt_1", "r", "w", 500.0, 1);
    apartment.pending_income = 3.0;
    apartment.invoices.issue(5.0, t0(), Duration::hours(1));

    assert!(apartment.normalize());
    assert!(apartment.invoices.is_empty());
    assert_eq!(apartment.pending_income, 0.0);
    assert!(!apartment.normalize());
}

#[test]
fn test_level_out_of_range_rejected() {
    let record = json!({"price": 100.0, "level": 9});
    assert!(serde_json::from_value::<Apartment>(record).is_err());

    let record = json!({"price": 100.0, "level": 3});
    let apartment: Apartment = serde_json::from_value(record).unwrap();
    assert_eq!(apartment.level, 3);
    assert!(apartment.owner.is_none());
}

#[test]
fn test_new_clamps_level() {
    assert_eq!(Apartment::new("a", "r", "w", 1.0, 0).level, 1);
    assert_eq!(Apartment::new("a", "r", "w", 1.0, 42).level, MAX_LEVEL);
}
