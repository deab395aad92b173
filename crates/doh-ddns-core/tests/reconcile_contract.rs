//! Contract Test: Record Reconciliation
//!
//! The reconciler reads the zone, decides, and writes at most once.
//!
//! Constraints verified:
//! - Desired names compose with the zone (apex and sub-names)
//! - Up-to-date records cause no write
//! - Changed records cause exactly one write carrying only the desired record
//! - Backend failures surface as Backend errors with their cause
//!
//! If this test fails, the reconciler either writes too much or too little.

mod common;

use common::*;
use doh_ddns_core::{update, Error, UpdateOutcome};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn up_to_date_record_is_not_written() {
    let backend = MockZoneBackend::new(vec![a("www.example.com", "1.2.3.4")]);

    let outcome = assert_ok!(update("example.com", &a("www", "1.2.3.4"), &backend).await);

    assert_eq!(outcome, UpdateOutcome::UpToDate);
    assert_eq!(backend.get_call_count(), 1);
    assert_eq!(backend.set_call_count(), 0);
}

#[tokio::test]
async fn changed_value_is_written_once_with_desired_record() {
    let backend = MockZoneBackend::new(vec![a("www.example.com", "1.2.3.4")]);
    let desired = a("www", "5.6.7.8");

    let outcome = assert_ok!(update("example.com", &desired, &backend).await);

    assert_eq!(
        outcome,
        UpdateOutcome::Replaced {
            previous: "1.2.3.4".to_string()
        }
    );
    assert_eq!(backend.set_call_count(), 1);
    assert_eq!(backend.set_calls(), vec![vec![a("www", "5.6.7.8")]]);
}

#[tokio::test]
async fn missing_record_is_created() {
    let backend = MockZoneBackend::new(Vec::new());

    let outcome = assert_ok!(update("example.com", &a("home", "198.51.100.7"), &backend).await);

    assert_eq!(outcome, UpdateOutcome::Created);
    assert_eq!(backend.set_calls(), vec![vec![a("home", "198.51.100.7")]]);
}

#[tokio::test]
async fn apex_record_reconciles_against_zone_name() {
    // "www" must not be mistaken for the apex
    let backend = MockZoneBackend::new(vec![
        a("www.example.com", "1.2.3.4"),
        a("example.com", "9.9.9.9"),
    ]);

    let outcome = assert_ok!(update("example.com", &a("", "9.9.9.9"), &backend).await);
    assert_eq!(outcome, UpdateOutcome::UpToDate);

    let outcome = assert_ok!(update("example.com", &a("", "1.2.3.4"), &backend).await);
    assert_eq!(
        outcome,
        UpdateOutcome::Replaced {
            previous: "9.9.9.9".to_string()
        }
    );
    assert_eq!(backend.set_call_count(), 1);
}

#[tokio::test]
async fn write_failure_is_a_backend_error() {
    let backend = MockZoneBackend::failing_writes(Vec::new());

    let err = assert_err!(update("example.com", &a("www", "1.2.3.4"), &backend).await);

    assert!(matches!(err, Error::Backend { operation: "set records", .. }));
    assert!(err.is_retryable(), "rate limit cause should stay visible");
    assert_eq!(backend.set_call_count(), 1);
}

#[tokio::test]
async fn read_failure_prevents_any_write() {
    let err = assert_err!(update("example.com", &a("www", "1.2.3.4"), &UnreachableZoneBackend).await);

    match err {
        Error::Backend {
            operation, zone, ..
        } => {
            assert_eq!(operation, "get records");
            assert_eq!(zone, "example.com");
        }
        other => panic!("expected backend error, got {other:?}"),
    }
}
