//! Contract Test: Update Idempotency
//!
//! Reconciling the same desired record twice writes at most once.
//!
//! Constraints verified:
//! - A second update with the same desired record is a no-op
//! - Each update reads the zone exactly once
//! - Address spellings that parse to the same value do not cause a write
//!
//! If this test fails, repeated runs would hammer the backend API.

mod common;

use common::*;
use doh_ddns_core::{update, RecordType, UpdateOutcome, ZoneRecord};
use tokio_test::assert_ok;

#[tokio::test]
async fn second_update_is_a_noop() {
    let backend = MockZoneBackend::new(vec![a("mail", "192.0.2.10")]);
    let desired = a("www", "192.0.2.1");

    let first = assert_ok!(update("example.com", &desired, &backend).await);
    let second = assert_ok!(update("example.com", &desired, &backend).await);

    assert_eq!(first, UpdateOutcome::Created);
    assert_eq!(second, UpdateOutcome::UpToDate);
    assert_eq!(
        backend.set_call_count(),
        1,
        "Expected 1 write for 2 identical updates, got {}",
        backend.set_call_count()
    );
    assert_eq!(backend.get_call_count(), 2);
}

#[tokio::test]
async fn replace_then_repeat_writes_once() {
    let backend = MockZoneBackend::new(vec![a("www.example.com", "1.2.3.4")]);
    let desired = a("www", "5.6.7.8");

    for _ in 0..3 {
        assert_ok!(update("example.com", &desired, &backend).await);
    }

    assert_eq!(backend.set_call_count(), 1);
    let www: Vec<_> = backend
        .records()
        .into_iter()
        .filter(|r| r.fqdn("example.com") == "www.example.com")
        .collect();
    assert_eq!(www, vec![desired]);
}

#[tokio::test]
async fn equivalent_ipv6_spelling_is_up_to_date() {
    let backend = MockZoneBackend::new(vec![ZoneRecord::new(
        "",
        RecordType::Aaaa,
        "2001:db8:0:0::1",
    )]);
    let desired = ZoneRecord::new("@", RecordType::Aaaa, "2001:DB8::1");

    let outcome = assert_ok!(update("example.com", &desired, &backend).await);

    assert_eq!(outcome, UpdateOutcome::UpToDate);
    assert_eq!(backend.set_call_count(), 0);
}
