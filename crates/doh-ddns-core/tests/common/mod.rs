//! Test doubles and common utilities for contract tests
//!
//! Minimal capability implementations that record how they are called,
//! so tests can assert on the number and content of backend writes.

#![allow(dead_code)]

use doh_ddns_core::error::{Error, Result};
use doh_ddns_core::traits::{DohTransport, ZoneBackend, ZoneRecord};
use doh_ddns_core::wire::{Message, Name, RecordData, RecordType, ResourceRecord};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

/// An in-memory zone backend that tracks calls
///
/// `set_records` applies the usual set semantics (same name and type are
/// replaced) so a second reconciliation observes the first one's write.
pub struct MockZoneBackend {
    records: Arc<Mutex<Vec<ZoneRecord>>>,
    get_call_count: Arc<AtomicUsize>,
    set_call_count: Arc<AtomicUsize>,
    /// Update sets received by set_records(), in call order
    set_calls: Arc<Mutex<Vec<Vec<ZoneRecord>>>>,
    fail_set: bool,
}

impl MockZoneBackend {
    pub fn new(records: Vec<ZoneRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            get_call_count: Arc::new(AtomicUsize::new(0)),
            set_call_count: Arc::new(AtomicUsize::new(0)),
            set_calls: Arc::new(Mutex::new(Vec::new())),
            fail_set: false,
        }
    }

    /// A backend whose set_records() always fails with a rate limit
    pub fn failing_writes(records: Vec<ZoneRecord>) -> Self {
        Self {
            fail_set: true,
            ..Self::new(records)
        }
    }

    /// Get the number of times get_records() was called
    pub fn get_call_count(&self) -> usize {
        self.get_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times set_records() was called
    pub fn set_call_count(&self) -> usize {
        self.set_call_count.load(Ordering::SeqCst)
    }

    /// Update sets passed to set_records()
    pub fn set_calls(&self) -> Vec<Vec<ZoneRecord>> {
        self.set_calls.lock().unwrap().clone()
    }

    /// Current zone contents
    pub fn records(&self) -> Vec<ZoneRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ZoneBackend for MockZoneBackend {
    async fn get_records(&self, _zone: &str) -> Result<Vec<ZoneRecord>> {
        self.get_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.records())
    }

    async fn set_records(&self, zone: &str, records: &[ZoneRecord]) -> Result<Vec<ZoneRecord>> {
        self.set_call_count.fetch_add(1, Ordering::SeqCst);
        self.set_calls.lock().unwrap().push(records.to_vec());

        if self.fail_set {
            return Err(Error::rate_limited("too many requests"));
        }

        let mut current = self.records.lock().unwrap();
        for record in records {
            let fqdn = record.fqdn(zone);
            current.retain(|r| {
                !(r.record_type == record.record_type && r.fqdn(zone).eq_ignore_ascii_case(&fqdn))
            });
            current.push(record.clone());
        }
        Ok(records.to_vec())
    }

    async fn delete_records(&self, zone: &str, records: &[ZoneRecord]) -> Result<Vec<ZoneRecord>> {
        let mut current = self.records.lock().unwrap();
        let mut deleted = Vec::new();
        for record in records {
            let fqdn = record.fqdn(zone);
            current.retain(|r| {
                let matches = r.record_type == record.record_type
                    && r.fqdn(zone).eq_ignore_ascii_case(&fqdn)
                    && (record.value.is_empty() || r.same_value(record));
                if matches {
                    deleted.push(r.clone());
                }
                !matches
            });
        }
        Ok(deleted)
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

/// A zone backend whose reads fail
pub struct UnreachableZoneBackend;

#[async_trait::async_trait]
impl ZoneBackend for UnreachableZoneBackend {
    async fn get_records(&self, _zone: &str) -> Result<Vec<ZoneRecord>> {
        Err(Error::http("connection reset by peer"))
    }

    async fn set_records(&self, _zone: &str, _records: &[ZoneRecord]) -> Result<Vec<ZoneRecord>> {
        panic!("set_records() must not be called after a failed read");
    }

    async fn delete_records(&self, _zone: &str, _records: &[ZoneRecord]) -> Result<Vec<ZoneRecord>> {
        Ok(Vec::new())
    }

    fn backend_name(&self) -> &'static str {
        "unreachable"
    }
}

/// A DoH transport answering every request with a fixed body
#[derive(Debug)]
pub struct CannedTransport {
    response: Vec<u8>,
    call_count: Arc<AtomicUsize>,
    /// `dns` parameters received, in call order
    messages: Arc<Mutex<Vec<String>>>,
}

impl CannedTransport {
    pub fn new(response: Vec<u8>) -> Self {
        Self {
            response,
            call_count: Arc::new(AtomicUsize::new(0)),
            messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get the number of times get() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Create a transport that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            response: other.response.clone(),
            call_count: Arc::clone(&other.call_count),
            messages: Arc::clone(&other.messages),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DohTransport for CannedTransport {
    async fn get(&self, _endpoint: &Url, message: &str) -> Result<Vec<u8>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.messages.lock().unwrap().push(message.to_string());
        Ok(self.response.clone())
    }
}

/// Helper to build a response to `name`/`question` carrying `answers`
pub fn response(name: &str, question: RecordType, answers: Vec<RecordData>) -> Vec<u8> {
    let name = Name::parse(name).unwrap();
    let mut message = Message::query(name.clone(), question);
    message.header.response = true;
    message.header.recursion_available = true;
    for data in answers {
        message
            .answers
            .push(ResourceRecord::new(name.clone(), 300, data));
    }
    message.encode().unwrap()
}

/// Helper to create an A record
pub fn a(name: &str, value: &str) -> ZoneRecord {
    ZoneRecord::new(name, RecordType::A, value)
}
