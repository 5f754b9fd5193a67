//! Shared fixtures for reconciliation tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use membership::{
    AccountRecord, DirectoryCall, LedgerEntry, MemoryDirectory, ReconcileConfig, Reconciler,
    RecordingNotifier, RetryConfig,
};

pub const SCOPE: &str = "/Members";
pub const DOMAIN: &str = "example.org";

pub fn config() -> ReconcileConfig {
    ReconcileConfig::new(SCOPE, DOMAIN).with_retry(RetryConfig::immediate())
}

pub fn paid(given: &str, family: &str, address: &str, phone: &str) -> LedgerEntry {
    LedgerEntry::new(given, family, address, phone, "paid")
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// An account as it would have been created for this person.
pub fn account(given: &str, family: &str, address: &str, phone: &str) -> AccountRecord {
    AccountRecord::from_entry(&paid(given, family, address, phone), &config(), today())
}

pub struct Harness {
    pub reconciler: Reconciler,
    pub directory: Arc<MemoryDirectory>,
    pub notifier: RecordingNotifier,
}

impl Harness {
    pub fn new(directory: MemoryDirectory) -> Self {
        Self::with_config(directory, config())
    }

    pub fn with_config(directory: MemoryDirectory, config: ReconcileConfig) -> Self {
        let directory = Arc::new(directory);
        let notifier = RecordingNotifier::new();
        let reconciler = Reconciler::new(config, directory.clone(), Arc::new(notifier.clone()));
        Self {
            reconciler,
            directory,
            notifier,
        }
    }

    pub fn empty() -> Self {
        Self::new(MemoryDirectory::new(SCOPE))
    }

    pub fn seeded(records: impl IntoIterator<Item = AccountRecord>) -> Self {
        Self::new(MemoryDirectory::new(SCOPE).with_records(records))
    }

    pub async fn creates(&self) -> Vec<String> {
        self.directory
            .calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                DirectoryCall::Create { identifier } => Some(identifier),
                _ => None,
            })
            .collect()
    }

    pub async fn updates(&self) -> Vec<String> {
        self.directory
            .calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                DirectoryCall::Update { identifier } => Some(identifier),
                _ => None,
            })
            .collect()
    }
}
