//! Testing utilities.
//!
//! Pair [`RecordingNotifier`] with [`MemoryDirectory`](crate::stores::MemoryDirectory)
//! to assert on what a batch did without touching a real directory.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::DirectoryError;
use crate::traits::notifier::Notifier;
use crate::types::{AccountRecord, LedgerEntry, OutcomeEvent, OutcomeKind};

/// Notifier that keeps every outcome for later assertions.
///
/// Clones share the same event list.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<OutcomeEvent>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<OutcomeEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, event: OutcomeEvent) {
        self.lock().push(event);
    }

    /// All events so far, in order.
    pub fn events(&self) -> Vec<OutcomeEvent> {
        self.lock().clone()
    }

    pub fn kinds(&self) -> Vec<OutcomeKind> {
        self.lock().iter().map(OutcomeEvent::kind).collect()
    }

    /// Events of one kind, in order.
    pub fn of_kind(&self, kind: OutcomeKind) -> Vec<OutcomeEvent> {
        self.lock()
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn join_succeeded(&self, entry: &LedgerEntry, record: &AccountRecord) {
        self.push(OutcomeEvent::JoinSucceeded {
            entry: entry.clone(),
            record: record.clone(),
        });
    }

    async fn join_failed(&self, entry: &LedgerEntry, record: &AccountRecord, error: &DirectoryError) {
        self.push(OutcomeEvent::JoinFailed {
            entry: entry.clone(),
            record: record.clone(),
            error: error.clone(),
        });
    }

    async fn renewed(&self, entry: &LedgerEntry, record: &AccountRecord) {
        self.push(OutcomeEvent::Renewed {
            entry: entry.clone(),
            record: record.clone(),
        });
    }

    async fn renew_failed(&self, entry: &LedgerEntry, record: &AccountRecord, error: &DirectoryError) {
        self.push(OutcomeEvent::RenewFailed {
            entry: entry.clone(),
            record: record.clone(),
            error: error.clone(),
        });
    }

    async fn partial(&self, entry: &LedgerEntry, record: &AccountRecord) {
        self.push(OutcomeEvent::Partial {
            entry: entry.clone(),
            record: record.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconcileConfig;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_notify_routes_to_matching_operation() {
        let notifier = RecordingNotifier::new();
        let entry = LedgerEntry::new("Jane", "Doe", "jane@home.net", "", "paid");
        let record = AccountRecord::from_entry(
            &entry,
            &ReconcileConfig::new("/Members", "example.org"),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );

        let event = OutcomeEvent::RenewFailed {
            entry: entry.clone(),
            record: record.clone(),
            error: DirectoryError::not_found(record.primary_identifier()),
        };
        notifier.notify(&event).await;
        notifier.partial(&entry, &record).await;

        assert_eq!(notifier.kinds(), vec![OutcomeKind::RenewFailed, OutcomeKind::Partial]);
        assert_eq!(notifier.events()[0], event);

        let shared = notifier.clone();
        shared.clear();
        assert_eq!(notifier.count(), 0);
    }
}
