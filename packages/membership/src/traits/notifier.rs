//! Notifier capability: receives the outcome of every processed entry.

use async_trait::async_trait;

use crate::error::DirectoryError;
use crate::types::{AccountRecord, LedgerEntry, OutcomeEvent};

/// Outcome sink. Drives audit logs and member emails downstream.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn join_succeeded(&self, entry: &LedgerEntry, record: &AccountRecord);

    async fn join_failed(&self, entry: &LedgerEntry, record: &AccountRecord, error: &DirectoryError);

    async fn renewed(&self, entry: &LedgerEntry, record: &AccountRecord);

    /// `record` is the account as it was before the failed update.
    async fn renew_failed(&self, entry: &LedgerEntry, record: &AccountRecord, error: &DirectoryError);

    /// The entry matched `record` ambiguously; nothing was changed.
    async fn partial(&self, entry: &LedgerEntry, record: &AccountRecord);

    /// Route an [`OutcomeEvent`] to the matching operation.
    async fn notify(&self, event: &OutcomeEvent) {
        match event {
            OutcomeEvent::JoinSucceeded { entry, record } => self.join_succeeded(entry, record).await,
            OutcomeEvent::JoinFailed { entry, record, error } => {
                self.join_failed(entry, record, error).await
            }
            OutcomeEvent::Renewed { entry, record } => self.renewed(entry, record).await,
            OutcomeEvent::RenewFailed { entry, record, error } => {
                self.renew_failed(entry, record, error).await
            }
            OutcomeEvent::Partial { entry, record } => self.partial(entry, record).await,
        }
    }
}
