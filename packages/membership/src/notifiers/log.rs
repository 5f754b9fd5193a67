//! Notifier that writes each outcome as a structured log event.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::error::DirectoryError;
use crate::traits::notifier::Notifier;
use crate::types::{AccountRecord, LedgerEntry, OutcomeKind};

/// Logs outcomes through `tracing`. Successes at info, partial matches at
/// warn, failures at error.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for TracingNotifier {
    async fn join_succeeded(&self, entry: &LedgerEntry, record: &AccountRecord) {
        info!(
            outcome = %OutcomeKind::JoinSucceeded,
            entry = %entry.label(),
            account = %record.primary_identifier(),
            expires_on = %record.membership.expires_on,
            "member joined"
        );
    }

    async fn join_failed(&self, entry: &LedgerEntry, record: &AccountRecord, err: &DirectoryError) {
        error!(
            outcome = %OutcomeKind::JoinFailed,
            entry = %entry.label(),
            account = %record.primary_identifier(),
            kind = %err.kind(),
            error = %err,
            "join failed"
        );
    }

    async fn renewed(&self, entry: &LedgerEntry, record: &AccountRecord) {
        info!(
            outcome = %OutcomeKind::Renewed,
            entry = %entry.label(),
            account = %record.primary_identifier(),
            expires_on = %record.membership.expires_on,
            "membership renewed"
        );
    }

    async fn renew_failed(&self, entry: &LedgerEntry, record: &AccountRecord, err: &DirectoryError) {
        error!(
            outcome = %OutcomeKind::RenewFailed,
            entry = %entry.label(),
            account = %record.primary_identifier(),
            kind = %err.kind(),
            error = %err,
            "renewal failed"
        );
    }

    async fn partial(&self, entry: &LedgerEntry, record: &AccountRecord) {
        warn!(
            outcome = %OutcomeKind::Partial,
            entry = %entry.label(),
            account = %record.primary_identifier(),
            "ambiguous match, needs manual review"
        );
    }
}
