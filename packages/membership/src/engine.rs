//! Reconciler - applies a batch of ledger entries to the member directory.
//!
//! Each eligible entry (paid, not yet processed) is matched against the
//! current accounts and lands in one of three paths:
//!
//! - no match: **join** - create an account, bumping the generation until the
//!   identifier is free, then register it into the configured groups (a
//!   failed registration removes the account again)
//! - one full match: **renew** - extend the account by a year
//! - anything else: **partial** - report every matched account, change nothing
//!
//! Every entry is classified against the accounts listed at the start of
//! the batch. Entries are processed in order and independently. Only a
//! failure to list the directory aborts the batch.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};

use crate::config::ReconcileConfig;
use crate::error::{DirectoryError, DirectoryErrorKind, DirectoryResult, ReconcileError, Result};
use crate::matching::{classify, Classification};
use crate::retry::{retry_on_specific_error, wait_until_or_timeout, RetryPolicy};
use crate::traits::directory::Directory;
use crate::traits::notifier::Notifier;
use crate::types::{AccountRecord, BatchReport, LedgerEntry, OutcomeKind};

/// Reconciliation engine, constructed with its directory and notifier.
pub struct Reconciler {
    config: ReconcileConfig,
    directory: Arc<dyn Directory>,
    notifier: Arc<dyn Notifier>,
}

impl Reconciler {
    pub fn new(
        config: ReconcileConfig,
        directory: Arc<dyn Directory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            directory,
            notifier,
        }
    }

    /// Process every eligible entry in `entries`, stamping the ones applied.
    ///
    /// The caller persists the stamps once this returns.
    #[instrument(skip_all, fields(scope = %self.config.scope, entries = entries.len()))]
    pub async fn run_batch(&self, entries: &mut [LedgerEntry]) -> Result<BatchReport> {
        let eligible: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_eligible())
            .map(|(index, _)| index)
            .collect();

        let mut report = BatchReport {
            eligible: eligible.len(),
            skipped: entries.len() - eligible.len(),
            ..BatchReport::default()
        };

        if eligible.is_empty() {
            info!("no eligible entries");
            return Ok(report);
        }

        let accounts = self.load_accounts().await?;
        info!(accounts = accounts.len(), eligible = eligible.len(), "starting batch");

        let today = Utc::now().date_naive();
        for index in eligible {
            let entry = &mut entries[index];
            let span = info_span!("entry", entry = %entry.label());
            let kinds = self
                .process_entry(entry, &accounts, today)
                .instrument(span)
                .await;
            for kind in kinds {
                report.record(kind);
            }
        }

        info!(%report, "batch complete");
        Ok(report)
    }

    /// Current accounts in scope. The only failure that aborts a batch.
    async fn load_accounts(&self) -> Result<Vec<AccountRecord>> {
        self.directory
            .list_all(&self.config.scope)
            .await
            .map_err(|e| ReconcileError::Listing(e.with_scope(self.config.scope.as_str())))
    }

    /// Handle one entry. Returns the outcome kinds it produced.
    async fn process_entry(
        &self,
        entry: &mut LedgerEntry,
        accounts: &[AccountRecord],
        today: NaiveDate,
    ) -> Vec<OutcomeKind> {
        match classify(entry, accounts, &self.config.country_prefix) {
            Classification::Join => vec![self.join(entry, today).await],
            Classification::Renew(record) => vec![self.renew(entry, record).await],
            Classification::Partial(records) => {
                warn!(matches = records.len(), "ambiguous match, leaving entry unprocessed");
                let mut kinds = Vec::with_capacity(records.len());
                for record in records {
                    self.notifier.partial(entry, record).await;
                    kinds.push(OutcomeKind::Partial);
                }
                kinds
            }
        }
    }

    async fn join(&self, entry: &mut LedgerEntry, today: NaiveDate) -> OutcomeKind {
        let mut record = AccountRecord::from_entry(entry, &self.config, today);

        let created = match self.create_with_free_identifier(&mut record).await {
            Ok(created) => created,
            Err(e) => {
                warn!(account = %record.primary_identifier(), error = %e, "create failed");
                self.notifier.join_failed(entry, &record, &e).await;
                return OutcomeKind::JoinFailed;
            }
        };

        if let Err(e) = self.register_groups(&created).await {
            warn!(account = %created.primary_identifier(), error = %e, "group registration failed");
            self.roll_back(&created).await;
            self.notifier.join_failed(entry, &created, &e).await;
            return OutcomeKind::JoinFailed;
        }

        self.await_listing(&created, true).await;

        entry.mark_processed(Utc::now());
        info!(account = %created.primary_identifier(), generation = created.generation, "joined");
        self.notifier.join_succeeded(entry, &created).await;
        OutcomeKind::JoinSucceeded
    }

    /// Create `record`, moving to the next generation on every collision.
    async fn create_with_free_identifier(
        &self,
        record: &mut AccountRecord,
    ) -> DirectoryResult<AccountRecord> {
        loop {
            match self.directory.create(record).await {
                Ok(created) => return Ok(created),
                Err(e) if e.kind() == DirectoryErrorKind::AlreadyExists => {
                    if record.generation >= self.config.retry.max_generation {
                        return Err(DirectoryError::RetriesExhausted {
                            kind: DirectoryErrorKind::AlreadyExists,
                            attempts: record.generation + 1,
                            last: Box::new(e),
                        });
                    }
                    debug!(taken = %record.primary_identifier(), "identifier taken");
                    record.increment_generation();
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Add a new account to every configured group. Existing membership is fine.
    async fn register_groups(&self, record: &AccountRecord) -> DirectoryResult<()> {
        let directory = &self.directory;
        for group in &self.config.groups {
            let group = group.as_str();
            let result = retry_on_specific_error(
                self.pending_policy(),
                DirectoryErrorKind::CreationPending,
                move || directory.add_to_group(group, record),
            )
            .await;

            match result {
                Ok(()) => debug!(group, "added to group"),
                Err(e) if e.kind() == DirectoryErrorKind::AlreadyExists => {
                    debug!(group, "already a member")
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Remove an account whose join could not be completed, so the entry
    /// joins from scratch on the next run.
    async fn roll_back(&self, created: &AccountRecord) {
        let directory = &self.directory;
        let result = retry_on_specific_error(
            self.pending_policy(),
            DirectoryErrorKind::CreationPending,
            move || directory.remove(created),
        )
        .await;

        match result {
            Ok(()) => {
                info!(account = %created.primary_identifier(), "rolled back");
                self.await_listing(created, false).await;
            }
            Err(e) => error!(
                account = %created.primary_identifier(),
                error = %e,
                "rollback failed, account left in place"
            ),
        }
    }

    /// Poll until an account shows up in (or drops out of) listings. Only ever logs.
    async fn await_listing(&self, record: &AccountRecord, present: bool) {
        let attempts = self.config.retry.visibility_attempts;
        if attempts == 0 {
            return;
        }

        let directory = &self.directory;
        let scope = self.config.scope.as_str();
        let identifier = record.primary_identifier();
        let settled = wait_until_or_timeout(
            attempts,
            self.config.retry.visibility_interval,
            move || async move {
                directory
                    .is_listed(scope, identifier)
                    .await
                    .map(|listed| listed == present)
                    .unwrap_or(false)
            },
        )
        .await;

        if !settled {
            warn!(account = %identifier, present, attempts, "listing not settled yet, continuing");
        }
    }

    async fn renew(&self, entry: &mut LedgerEntry, original: &AccountRecord) -> OutcomeKind {
        let mut updated = AccountRecord::from_existing(original);
        updated.increment_expiration_date();
        updated.include_in_directory = entry.include_in_directory;
        if let Some(address) = entry.override_address() {
            updated.set_home_address(address);
        }

        let directory = &self.directory;
        let candidate = &updated;
        let result = retry_on_specific_error(
            self.pending_policy(),
            DirectoryErrorKind::CreationPending,
            move || directory.update(candidate),
        )
        .await;

        match result {
            Ok(saved) => {
                entry.mark_processed(Utc::now());
                info!(
                    account = %saved.primary_identifier(),
                    expires_on = %saved.membership.expires_on,
                    "renewed"
                );
                self.notifier.renewed(entry, &saved).await;
                OutcomeKind::Renewed
            }
            Err(e) => {
                let e = e.with_identifier(original.primary_identifier());
                warn!(account = %original.primary_identifier(), error = %e, "update failed");
                self.notifier.renew_failed(entry, original, &e).await;
                OutcomeKind::RenewFailed
            }
        }
    }

    fn pending_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.config.retry.creation_pending_max_attempts,
            self.config.retry.creation_pending_backoff,
        )
    }
}
