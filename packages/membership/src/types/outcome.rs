//! Outcome events and batch reports.

use std::fmt;

use serde::Serialize;

use crate::error::DirectoryError;
use crate::types::account::AccountRecord;
use crate::types::ledger::LedgerEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    JoinSucceeded,
    JoinFailed,
    Renewed,
    RenewFailed,
    Partial,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::JoinSucceeded => write!(f, "join_succeeded"),
            OutcomeKind::JoinFailed => write!(f, "join_failed"),
            OutcomeKind::Renewed => write!(f, "renewed"),
            OutcomeKind::RenewFailed => write!(f, "renew_failed"),
            OutcomeKind::Partial => write!(f, "partial"),
        }
    }
}

/// Terminal result of processing one ledger entry against one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeEvent {
    JoinSucceeded {
        entry: LedgerEntry,
        record: AccountRecord,
    },
    JoinFailed {
        entry: LedgerEntry,
        record: AccountRecord,
        error: DirectoryError,
    },
    Renewed {
        entry: LedgerEntry,
        record: AccountRecord,
    },
    /// `record` is the account as it was before the failed update.
    RenewFailed {
        entry: LedgerEntry,
        record: AccountRecord,
        error: DirectoryError,
    },
    Partial {
        entry: LedgerEntry,
        record: AccountRecord,
    },
}

impl OutcomeEvent {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            OutcomeEvent::JoinSucceeded { .. } => OutcomeKind::JoinSucceeded,
            OutcomeEvent::JoinFailed { .. } => OutcomeKind::JoinFailed,
            OutcomeEvent::Renewed { .. } => OutcomeKind::Renewed,
            OutcomeEvent::RenewFailed { .. } => OutcomeKind::RenewFailed,
            OutcomeEvent::Partial { .. } => OutcomeKind::Partial,
        }
    }

    pub fn entry(&self) -> &LedgerEntry {
        match self {
            OutcomeEvent::JoinSucceeded { entry, .. }
            | OutcomeEvent::JoinFailed { entry, .. }
            | OutcomeEvent::Renewed { entry, .. }
            | OutcomeEvent::RenewFailed { entry, .. }
            | OutcomeEvent::Partial { entry, .. } => entry,
        }
    }

    pub fn record(&self) -> &AccountRecord {
        match self {
            OutcomeEvent::JoinSucceeded { record, .. }
            | OutcomeEvent::JoinFailed { record, .. }
            | OutcomeEvent::Renewed { record, .. }
            | OutcomeEvent::RenewFailed { record, .. }
            | OutcomeEvent::Partial { record, .. } => record,
        }
    }

    pub fn error(&self) -> Option<&DirectoryError> {
        match self {
            OutcomeEvent::JoinFailed { error, .. } | OutcomeEvent::RenewFailed { error, .. } => {
                Some(error)
            }
            _ => None,
        }
    }
}

/// What a batch run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Entries that were paid and unprocessed.
    pub eligible: usize,
    /// Entries skipped as unpaid or already processed.
    pub skipped: usize,
    pub joined: usize,
    pub join_failed: usize,
    pub renewed: usize,
    pub renew_failed: usize,
    /// Partial events fired (one per affected account, not per entry).
    pub partial: usize,
}

impl BatchReport {
    pub fn record(&mut self, kind: OutcomeKind) {
        match kind {
            OutcomeKind::JoinSucceeded => self.joined += 1,
            OutcomeKind::JoinFailed => self.join_failed += 1,
            OutcomeKind::Renewed => self.renewed += 1,
            OutcomeKind::RenewFailed => self.renew_failed += 1,
            OutcomeKind::Partial => self.partial += 1,
        }
    }

    /// Successful directory mutations.
    pub fn mutations(&self) -> usize {
        self.joined + self.renewed
    }

    pub fn failures(&self) -> usize {
        self.join_failed + self.renew_failed
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} eligible, {} skipped: {} joined, {} renewed, {} partial, {} failed",
            self.eligible,
            self.skipped,
            self.joined,
            self.renewed,
            self.partial,
            self.failures()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_tally() {
        let mut report = BatchReport::default();
        report.record(OutcomeKind::JoinSucceeded);
        report.record(OutcomeKind::Renewed);
        report.record(OutcomeKind::RenewFailed);
        report.record(OutcomeKind::Partial);

        assert_eq!(report.mutations(), 2);
        assert_eq!(report.failures(), 1);
        assert_eq!(
            report.to_string(),
            "0 eligible, 0 skipped: 1 joined, 1 renewed, 1 partial, 1 failed"
        );
    }
}
