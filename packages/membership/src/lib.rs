//! Membership reconciliation
//!
//! Turns paid ledger entries into directory accounts. Every eligible entry
//! either joins (new account), renews (existing account extended a year) or
//! is reported as a partial match for a human to resolve.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use membership::{MemoryDirectory, ReconcileConfig, Reconciler, TracingNotifier};
//!
//! let config = ReconcileConfig::from_env()?;
//! let directory = Arc::new(MemoryDirectory::new(config.scope.clone()));
//! let reconciler = Reconciler::new(config, directory, Arc::new(TracingNotifier::new()));
//!
//! let report = reconciler.run_batch(&mut entries).await?;
//! // persist the processed stamps on `entries`
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Directory and Notifier capabilities
//! - [`types`] - Accounts, ledger entries, outcomes
//! - [`matching`] - Entry-to-account match rules
//! - [`engine`] - The batch reconciler
//! - [`retry`] - Bounded retry and visibility polling
//! - [`stores`] - In-memory directory
//! - [`notifiers`] - Logging notifier
//! - [`testing`] - Recording notifier for tests

pub mod config;
pub mod engine;
pub mod error;
pub mod matching;
pub mod notifiers;
pub mod retry;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use config::{ReconcileConfig, RetryConfig};
pub use engine::Reconciler;
pub use error::{DirectoryError, DirectoryErrorKind, DirectoryResult, ReconcileError};
pub use matching::{classify, match_record, Classification, MatchOutcome};
pub use notifiers::TracingNotifier;
pub use retry::{retry_on_specific_error, wait_until_or_timeout, RetryPolicy};
pub use stores::{DirectoryCall, DirectoryOp, MemoryDirectory};
pub use testing::RecordingNotifier;
pub use traits::{directory::Directory, notifier::Notifier};
pub use types::{
    AccountRecord, BatchReport, ImportedMembership, LedgerEntry, OutcomeEvent, OutcomeKind,
};
