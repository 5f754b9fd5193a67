//! Directory capability: lookup and mutation of member accounts.

use async_trait::async_trait;

use crate::error::DirectoryResult;
use crate::types::AccountRecord;

/// Wraps the external account-management service.
///
/// Creates and removes are not guaranteed to show up in `list_all` right
/// away. Callers that need confirmation poll with
/// [`wait_until_or_timeout`](crate::retry::wait_until_or_timeout).
#[async_trait]
pub trait Directory: Send + Sync {
    /// Every account placed under `scope`.
    ///
    /// Fails with `ScopeInvalid` when the scope does not exist.
    async fn list_all(&self, scope: &str) -> DirectoryResult<Vec<AccountRecord>>;

    /// Create an account.
    ///
    /// Fails with `AlreadyExists` when the primary identifier is taken, and
    /// with a `Conflict` naming the identifier on any other rejection.
    async fn create(&self, record: &AccountRecord) -> DirectoryResult<AccountRecord>;

    /// Replace an existing account.
    ///
    /// Fails with `NotFound` when the identifier is absent and with the
    /// transient `CreationPending` while a fresh account is still settling.
    async fn update(&self, record: &AccountRecord) -> DirectoryResult<AccountRecord>;

    /// Remove an account. Removing an absent account succeeds.
    async fn remove(&self, record: &AccountRecord) -> DirectoryResult<()>;

    /// Register an account into a group.
    ///
    /// Fails with `AlreadyExists` when it is already a member.
    async fn add_to_group(&self, group: &str, record: &AccountRecord) -> DirectoryResult<()>;

    /// Whether `list_all(scope)` currently shows an account with this identifier.
    async fn is_listed(&self, scope: &str, identifier: &str) -> DirectoryResult<bool> {
        Ok(self
            .list_all(scope)
            .await?
            .iter()
            .any(|r| r.primary_identifier().eq_ignore_ascii_case(identifier)))
    }
}
