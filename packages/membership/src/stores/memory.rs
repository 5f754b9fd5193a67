//! In-memory directory for testing and local batch runs.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tokio::sync::RwLock;

use crate::error::{DirectoryError, DirectoryResult};
use crate::traits::directory::Directory;
use crate::types::AccountRecord;

/// Directory operations, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryOp {
    ListAll,
    Create,
    Update,
    Remove,
    AddToGroup,
}

/// Record of a call made to the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    ListAll { scope: String },
    Create { identifier: String },
    Update { identifier: String },
    Remove { identifier: String },
    AddToGroup { group: String, identifier: String },
}

impl DirectoryCall {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, DirectoryCall::ListAll { .. })
    }
}

struct StoredAccount {
    record: AccountRecord,
    /// `list_all` calls left before this account shows up.
    hidden_for: u32,
}

struct RemovedAccount {
    record: AccountRecord,
    /// `list_all` calls left before this account disappears.
    lingers_for: u32,
}

#[derive(Default)]
struct State {
    accounts: BTreeMap<String, StoredAccount>,
    removed: Vec<RemovedAccount>,
    groups: HashMap<String, BTreeSet<String>>,
    failures: HashMap<DirectoryOp, VecDeque<DirectoryError>>,
    calls: Vec<DirectoryCall>,
}

impl State {
    fn take_failure(&mut self, op: DirectoryOp) -> Option<DirectoryError> {
        self.failures.get_mut(&op).and_then(VecDeque::pop_front)
    }
}

/// Owned, single-writer account store implementing [`Directory`].
///
/// Identifiers are keyed case-insensitively. A visibility lag can be set to
/// mimic a backend whose listings trail its writes.
pub struct MemoryDirectory {
    scope: String,
    visibility_lag: u32,
    state: RwLock<State>,
}

fn key(identifier: &str) -> String {
    identifier.to_lowercase()
}

fn in_scope(record: &AccountRecord, scope: &str) -> bool {
    let path = record.org_unit_path.as_str();
    scope == "/"
        || path == scope
        || path
            .strip_prefix(scope)
            .is_some_and(|rest| rest.starts_with('/'))
}

impl MemoryDirectory {
    /// Create an empty directory serving `scope`.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            visibility_lag: 0,
            state: RwLock::new(State::default()),
        }
    }

    /// Seed accounts. They are visible immediately.
    pub fn with_records(mut self, records: impl IntoIterator<Item = AccountRecord>) -> Self {
        let state = self.state.get_mut();
        for record in records {
            state.accounts.insert(
                key(record.primary_identifier()),
                StoredAccount {
                    record,
                    hidden_for: 0,
                },
            );
        }
        self
    }

    /// Number of `list_all` calls a create or remove takes to become visible.
    pub fn with_visibility_lag(mut self, lists: u32) -> Self {
        self.visibility_lag = lists;
        self
    }

    /// Queue an error for the next call of `op`. Errors queue in order.
    pub fn with_failure(mut self, op: DirectoryOp, error: DirectoryError) -> Self {
        self.state
            .get_mut()
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
        self
    }

    /// Queue an error on a directory that is already shared.
    pub async fn fail_next(&self, op: DirectoryOp, error: DirectoryError) {
        self.state
            .write()
            .await
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// All stored accounts, ignoring visibility lag.
    pub async fn snapshot(&self) -> Vec<AccountRecord> {
        self.state
            .read()
            .await
            .accounts
            .values()
            .map(|a| a.record.clone())
            .collect()
    }

    pub async fn get(&self, identifier: &str) -> Option<AccountRecord> {
        self.state
            .read()
            .await
            .accounts
            .get(&key(identifier))
            .map(|a| a.record.clone())
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.accounts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Identifiers registered into `group`.
    pub async fn members_of(&self, group: &str) -> Vec<String> {
        self.state
            .read()
            .await
            .groups
            .get(group)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every call made so far, in order.
    pub async fn calls(&self) -> Vec<DirectoryCall> {
        self.state.read().await.calls.clone()
    }

    /// Number of calls that attempted to change state.
    pub async fn mutation_count(&self) -> usize {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .count()
    }

    pub async fn clear_calls(&self) {
        self.state.write().await.calls.clear();
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn list_all(&self, scope: &str) -> DirectoryResult<Vec<AccountRecord>> {
        let mut state = self.state.write().await;
        state.calls.push(DirectoryCall::ListAll {
            scope: scope.to_string(),
        });

        if let Some(error) = state.take_failure(DirectoryOp::ListAll) {
            return Err(error);
        }
        if scope != self.scope {
            return Err(DirectoryError::scope_invalid(scope));
        }

        let mut listed = Vec::new();
        for account in state.accounts.values_mut() {
            if account.hidden_for > 0 {
                account.hidden_for -= 1;
            } else if in_scope(&account.record, scope) {
                listed.push(account.record.clone());
            }
        }
        for removed in state.removed.iter_mut() {
            if in_scope(&removed.record, scope) {
                listed.push(removed.record.clone());
            }
            removed.lingers_for -= 1;
        }
        state.removed.retain(|r| r.lingers_for > 0);

        Ok(listed)
    }

    async fn create(&self, record: &AccountRecord) -> DirectoryResult<AccountRecord> {
        let identifier = record.primary_identifier().to_string();
        let mut state = self.state.write().await;
        state.calls.push(DirectoryCall::Create {
            identifier: identifier.clone(),
        });

        if let Some(error) = state.take_failure(DirectoryOp::Create) {
            return Err(error);
        }
        if state.accounts.contains_key(&key(&identifier)) {
            return Err(DirectoryError::already_exists(identifier));
        }

        state.accounts.insert(
            key(&identifier),
            StoredAccount {
                record: record.clone(),
                hidden_for: self.visibility_lag,
            },
        );
        Ok(record.clone())
    }

    async fn update(&self, record: &AccountRecord) -> DirectoryResult<AccountRecord> {
        let identifier = record.primary_identifier().to_string();
        let mut state = self.state.write().await;
        state.calls.push(DirectoryCall::Update {
            identifier: identifier.clone(),
        });

        if let Some(error) = state.take_failure(DirectoryOp::Update) {
            return Err(error);
        }

        match state.accounts.get_mut(&key(&identifier)) {
            Some(account) => {
                account.record = record.clone();
                Ok(record.clone())
            }
            None => Err(DirectoryError::not_found(identifier)),
        }
    }

    async fn remove(&self, record: &AccountRecord) -> DirectoryResult<()> {
        let identifier = record.primary_identifier().to_string();
        let mut state = self.state.write().await;
        state.calls.push(DirectoryCall::Remove {
            identifier: identifier.clone(),
        });

        if let Some(error) = state.take_failure(DirectoryOp::Remove) {
            return Err(error);
        }

        if let Some(account) = state.accounts.remove(&key(&identifier)) {
            for members in state.groups.values_mut() {
                members.remove(&key(&identifier));
            }
            if self.visibility_lag > 0 && account.hidden_for == 0 {
                state.removed.push(RemovedAccount {
                    record: account.record,
                    lingers_for: self.visibility_lag,
                });
            }
        }
        Ok(())
    }

    async fn add_to_group(&self, group: &str, record: &AccountRecord) -> DirectoryResult<()> {
        let identifier = record.primary_identifier().to_string();
        let mut state = self.state.write().await;
        state.calls.push(DirectoryCall::AddToGroup {
            group: group.to_string(),
            identifier: identifier.clone(),
        });

        if let Some(error) = state.take_failure(DirectoryOp::AddToGroup) {
            return Err(error);
        }
        if !state.accounts.contains_key(&key(&identifier)) {
            return Err(DirectoryError::not_found(identifier));
        }

        let inserted = state
            .groups
            .entry(group.to_string())
            .or_default()
            .insert(key(&identifier));
        if inserted {
            Ok(())
        } else {
            Err(DirectoryError::already_exists(identifier))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconcileConfig;
    use crate::error::DirectoryErrorKind;
    use crate::types::LedgerEntry;
    use chrono::NaiveDate;

    fn record(given: &str, family: &str) -> AccountRecord {
        let entry = LedgerEntry::new(given, family, "home@x.net", "", "paid");
        AccountRecord::from_entry(
            &entry,
            &ReconcileConfig::new("/Members", "example.org"),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_create_update_remove() {
        let directory = MemoryDirectory::new("/Members");
        let mut jane = record("Jane", "Doe");

        directory.create(&jane).await.unwrap();
        assert_eq!(directory.len().await, 1);

        jane.increment_expiration_date();
        directory.update(&jane).await.unwrap();
        let stored = directory.get("JANE.DOE@example.org").await.unwrap();
        assert_eq!(stored.membership.expires_on, jane.membership.expires_on);

        directory.remove(&jane).await.unwrap();
        assert!(directory.is_empty().await);

        // Removing again is not an error
        directory.remove(&jane).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_collision_is_already_exists() {
        let directory = MemoryDirectory::new("/Members").with_records([record("Jane", "Doe")]);

        let mut other = record("JANE", "doe");
        let err = directory.create(&other).await.unwrap_err();
        assert_eq!(err.kind(), DirectoryErrorKind::AlreadyExists);

        other.increment_generation();
        directory.create(&other).await.unwrap();
        assert_eq!(directory.len().await, 2);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let directory = MemoryDirectory::new("/Members");
        let err = directory.update(&record("Jane", "Doe")).await.unwrap_err();
        assert_eq!(err, DirectoryError::not_found("jane.doe@example.org"));
    }

    #[tokio::test]
    async fn test_list_all_rejects_unknown_scope() {
        let directory = MemoryDirectory::new("/Members");
        let err = directory.list_all("/Nope").await.unwrap_err();
        assert_eq!(err, DirectoryError::scope_invalid("/Nope"));
    }

    #[tokio::test]
    async fn test_list_all_filters_by_scope() {
        let mut outside = record("Out", "Side");
        outside.org_unit_path = "/Staff".to_string();
        let mut nested = record("Nested", "Member");
        nested.org_unit_path = "/Members/Board".to_string();
        let mut sibling = record("Sib", "Ling");
        sibling.org_unit_path = "/MembersArchive".to_string();

        let directory = MemoryDirectory::new("/Members")
            .with_records([record("Jane", "Doe"), outside, nested, sibling]);

        let listed = directory.list_all("/Members").await.unwrap();
        let ids: Vec<_> = listed.iter().map(|r| r.primary_identifier()).collect();
        assert_eq!(ids, vec!["jane.doe@example.org", "nested.member@example.org"]);
    }

    #[tokio::test]
    async fn test_visibility_lag() {
        let directory = MemoryDirectory::new("/Members").with_visibility_lag(2);
        let jane = record("Jane", "Doe");
        directory.create(&jane).await.unwrap();

        assert!(!directory.is_listed("/Members", "jane.doe@example.org").await.unwrap());
        assert!(!directory.is_listed("/Members", "jane.doe@example.org").await.unwrap());
        assert!(directory.is_listed("/Members", "jane.doe@example.org").await.unwrap());

        directory.remove(&jane).await.unwrap();
        assert!(directory.is_listed("/Members", "jane.doe@example.org").await.unwrap());
        assert!(directory.is_listed("/Members", "jane.doe@example.org").await.unwrap());
        assert!(!directory.is_listed("/Members", "jane.doe@example.org").await.unwrap());
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed_in_order() {
        let jane = record("Jane", "Doe");
        let directory = MemoryDirectory::new("/Members")
            .with_records([jane.clone()])
            .with_failure(DirectoryOp::Update, DirectoryError::creation_pending("jane.doe@example.org"))
            .with_failure(DirectoryOp::Update, DirectoryError::service("boom"));

        assert!(directory.update(&jane).await.unwrap_err().is_transient());
        assert_eq!(directory.update(&jane).await.unwrap_err(), DirectoryError::service("boom"));
        directory.update(&jane).await.unwrap();
        assert_eq!(directory.mutation_count().await, 3);
    }

    #[tokio::test]
    async fn test_group_membership() {
        let jane = record("Jane", "Doe");
        let directory = MemoryDirectory::new("/Members").with_records([jane.clone()]);

        directory.add_to_group("members@example.org", &jane).await.unwrap();
        let err = directory
            .add_to_group("members@example.org", &jane)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), DirectoryErrorKind::AlreadyExists);
        assert_eq!(
            directory.members_of("members@example.org").await,
            vec!["jane.doe@example.org".to_string()]
        );

        let ghost = record("Ghost", "Writer");
        let err = directory.add_to_group("members@example.org", &ghost).await.unwrap_err();
        assert_eq!(err.kind(), DirectoryErrorKind::NotFound);
    }
}
