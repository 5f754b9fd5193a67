//! Ledger entries produced by the payment side.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Membership details carried over from an imported member list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedMembership {
    pub joined_on: NaiveDate,
    pub expires_on: NaiveDate,
    pub membership_type: String,
    /// Family label; defaults to the family name for Family memberships.
    #[serde(default)]
    pub family: Option<String>,
}

/// One payment/registration row.
///
/// The engine treats everything except `processed` as read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Upstream payment reference, used only for logging.
    #[serde(default)]
    pub reference: Option<String>,
    pub given_name: String,
    pub family_name: String,
    #[serde(default)]
    pub home_address: String,
    #[serde(default)]
    pub phone: String,
    pub status: String,
    #[serde(default)]
    pub include_in_directory: bool,
    /// New home address supplied at renewal time.
    #[serde(default)]
    pub address_override: Option<String>,
    #[serde(default)]
    pub imported: Option<ImportedMembership>,
    /// Stamped once the entry has been applied to the directory.
    #[serde(default)]
    pub processed: Option<DateTime<Utc>>,
}

impl LedgerEntry {
    pub fn new(
        given_name: impl Into<String>,
        family_name: impl Into<String>,
        home_address: impl Into<String>,
        phone: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            reference: None,
            given_name: given_name.into(),
            family_name: family_name.into(),
            home_address: home_address.into(),
            phone: phone.into(),
            status: status.into(),
            include_in_directory: false,
            address_override: None,
            imported: None,
            processed: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_address_override(mut self, address: impl Into<String>) -> Self {
        self.address_override = Some(address.into());
        self
    }

    pub fn with_directory_listing(mut self, listed: bool) -> Self {
        self.include_in_directory = listed;
        self
    }

    pub fn with_imported(mut self, imported: ImportedMembership) -> Self {
        self.imported = Some(imported);
        self
    }

    /// Paid and not yet processed.
    pub fn is_eligible(&self) -> bool {
        self.status.starts_with("paid") && self.processed.is_none()
    }

    /// Non-empty address override, if any.
    pub fn override_address(&self) -> Option<&str> {
        self.address_override
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }

    /// Address new accounts are contacted at: the override when present,
    /// otherwise the home address.
    pub fn contact_address(&self) -> &str {
        self.override_address()
            .unwrap_or_else(|| self.home_address.trim())
    }

    pub fn mark_processed(&mut self, at: DateTime<Utc>) {
        self.processed = Some(at);
    }

    /// Short label for logs.
    pub fn label(&self) -> String {
        match &self.reference {
            Some(reference) => format!("{} {} ({})", self.given_name, self.family_name, reference),
            None => format!("{} {}", self.given_name, self.family_name),
        }
    }
}
