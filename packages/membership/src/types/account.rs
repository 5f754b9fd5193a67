//! Account records held by the member directory.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::ReconcileConfig;
use crate::types::ledger::LedgerEntry;

/// Email type tag for the home (personal) contact address.
pub const HOME: &str = "home";

/// Phone type tag for mobile numbers.
pub const MOBILE: &str = "mobile";

/// Membership type used when a ledger entry carries no imported membership.
pub const INDIVIDUAL: &str = "Individual";

/// Membership type whose accounts carry a family label.
pub const FAMILY: &str = "Family";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub given_name: String,
    pub family_name: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub address: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipAttributes {
    pub expires_on: NaiveDate,
    pub joined_on: NaiveDate,
    pub membership_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
}

/// A member account as the directory stores it.
///
/// `primary_email` is always `{given}.{family}{generation}@{domain}` in lower
/// case (generation omitted when zero), and exactly one entry of `emails` is
/// flagged primary with that same address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub domain: String,
    /// Collision counter; absent on records that never collided.
    #[serde(default)]
    pub generation: u32,
    pub primary_email: String,
    pub name: PersonName,
    pub emails: Vec<EmailAddress>,
    #[serde(default)]
    pub phones: Vec<PhoneNumber>,
    pub membership: MembershipAttributes,
    pub org_unit_path: String,
    #[serde(default)]
    pub recovery_email: String,
    #[serde(default)]
    pub recovery_phone: String,
    /// Listed in the shared address book. Defaults to listed when absent.
    #[serde(default = "listed_by_default")]
    pub include_in_directory: bool,
}

fn listed_by_default() -> bool {
    true
}

impl AccountRecord {
    /// Build the account a paid ledger entry joins as.
    pub fn from_entry(entry: &LedgerEntry, config: &ReconcileConfig, today: NaiveDate) -> Self {
        let given_name = entry.given_name.trim().to_string();
        let family_name = entry.family_name.trim().to_string();
        let primary_email = derive_identifier(&given_name, &family_name, 0, &config.domain);
        let home = entry.contact_address().to_string();
        let phone = normalize_phone(&entry.phone, &config.country_prefix);

        let membership = match &entry.imported {
            Some(imported) => MembershipAttributes {
                expires_on: imported.expires_on,
                joined_on: imported.joined_on,
                membership_type: imported.membership_type.clone(),
                family: imported.family.clone().or_else(|| {
                    (imported.membership_type == FAMILY).then(|| family_name.clone())
                }),
            },
            None => MembershipAttributes {
                expires_on: add_one_year(today),
                joined_on: today,
                membership_type: INDIVIDUAL.to_string(),
                family: None,
            },
        };

        Self {
            domain: config.domain.clone(),
            generation: 0,
            name: PersonName {
                full_name: format!("{} {}", given_name, family_name),
                given_name,
                family_name,
            },
            emails: vec![
                EmailAddress {
                    address: home.clone(),
                    kind: Some(HOME.to_string()),
                    primary: false,
                },
                EmailAddress {
                    address: primary_email.clone(),
                    kind: None,
                    primary: true,
                },
            ],
            phones: vec![PhoneNumber {
                value: phone.clone(),
                kind: MOBILE.to_string(),
            }],
            primary_email,
            membership,
            org_unit_path: config.scope.clone(),
            recovery_email: home,
            recovery_phone: phone,
            include_in_directory: entry.include_in_directory,
        }
    }

    /// Deep copy of an existing record, used as the starting point for an update.
    pub fn from_existing(existing: &AccountRecord) -> Self {
        existing.clone()
    }

    pub fn primary_identifier(&self) -> &str {
        &self.primary_email
    }

    /// The home contact address, or `""` if the record has none.
    pub fn home_address(&self) -> &str {
        self.emails
            .iter()
            .find(|e| e.kind.as_deref() == Some(HOME))
            .map(|e| e.address.as_str())
            .unwrap_or("")
    }

    /// Replace the home contact address, adding one if the record has none.
    pub fn set_home_address(&mut self, address: impl Into<String>) {
        let address = address.into();
        match self.emails.iter_mut().find(|e| e.kind.as_deref() == Some(HOME)) {
            Some(email) => email.address = address,
            None => self.emails.push(EmailAddress {
                address,
                kind: Some(HOME.to_string()),
                primary: false,
            }),
        }
    }

    /// The mobile phone number, or `""` if the record has none.
    pub fn mobile_phone(&self) -> &str {
        self.phones
            .iter()
            .find(|p| p.kind == MOBILE)
            .map(|p| p.value.as_str())
            .unwrap_or("")
    }

    /// Bump the collision counter and re-derive the primary identifier.
    pub fn increment_generation(&mut self) {
        self.generation += 1;
        self.primary_email = derive_identifier(
            &self.name.given_name,
            &self.name.family_name,
            self.generation,
            &self.domain,
        );
        let primary = self.primary_email.clone();
        match self.emails.iter_mut().find(|e| e.primary) {
            Some(email) => email.address = primary,
            None => self.emails.push(EmailAddress {
                address: primary,
                kind: None,
                primary: true,
            }),
        }
    }

    /// Extend membership by one calendar year.
    pub fn increment_expiration_date(&mut self) {
        self.membership.expires_on = add_one_year(self.membership.expires_on);
    }

    /// Two records identify the same account when their primary identifiers
    /// agree case-insensitively.
    pub fn same_identity(&self, other: &AccountRecord) -> bool {
        self.primary_email.eq_ignore_ascii_case(&other.primary_email)
    }
}

/// Derive the primary identifier for a name and generation.
pub fn derive_identifier(given: &str, family: &str, generation: u32, domain: &str) -> String {
    let suffix = if generation > 0 {
        generation.to_string()
    } else {
        String::new()
    };
    format!("{}.{}{}@{}", given, family, suffix, domain).to_lowercase()
}

/// Prefix `country_prefix` unless the number already carries one.
pub fn normalize_phone(raw: &str, country_prefix: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('+') {
        raw.to_string()
    } else {
        format!("{}{}", country_prefix, raw)
    }
}

/// Same month and day next year; 29 February clamps to 28 February.
pub fn add_one_year(date: NaiveDate) -> NaiveDate {
    date.checked_add_months(Months::new(12))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ledger::ImportedMembership;
    use chrono::Datelike;

    fn config() -> ReconcileConfig {
        ReconcileConfig::new("/Members", "example.org")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry() -> LedgerEntry {
        LedgerEntry::new(" Jane ", "Doe ", "jane@home.net", "4085551234", "paid")
    }

    #[test]
    fn test_from_entry_derives_identity() {
        let record = AccountRecord::from_entry(&entry(), &config(), date(2026, 3, 1));

        assert_eq!(record.primary_identifier(), "jane.doe@example.org");
        assert_eq!(record.name.full_name, "Jane Doe");
        assert_eq!(record.home_address(), "jane@home.net");
        assert_eq!(record.mobile_phone(), "+14085551234");
        assert_eq!(record.org_unit_path, "/Members");
        assert_eq!(record.recovery_email, "jane@home.net");
        assert_eq!(record.recovery_phone, "+14085551234");

        let primaries: Vec<_> = record.emails.iter().filter(|e| e.primary).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].address, record.primary_email);
    }

    #[test]
    fn test_from_entry_default_membership() {
        let record = AccountRecord::from_entry(&entry(), &config(), date(2026, 3, 1));

        assert_eq!(record.membership.joined_on, date(2026, 3, 1));
        assert_eq!(record.membership.expires_on, date(2027, 3, 1));
        assert_eq!(record.membership.membership_type, INDIVIDUAL);
        assert_eq!(record.membership.family, None);
    }

    #[test]
    fn test_from_entry_imported_family_defaults_label() {
        let mut entry = entry();
        entry.imported = Some(ImportedMembership {
            joined_on: date(2019, 5, 4),
            expires_on: date(2027, 5, 4),
            membership_type: FAMILY.to_string(),
            family: None,
        });

        let record = AccountRecord::from_entry(&entry, &config(), date(2026, 3, 1));

        assert_eq!(record.membership.joined_on, date(2019, 5, 4));
        assert_eq!(record.membership.expires_on, date(2027, 5, 4));
        assert_eq!(record.membership.family.as_deref(), Some("Doe"));
    }

    #[test]
    fn test_from_entry_imported_family_keeps_override() {
        let mut entry = entry();
        entry.imported = Some(ImportedMembership {
            joined_on: date(2019, 5, 4),
            expires_on: date(2027, 5, 4),
            membership_type: FAMILY.to_string(),
            family: Some("Doe-Smith".to_string()),
        });

        let record = AccountRecord::from_entry(&entry, &config(), date(2026, 3, 1));
        assert_eq!(record.membership.family.as_deref(), Some("Doe-Smith"));
    }

    #[test]
    fn test_from_entry_prefers_address_override() {
        let entry = entry().with_address_override("jane@new.net");
        let record = AccountRecord::from_entry(&entry, &config(), date(2026, 3, 1));
        assert_eq!(record.home_address(), "jane@new.net");
    }

    #[test]
    fn test_increment_generation_rewrites_primary() {
        let mut record = AccountRecord::from_entry(&entry(), &config(), date(2026, 3, 1));

        record.increment_generation();
        assert_eq!(record.generation, 1);
        assert_eq!(record.primary_identifier(), "jane.doe1@example.org");

        record.increment_generation();
        assert_eq!(record.primary_identifier(), "jane.doe2@example.org");

        let primaries: Vec<_> = record.emails.iter().filter(|e| e.primary).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].address, "jane.doe2@example.org");
        assert_eq!(record.home_address(), "jane@home.net");
    }

    #[test]
    fn test_increment_expiration_date_across_leap_years() {
        let mut record = AccountRecord::from_entry(&entry(), &config(), date(2026, 3, 1));

        for start in [date(2023, 2, 28), date(2024, 2, 28), date(2023, 3, 1), date(2026, 12, 31)] {
            record.membership.expires_on = start;
            record.increment_expiration_date();
            let next = record.membership.expires_on;
            assert_eq!(next.year(), start.year() + 1);
            assert_eq!((next.month(), next.day()), (start.month(), start.day()));
        }

        record.membership.expires_on = date(2024, 2, 29);
        record.increment_expiration_date();
        assert_eq!(record.membership.expires_on, date(2025, 2, 28));
    }

    #[test]
    fn test_same_identity_ignores_case() {
        let a = AccountRecord::from_entry(&entry(), &config(), date(2026, 3, 1));
        let mut b = AccountRecord::from_existing(&a);
        b.primary_email = "Jane.Doe@Example.org".to_string();
        assert!(a.same_identity(&b));

        b.increment_generation();
        assert!(!a.same_identity(&b));
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("4085551234", "+1"), "+14085551234");
        assert_eq!(normalize_phone("+447700900123", "+1"), "+447700900123");
        assert_eq!(normalize_phone("  ", "+1"), "");
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{
            "domain": "example.org",
            "primary_email": "jane.doe@example.org",
            "name": {"given_name": "Jane", "family_name": "Doe", "full_name": "Jane Doe"},
            "emails": [{"address": "jane.doe@example.org", "primary": true}],
            "membership": {"expires_on": "2027-03-01", "joined_on": "2026-03-01", "membership_type": "Individual"},
            "org_unit_path": "/Members"
        }"#;

        let record: AccountRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.generation, 0);
        assert!(record.include_in_directory);
        assert_eq!(record.home_address(), "");
        assert_eq!(record.mobile_phone(), "");

        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["membership"]["expires_on"], "2027-03-01");
    }
}
