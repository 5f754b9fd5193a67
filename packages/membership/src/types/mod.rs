//! Data model: accounts, ledger entries, outcomes.

pub mod account;
pub mod ledger;
pub mod outcome;

pub use account::{AccountRecord, EmailAddress, MembershipAttributes, PersonName, PhoneNumber};
pub use ledger::{ImportedMembership, LedgerEntry};
pub use outcome::{BatchReport, OutcomeEvent, OutcomeKind};
