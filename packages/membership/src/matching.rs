//! Matching ledger entries to existing accounts.
//!
//! Two dimensions are compared: home address and mobile phone. Each one
//! resolves through a fixed rule table so that missing contact data never
//! forces a mismatch:
//!
//! | left    | right   | result   |
//! |---------|---------|----------|
//! | empty   | empty   | agree    |
//! | empty   | present | agree    |
//! | present | empty   | agree    |
//! | present | present | equality |

use crate::types::account::normalize_phone;
use crate::types::{AccountRecord, LedgerEntry};

/// How one dimension compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agreement {
    BothEmpty,
    OneEmpty,
    Equal,
    Different,
}

impl Agreement {
    pub fn compare(left: &str, right: &str, eq: impl Fn(&str, &str) -> bool) -> Self {
        match (left.is_empty(), right.is_empty()) {
            (true, true) => Agreement::BothEmpty,
            (true, false) | (false, true) => Agreement::OneEmpty,
            (false, false) if eq(left, right) => Agreement::Equal,
            (false, false) => Agreement::Different,
        }
    }

    pub fn agrees(self) -> bool {
        !matches!(self, Agreement::Different)
    }
}

/// Combined result of both dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Address and phone both agree.
    Full,
    /// Exactly one dimension agrees.
    Partial { address: bool, phone: bool },
    /// Neither agrees.
    NoMatch,
}

impl MatchOutcome {
    pub fn from_dimensions(address: bool, phone: bool) -> Self {
        match (address, phone) {
            (true, true) => MatchOutcome::Full,
            (false, false) => MatchOutcome::NoMatch,
            (address, phone) => MatchOutcome::Partial { address, phone },
        }
    }

    pub fn is_match(self) -> bool {
        !matches!(self, MatchOutcome::NoMatch)
    }

    pub fn is_full(self) -> bool {
        matches!(self, MatchOutcome::Full)
    }
}

fn same_address(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn same_phone(a: &str, b: &str) -> bool {
    a == b
}

/// Compare two (address, phone) pairs. Inputs are trimmed; phones are
/// expected to be normalized already.
pub fn match_fields(
    left_address: &str,
    left_phone: &str,
    right_address: &str,
    right_phone: &str,
) -> MatchOutcome {
    let address = Agreement::compare(left_address.trim(), right_address.trim(), same_address);
    let phone = Agreement::compare(left_phone.trim(), right_phone.trim(), same_phone);
    MatchOutcome::from_dimensions(address.agrees(), phone.agrees())
}

/// Compare a ledger entry's home address and phone with an account.
pub fn match_record(entry: &LedgerEntry, record: &AccountRecord, country_prefix: &str) -> MatchOutcome {
    match_fields(
        &entry.home_address,
        &normalize_phone(&entry.phone, country_prefix),
        record.home_address(),
        &normalize_phone(record.mobile_phone(), country_prefix),
    )
}

/// What to do with an eligible entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification<'a> {
    /// No account matches: create one.
    Join,
    /// Exactly one account matches on both dimensions: extend it.
    Renew(&'a AccountRecord),
    /// One partial match, or several matches of any kind: report each, change nothing.
    Partial(Vec<&'a AccountRecord>),
}

pub fn classify<'a>(
    entry: &LedgerEntry,
    records: &'a [AccountRecord],
    country_prefix: &str,
) -> Classification<'a> {
    let matches: Vec<(&AccountRecord, MatchOutcome)> = records
        .iter()
        .map(|r| (r, match_record(entry, r, country_prefix)))
        .filter(|(_, outcome)| outcome.is_match())
        .collect();

    match matches.as_slice() {
        [] => Classification::Join,
        [(record, outcome)] if outcome.is_full() => Classification::Renew(record),
        _ => Classification::Partial(matches.into_iter().map(|(r, _)| r).collect()),
    }
}
