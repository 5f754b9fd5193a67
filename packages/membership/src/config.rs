//! Engine configuration.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;

/// Country prefix prepended to phone numbers that lack one.
pub const DEFAULT_COUNTRY_PREFIX: &str = "+1";

/// Limits for the bounded retry loops and visibility polling.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Sleep between attempts while the directory reports `CreationPending`.
    pub creation_pending_backoff: Duration,

    /// Attempts before giving up on `CreationPending`.
    pub creation_pending_max_attempts: u32,

    /// Highest generation tried before giving up on an identifier collision.
    pub max_generation: u32,

    /// Polls of `list_all` after a create before moving on.
    pub visibility_attempts: u32,

    /// Sleep between visibility polls.
    pub visibility_interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            creation_pending_backoff: Duration::from_secs(1),
            creation_pending_max_attempts: 10,
            max_generation: 100,
            visibility_attempts: 5,
            visibility_interval: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    /// No sleeping at all. Used by tests and dry runs.
    pub fn immediate() -> Self {
        Self {
            creation_pending_backoff: Duration::ZERO,
            visibility_interval: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Configuration consumed by the reconciler.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Organizational scope (org unit path) accounts are listed from and placed into.
    pub scope: String,

    /// Domain suffix for generated primary identifiers.
    pub domain: String,

    /// Groups every newly created account is registered into.
    pub groups: Vec<String>,

    /// Prefix for phone numbers that do not start with `+`.
    pub country_prefix: String,

    pub retry: RetryConfig,
}

impl ReconcileConfig {
    pub fn new(scope: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            domain: domain.into(),
            groups: vec![],
            country_prefix: DEFAULT_COUNTRY_PREFIX.to_string(),
            retry: RetryConfig::default(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let mut retry = RetryConfig::default();
        if let Ok(ms) = env::var("MEMBERSHIP_PENDING_BACKOFF_MS") {
            let ms: u64 = ms
                .parse()
                .context("MEMBERSHIP_PENDING_BACKOFF_MS must be a number of milliseconds")?;
            retry.creation_pending_backoff = Duration::from_millis(ms);
        }
        if let Ok(attempts) = env::var("MEMBERSHIP_PENDING_MAX_ATTEMPTS") {
            retry.creation_pending_max_attempts = attempts
                .parse()
                .context("MEMBERSHIP_PENDING_MAX_ATTEMPTS must be a valid number")?;
        }
        if let Ok(max) = env::var("MEMBERSHIP_MAX_GENERATION") {
            retry.max_generation = max
                .parse()
                .context("MEMBERSHIP_MAX_GENERATION must be a valid number")?;
        }
        if let Ok(attempts) = env::var("MEMBERSHIP_VISIBILITY_ATTEMPTS") {
            retry.visibility_attempts = attempts
                .parse()
                .context("MEMBERSHIP_VISIBILITY_ATTEMPTS must be a valid number")?;
        }
        if let Ok(ms) = env::var("MEMBERSHIP_VISIBILITY_INTERVAL_MS") {
            let ms: u64 = ms
                .parse()
                .context("MEMBERSHIP_VISIBILITY_INTERVAL_MS must be a number of milliseconds")?;
            retry.visibility_interval = Duration::from_millis(ms);
        }

        Ok(Self {
            scope: env::var("MEMBERSHIP_SCOPE").context("MEMBERSHIP_SCOPE must be set")?,
            domain: env::var("MEMBERSHIP_DOMAIN").context("MEMBERSHIP_DOMAIN must be set")?,
            groups: env::var("MEMBERSHIP_GROUPS")
                .map(|groups| parse_groups(&groups))
                .unwrap_or_default(),
            country_prefix: env::var("MEMBERSHIP_COUNTRY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_COUNTRY_PREFIX.to_string()),
            retry,
        })
    }

    /// Add groups new accounts are registered into.
    pub fn with_groups(mut self, groups: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.groups = groups.into_iter().map(|g| g.into()).collect();
        self
    }

    pub fn with_country_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.country_prefix = prefix.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

fn parse_groups(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(String::from)
        .collect()
}
