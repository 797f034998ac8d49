//! Pipeline-wide configuration.

use std::collections::HashMap;
use std::time::Duration;

use crate::content::CleanConfig;
use crate::escalate::EscalationPolicy;
use crate::fetch::{FetchConfig, SiteFlags};
use crate::types::ContentDomain;
use crate::validate::CurrencyConfig;

/// Configuration for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Retries around the primary-extraction call. The call runs at most
    /// `max_retries + 1` times.
    pub max_retries: u32,

    /// Backoff before the first retry; doubles on each further attempt.
    pub retry_initial_delay: Duration,

    /// Fetch tier settings.
    pub fetch: FetchConfig,

    /// Hosts flagged for the bypass/rendering tiers.
    pub site_flags: SiteFlags,

    /// Currency normalization settings.
    pub currency: CurrencyConfig,

    /// Content cleaning limits.
    pub clean: CleanConfig,

    /// Cap on the raw-content snapshot attached to the record.
    pub snapshot_max_chars: usize,

    /// Per-domain escalation overrides; domains not listed here use
    /// [`EscalationPolicy::for_domain`].
    pub escalation_overrides: HashMap<ContentDomain, EscalationPolicy>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_initial_delay: Duration::from_millis(500),
            fetch: FetchConfig::default(),
            site_flags: SiteFlags::default(),
            currency: CurrencyConfig::default(),
            clean: CleanConfig::default(),
            snapshot_max_chars: 10_000,
            escalation_overrides: HashMap::new(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_initial_delay(mut self, delay: Duration) -> Self {
        self.retry_initial_delay = delay;
        self
    }

    pub fn with_currency(mut self, currency: CurrencyConfig) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_site_flags(mut self, flags: SiteFlags) -> Self {
        self.site_flags = flags;
        self
    }

    /// Override the escalation policy for one domain.
    pub fn with_escalation(mut self, domain: ContentDomain, policy: EscalationPolicy) -> Self {
        self.escalation_overrides.insert(domain, policy);
        self
    }

    /// The escalation policy in force for a domain.
    pub fn escalation_for(&self, domain: ContentDomain) -> EscalationPolicy {
        self.escalation_overrides
            .get(&domain)
            .cloned()
            .unwrap_or_else(|| EscalationPolicy::for_domain(domain))
    }
}
