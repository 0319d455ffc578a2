//! Dual-provider lookup orchestration.
//!
//! The primary provider is queried under a hard deadline. When the
//! deadline expires (or the primary fails outright, panics included) the
//! secondary provider is asked once, followed by a courtesy settle delay.
//! Whichever provider answers is recorded on the `LookupResult` so the
//! formatter never has to guess the record shape.
//!
//! ```text
//! Start --ok--> Resolved(primary)
//!   |--deadline / error--> Fallback --registrar--> Resolved(secondary)
//!                             |--no registrar--> UnsupportedDomain
//!                             '--error-------> ProviderError
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use crate::config::LookupConfig;
use crate::deadline::{DeadlineOutcome, with_deadline};
use crate::domain_utils::NormalizedDomain;
use crate::errors::{BotError, Result};

/// Creation date as reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreationDate {
    Single(DateTime<Utc>),
    /// Several creation lines were present; the first one is authoritative.
    Sequence(Vec<DateTime<Utc>>),
    Absent,
}

impl CreationDate {
    /// The single timestamp to report, if any.
    pub fn first(&self) -> Option<DateTime<Utc>> {
        match self {
            CreationDate::Single(dt) => Some(*dt),
            CreationDate::Sequence(all) => all.first().copied(),
            CreationDate::Absent => None,
        }
    }

    pub fn from_vec(mut dates: Vec<DateTime<Utc>>) -> Self {
        match dates.len() {
            0 => CreationDate::Absent,
            1 => CreationDate::Single(dates.remove(0)),
            _ => CreationDate::Sequence(dates),
        }
    }
}

/// Raw record as returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRecord {
    pub registrar: Option<String>,
    pub creation_date: CreationDate,
}

impl ProviderRecord {
    pub fn has_registrar(&self) -> bool {
        self.registrar
            .as_deref()
            .map(|r| !r.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Which provider produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Primary,
    Secondary,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Primary => f.write_str("primary"),
            Provenance::Secondary => f.write_str("secondary"),
        }
    }
}

/// Successful lookup. `creation_date` always resolves to a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupResult {
    pub domain: NormalizedDomain,
    pub provenance: Provenance,
    pub record: ProviderRecord,
}

/// A registration-data source.
#[async_trait]
pub trait LookupProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn lookup(&self, domain: &str) -> Result<ProviderRecord>;
}

/// Runs the primary → secondary fallback for one domain.
pub struct LookupOrchestrator {
    primary: Arc<dyn LookupProvider>,
    secondary: Arc<dyn LookupProvider>,
    primary_deadline: Duration,
    settle_delay: Duration,
}

impl LookupOrchestrator {
    pub fn new(primary: Arc<dyn LookupProvider>, secondary: Arc<dyn LookupProvider>) -> Self {
        let defaults = LookupConfig::default();
        Self {
            primary,
            secondary,
            primary_deadline: defaults.primary_deadline,
            settle_delay: defaults.settle_delay,
        }
    }

    pub fn from_config(
        primary: Arc<dyn LookupProvider>,
        secondary: Arc<dyn LookupProvider>,
        config: &LookupConfig,
    ) -> Self {
        Self::new(primary, secondary)
            .primary_deadline(config.primary_deadline)
            .settle_delay(config.settle_delay)
    }

    pub fn primary_deadline(mut self, deadline: Duration) -> Self {
        self.primary_deadline = deadline;
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Resolve a domain to a lookup result or a typed failure.
    pub async fn resolve(&self, domain: &NormalizedDomain) -> Result<LookupResult> {
        match self.query_primary(domain).await {
            Ok(record) => Ok(LookupResult {
                domain: domain.clone(),
                provenance: Provenance::Primary,
                record,
            }),
            Err(e) => {
                match &e {
                    BotError::LookupTimedOut { .. } => debug!(%domain, "{e}; falling back"),
                    BotError::Internal { .. } => error!(%domain, "{e}; falling back"),
                    _ => warn!(%domain, category = %e.category(), "{e}; falling back"),
                }
                self.query_secondary(domain).await
            }
        }
    }

    async fn query_primary(&self, domain: &NormalizedDomain) -> Result<ProviderRecord> {
        let provider = Arc::clone(&self.primary);
        let name = provider.name();
        let query = domain.as_str().to_string();
        debug!(
            %domain,
            provider = name,
            deadline_ms = self.primary_deadline.as_millis() as u64,
            "querying primary"
        );

        let outcome = with_deadline(self.primary_deadline, async move {
            provider.lookup(&query).await
        })
        .await?;

        let record = match outcome {
            DeadlineOutcome::Completed(record) => record?,
            DeadlineOutcome::Expired => {
                return Err(BotError::timed_out(
                    name,
                    domain.as_str(),
                    self.primary_deadline.as_millis() as u64,
                ));
            }
        };

        if record.creation_date.first().is_none() {
            return Err(BotError::provider(
                name,
                domain.as_str(),
                "record has no creation date",
            ));
        }
        Ok(record)
    }

    async fn query_secondary(&self, domain: &NormalizedDomain) -> Result<LookupResult> {
        let name = self.secondary.name();
        debug!(%domain, provider = name, "querying secondary");

        let record = self.secondary.lookup(domain.as_str()).await?;
        tokio::time::sleep(self.settle_delay).await;

        if !record.has_registrar() {
            return Err(BotError::unsupported(domain.as_str()));
        }
        if record.creation_date.first().is_none() {
            return Err(BotError::provider(
                name,
                domain.as_str(),
                "record has no creation date",
            ));
        }
        Ok(LookupResult {
            domain: domain.clone(),
            provenance: Provenance::Secondary,
            record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_utils::normalize_candidate;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn record(registrar: Option<&str>, created: CreationDate) -> ProviderRecord {
        ProviderRecord {
            registrar: registrar.map(str::to_string),
            creation_date: created,
        }
    }

    struct Fixed {
        record: ProviderRecord,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(record: ProviderRecord) -> Arc<Self> {
            Arc::new(Self {
                record,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LookupProvider for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        async fn lookup(&self, _domain: &str) -> Result<ProviderRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.record.clone())
        }
    }

    struct NeverReturns;

    #[async_trait]
    impl LookupProvider for NeverReturns {
        fn name(&self) -> &'static str {
            "hanging"
        }
        async fn lookup(&self, _domain: &str) -> Result<ProviderRecord> {
            std::future::pending().await
        }
    }

    struct Failing;

    #[async_trait]
    impl LookupProvider for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn lookup(&self, domain: &str) -> Result<ProviderRecord> {
            Err(BotError::provider("failing", domain, "connection refused"))
        }
    }

    struct Panics;

    #[async_trait]
    impl LookupProvider for Panics {
        fn name(&self) -> &'static str {
            "panics"
        }
        async fn lookup(&self, _domain: &str) -> Result<ProviderRecord> {
            let server: Option<&str> = None;
            Err(BotError::provider(
                server.expect("registry server vanished"),
                "example.com",
                "unreachable",
            ))
        }
    }

    fn domain(s: &str) -> NormalizedDomain {
        normalize_candidate(s).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn primary_success_skips_secondary() {
        let primary = Fixed::new(record(
            Some("X"),
            CreationDate::Sequence(vec![date(2020, 1, 1), date(2021, 1, 1)]),
        ));
        let secondary = Fixed::new(record(Some("Y"), CreationDate::Single(date(1999, 1, 1))));
        let orch = LookupOrchestrator::new(primary.clone(), secondary.clone());

        let started = Instant::now();
        let res = orch.resolve(&domain("example.com")).await.unwrap();

        assert_eq!(res.provenance, Provenance::Primary);
        assert_eq!(res.record.creation_date.first(), Some(date(2020, 1, 1)));
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_primary_falls_back_within_deadline() {
        let secondary = Fixed::new(record(Some("Y"), CreationDate::Single(date(2010, 5, 4))));
        let orch = LookupOrchestrator::new(Arc::new(NeverReturns), secondary.clone());

        let started = Instant::now();
        let res = orch.resolve(&domain("example.io")).await.unwrap();

        assert_eq!(res.provenance, Provenance::Secondary);
        assert_eq!(res.record.registrar.as_deref(), Some("Y"));
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
        // 3s deadline plus the 1s settle delay.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_registrar_is_unsupported() {
        let secondary = Fixed::new(record(Some("  "), CreationDate::Absent));
        let orch = LookupOrchestrator::new(Arc::new(NeverReturns), secondary);
        let err = orch.resolve(&domain("example.zz")).await.unwrap_err();
        assert!(matches!(err, BotError::UnsupportedDomain { ref domain } if domain == "example.zz"));

        let secondary = Fixed::new(record(None, CreationDate::Absent));
        let orch = LookupOrchestrator::new(Arc::new(NeverReturns), secondary);
        let err = orch.resolve(&domain("example.zz")).await.unwrap_err();
        assert!(matches!(err, BotError::UnsupportedDomain { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn secondary_failure_is_provider_error() {
        let orch = LookupOrchestrator::new(Arc::new(NeverReturns), Arc::new(Failing));
        let err = orch.resolve(&domain("example.com")).await.unwrap_err();
        assert!(matches!(err, BotError::ProviderError { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_primary_falls_back() {
        let secondary = Fixed::new(record(Some("Y"), CreationDate::Single(date(2015, 1, 1))));
        let orch = LookupOrchestrator::new(Arc::new(Failing), secondary.clone());
        let res = orch.resolve(&domain("example.com")).await.unwrap();
        assert_eq!(res.provenance, Provenance::Secondary);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_primary_falls_back() {
        let secondary = Fixed::new(record(Some("Y"), CreationDate::Single(date(2015, 1, 1))));
        let orch = LookupOrchestrator::new(Arc::new(Panics), secondary.clone());
        let res = orch.resolve(&domain("example.com")).await.unwrap();
        assert_eq!(res.provenance, Provenance::Secondary);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn primary_without_creation_date_falls_back() {
        let primary = Fixed::new(record(Some("X"), CreationDate::Absent));
        let secondary = Fixed::new(record(Some("Y"), CreationDate::Single(date(2015, 1, 1))));
        let orch = LookupOrchestrator::new(primary, secondary.clone());
        let res = orch.resolve(&domain("example.com")).await.unwrap();
        assert_eq!(res.provenance, Provenance::Secondary);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_timings_apply() {
        let secondary = Fixed::new(record(Some("Y"), CreationDate::Single(date(2015, 1, 1))));
        let orch = LookupOrchestrator::new(Arc::new(NeverReturns), secondary)
            .primary_deadline(Duration::from_millis(100))
            .settle_delay(Duration::ZERO);
        let started = Instant::now();
        orch.resolve(&domain("example.com")).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn creation_date_selection() {
        assert_eq!(CreationDate::from_vec(vec![]), CreationDate::Absent);
        assert_eq!(
            CreationDate::from_vec(vec![date(2001, 2, 3)]),
            CreationDate::Single(date(2001, 2, 3))
        );
        let seq = CreationDate::from_vec(vec![date(2001, 2, 3), date(1999, 1, 1)]);
        assert_eq!(seq.first(), Some(date(2001, 2, 3)));
    }
}
