//! Data source abstraction for site providers.
//!
//! The query cache only sees the `SiteSource` trait. The synthetic
//! generator is one implementation; a real provider would be another and
//! should be wrapped in `ValidatingSource` so malformed records never reach
//! the cache.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use foundation::TimestampMs;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::generator::{GenerationConfig, SiteGenerator};
use crate::query::SiteQuery;
use crate::record::{RecordError, SiteRecord, validate_batch};

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Failure of a data source. An empty batch is a success, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The provider could not be reached or refused the request.
    Unavailable(String),
    /// The provider answered with something unusable.
    Source(String),
    /// A record failed boundary validation; the whole batch is rejected.
    MalformedRecord(RecordError),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Unavailable(msg) => write!(f, "data source unavailable: {msg}"),
            FetchError::Source(msg) => write!(f, "data source error: {msg}"),
            FetchError::MalformedRecord(err) => write!(f, "malformed record: {err}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::MalformedRecord(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RecordError> for FetchError {
    fn from(err: RecordError) -> Self {
        FetchError::MalformedRecord(err)
    }
}

/// Produces the records for one query.
///
/// Implementations must be `Send + Sync`; fetches run as spawned tasks.
pub trait SiteSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch(&self, query: SiteQuery) -> BoxFuture<'_, Result<Vec<SiteRecord>, FetchError>>;
}

impl<T: SiteSource + ?Sized> SiteSource for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&self, query: SiteQuery) -> BoxFuture<'_, Result<Vec<SiteRecord>, FetchError>> {
        (**self).fetch(query)
    }
}

/// Generator-backed source that waits `latency` before answering.
#[derive(Debug)]
pub struct SimulatedSource {
    generator: Mutex<SiteGenerator>,
    latency: Duration,
}

impl SimulatedSource {
    pub fn new(config: GenerationConfig) -> Self {
        Self::from_generator(SiteGenerator::new(config))
    }

    pub fn with_seed(config: GenerationConfig, seed: u64) -> Self {
        Self::from_generator(SiteGenerator::with_seed(config, seed))
    }

    pub fn from_generator(generator: SiteGenerator) -> Self {
        let latency = Duration::from_millis(generator.config().latency_ms);
        Self {
            generator: Mutex::new(generator),
            latency,
        }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

impl SiteSource for SimulatedSource {
    fn name(&self) -> &str {
        "simulated"
    }

    fn fetch(&self, query: SiteQuery) -> BoxFuture<'_, Result<Vec<SiteRecord>, FetchError>> {
        Box::pin(async move {
            tokio::time::sleep(self.latency).await;

            let mut generator = self.generator.lock();
            if generator.roll_failure() {
                warn!(query = %query, "simulated upstream outage");
                return Err(FetchError::Unavailable(
                    "simulated upstream outage".to_string(),
                ));
            }
            Ok(generator.generate(&query, TimestampMs::now()))
        })
    }
}

/// Rejects any batch containing a malformed record or a duplicate id.
#[derive(Debug)]
pub struct ValidatingSource<S> {
    inner: S,
}

impl<S: SiteSource> ValidatingSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: SiteSource> SiteSource for ValidatingSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch(&self, query: SiteQuery) -> BoxFuture<'_, Result<Vec<SiteRecord>, FetchError>> {
        Box::pin(async move {
            let sites = self.inner.fetch(query).await?;
            let fetched_at = TimestampMs::now();
            if let Err(err) = validate_batch(&sites, fetched_at) {
                warn!(source = self.inner.name(), error = %err, "rejecting batch");
                return Err(err.into());
            }
            debug!(source = self.inner.name(), count = sites.len(), "batch validated");
            Ok(sites)
        })
    }
}
