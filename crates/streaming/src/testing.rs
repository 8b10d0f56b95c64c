//! Scripted data source for cache tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use foundation::{LngLat, TimestampMs};
use parking_lot::Mutex;
use sites::{
    BoxFuture, FetchError, GeologicalDetails, GeologicalProfile, RiskLevel, SiteDetails,
    SiteQuery, SiteRecord, SiteSource, SiteStatus,
};

pub struct Step {
    delay: Duration,
    result: Result<Vec<SiteRecord>, FetchError>,
}

impl Step {
    pub fn ok(delay: Duration, sites: Vec<SiteRecord>) -> Self {
        Self {
            delay,
            result: Ok(sites),
        }
    }

    pub fn err(delay: Duration, err: FetchError) -> Self {
        Self {
            delay,
            result: Err(err),
        }
    }
}

/// Answers fetches from a script, in call order. Once the script runs out
/// every fetch succeeds after 10ms with an empty batch.
pub struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SiteSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch(&self, _query: SiteQuery) -> BoxFuture<'_, Result<Vec<SiteRecord>, FetchError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .lock()
            .pop_front()
            .unwrap_or_else(|| Step::ok(Duration::from_millis(10), Vec::new()));
        Box::pin(async move {
            tokio::time::sleep(step.delay).await;
            step.result
        })
    }
}

/// `len` geological records named `{label}-{i}`.
pub fn batch(label: &str, len: usize) -> Vec<SiteRecord> {
    (0..len)
        .map(|i| SiteRecord {
            id: format!("geological-{i}"),
            name: format!("{label}-{i}"),
            site_type: "geological".to_string(),
            coordinates: LngLat::new(i as f64, 0.0),
            status: SiteStatus::Active,
            distance_km: 1.0,
            last_updated: TimestampMs(0),
            details: SiteDetails::Geological(GeologicalDetails {
                elevation_m: 100,
                geological: GeologicalProfile {
                    rock_type: None,
                    formation: None,
                    seismic_risk: RiskLevel::Low,
                },
            }),
        })
        .collect()
}

pub fn names(sites: &[SiteRecord]) -> Vec<&str> {
    sites.iter().map(|s| s.name.as_str()).collect()
}
