use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use sites::{FetchError, SiteRecord, SiteSource};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::key::QueryKey;
use crate::request::Request;
use crate::snapshot::QuerySnapshot;
use crate::status::{FetchCause, QueryStatus};

#[derive(Debug)]
struct CacheEntry {
    status: QueryStatus,
    data: Option<Arc<[SiteRecord]>>,
    error: Option<FetchError>,
    fetched_at: Option<Instant>,
    /// Latest fetch issued for this key; only its result may be committed.
    latest: Request,
    in_flight: Option<Request>,
    subscribers: usize,
    refetch: Option<JoinHandle<()>>,
    revision: u64,
    tx: watch::Sender<QuerySnapshot>,
}

impl CacheEntry {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(QuerySnapshot::idle());
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            fetched_at: None,
            latest: Request::NONE,
            in_flight: None,
            subscribers: 0,
            refetch: None,
            revision: 0,
            tx,
        }
    }

    fn is_fresh(&self, now: Instant, stale_time: std::time::Duration) -> bool {
        match self.fetched_at {
            Some(at) => now.saturating_duration_since(at) < stale_time,
            None => false,
        }
    }

    fn snapshot(&self) -> QuerySnapshot {
        QuerySnapshot {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_loading: self.in_flight.is_some() && self.data.is_none(),
            is_fetching: self.in_flight.is_some(),
            fetched_at: self.fetched_at,
            revision: self.revision,
        }
    }

    fn publish(&mut self) {
        self.revision += 1;
        self.tx.send_replace(self.snapshot());
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    next_request: u64,
    fetches_started: u64,
}

impl CacheState {
    fn issue(&mut self) -> Request {
        self.next_request += 1;
        self.fetches_started += 1;
        Request(self.next_request)
    }

    /// Issues a request for `key` and marks it in flight. Must run in the
    /// same critical section as the decision to fetch.
    fn begin_fetch(&mut self, key: &QueryKey) -> Option<Request> {
        if !self.entries.contains_key(key) {
            return None;
        }
        let request = self.issue();
        let entry = self.entries.get_mut(key)?;
        if let Some(previous) = entry.in_flight {
            debug!(key = %key, %previous, %request, "superseding in-flight fetch");
        }
        entry.latest = request;
        entry.in_flight = Some(request);
        entry.status = QueryStatus::Loading;
        entry.publish();
        Some(request)
    }
}

struct Shared<S> {
    config: CacheConfig,
    source: S,
    state: Mutex<CacheState>,
}

/// Keyed, reactive cache over a [`SiteSource`].
///
/// Guarantees:
/// - Single-flight: subscribing to a key with a fetch in flight attaches to
///   it instead of issuing another.
/// - Freshness: data younger than `stale_time` is served without a fetch;
///   older data is served while a revalidating fetch runs.
/// - Last-issued-wins: every fetch carries a [`Request`]; a result is
///   committed only if no newer fetch was issued for its key, and it is only
///   ever written to its own key's entry.
/// - Subscribed keys refetch every `refetch_interval`; the timer stops when
///   the last [`Subscription`] for the key is dropped.
/// - A failed fetch sets the error but keeps the last successful data.
///
/// Entries are never evicted. The handle is cheap to clone; clones share
/// the same table. Fetches and timers are spawned on the ambient tokio
/// runtime, and the table lock is never held across an `.await`.
pub struct QueryCache<S: SiteSource + 'static> {
    inner: Arc<Shared<S>>,
}

impl<S: SiteSource + 'static> Clone for QueryCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: SiteSource + 'static> QueryCache<S> {
    pub fn new(source: S, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Shared {
                config,
                source,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn source(&self) -> &S {
        &self.inner.source
    }

    /// Subscribes to `key`, fetching if the entry is missing or stale and
    /// no fetch is already in flight.
    pub fn subscribe(&self, key: QueryKey) -> Subscription<S> {
        let now = Instant::now();
        let stale_time = self.inner.config.stale_time();

        let (rx, request) = {
            let mut state = self.inner.state.lock();
            let entry = state
                .entries
                .entry(key.clone())
                .or_insert_with(CacheEntry::new);
            entry.subscribers += 1;
            if entry.subscribers == 1 {
                entry.refetch = self.schedule_refetch(&key);
            }
            let needs_fetch = entry.in_flight.is_none() && !entry.is_fresh(now, stale_time);
            let rx = entry.tx.subscribe();
            let request = if needs_fetch {
                state.begin_fetch(&key)
            } else {
                None
            };
            (rx, request)
        };

        match request {
            Some(request) => self.spawn_fetch(&key, request, FetchCause::Subscribe),
            None => debug!(key = %key, "serving cached entry"),
        }

        Subscription {
            cache: self.clone(),
            key,
            rx,
        }
    }

    /// Forces a fetch for `key`, superseding any fetch already in flight.
    ///
    /// Returns `None` if the key was never requested.
    pub fn invalidate(&self, key: &QueryKey) -> Option<Request> {
        let request = self.inner.state.lock().begin_fetch(key)?;
        self.spawn_fetch(key, request, FetchCause::Invalidate);
        Some(request)
    }

    pub fn snapshot(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        let state = self.inner.state.lock();
        state.entries.get(key).map(CacheEntry::snapshot)
    }

    pub fn entry_status(&self, key: &QueryKey) -> Option<QueryStatus> {
        let state = self.inner.state.lock();
        state.entries.get(key).map(|e| e.status)
    }

    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        let state = self.inner.state.lock();
        state.entries.get(key).map(|e| e.subscribers).unwrap_or(0)
    }

    /// Whether a background refetch timer is armed for `key`.
    pub fn is_refetch_scheduled(&self, key: &QueryKey) -> bool {
        let state = self.inner.state.lock();
        state
            .entries
            .get(key)
            .and_then(|e| e.refetch.as_ref())
            .is_some_and(|h| !h.is_finished())
    }

    /// Total number of fetches issued since creation.
    pub fn fetches_started(&self) -> u64 {
        self.inner.state.lock().fetches_started
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn spawn_fetch(&self, key: &QueryKey, request: Request, cause: FetchCause) {
        debug!(key = %key, %request, %cause, "fetch issued");

        let cache = self.clone();
        let key = key.clone();
        tokio::spawn(async move {
            let result = cache.run_fetch(&key, request).await;
            cache.commit(&key, request, result);
        });
    }

    async fn run_fetch(
        &self,
        key: &QueryKey,
        request: Request,
    ) -> Result<Vec<SiteRecord>, FetchError> {
        let mut attempt = 0u32;
        loop {
            match self.inner.source.fetch(key.query.clone()).await {
                Ok(sites) => return Ok(sites),
                Err(err) if attempt < self.inner.config.retries && self.is_latest(key, request) => {
                    attempt += 1;
                    warn!(key = %key, %request, attempt, error = %err, "fetch failed, retrying");
                    tokio::time::sleep(self.inner.config.retry_delay()).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn is_latest(&self, key: &QueryKey, request: Request) -> bool {
        let state = self.inner.state.lock();
        state
            .entries
            .get(key)
            .is_some_and(|e| e.latest == request)
    }

    fn commit(&self, key: &QueryKey, request: Request, result: Result<Vec<SiteRecord>, FetchError>) {
        let mut state = self.inner.state.lock();
        let Some(entry) = state.entries.get_mut(key) else {
            return;
        };

        if entry.latest != request {
            debug!(key = %key, %request, latest = %entry.latest, "discarding superseded result");
            return;
        }

        entry.in_flight = None;
        match result {
            Ok(sites) => {
                debug!(key = %key, %request, count = sites.len(), "fetch committed");
                entry.data = Some(sites.into());
                entry.error = None;
                entry.status = QueryStatus::Success;
                entry.fetched_at = Some(Instant::now());
            }
            Err(err) => {
                warn!(key = %key, %request, error = %err, "fetch failed");
                entry.error = Some(err);
                entry.status = QueryStatus::Error;
            }
        }
        entry.publish();
    }

    /// Interval tick: refetch unless a fetch is already in flight.
    fn revalidate(&self, key: &QueryKey) {
        let request = {
            let mut state = self.inner.state.lock();
            if let Some(request) = state.entries.get(key).and_then(|e| e.in_flight) {
                debug!(key = %key, %request, "interval tick joins in-flight fetch");
                return;
            }
            state.begin_fetch(key)
        };
        if let Some(request) = request {
            self.spawn_fetch(key, request, FetchCause::Interval);
        }
    }

    fn schedule_refetch(&self, key: &QueryKey) -> Option<JoinHandle<()>> {
        let period = self.inner.config.refetch_interval()?;
        let weak = Arc::downgrade(&self.inner);
        let key = key.clone();

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                QueryCache { inner }.revalidate(&key);
            }
        }))
    }

    fn release(&self, key: &QueryKey) {
        let timer = {
            let mut state = self.inner.state.lock();
            let Some(entry) = state.entries.get_mut(key) else {
                return;
            };
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers > 0 {
                return;
            }
            entry.refetch.take()
        };

        if let Some(timer) = timer {
            timer.abort();
            debug!(key = %key, "last subscriber left, background refetch stopped");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionClosed;

impl std::fmt::Display for SubscriptionClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "query cache entry closed")
    }
}

impl std::error::Error for SubscriptionClosed {}

/// Reference-counted interest in one key. Dropping it unsubscribes.
pub struct Subscription<S: SiteSource + 'static> {
    cache: QueryCache<S>,
    key: QueryKey,
    rx: watch::Receiver<QuerySnapshot>,
}

impl<S: SiteSource + 'static> Subscription<S> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        self.rx.borrow().clone()
    }

    /// Waits for the next publish of this key's entry.
    pub async fn changed(&mut self) -> Result<(), SubscriptionClosed> {
        self.rx.changed().await.map_err(|_| SubscriptionClosed)
    }
}

impl<S: SiteSource + 'static> Drop for Subscription<S> {
    fn drop(&mut self) {
        self.cache.release(&self.key);
    }
}

impl<S: SiteSource + 'static> std::fmt::Debug for Subscription<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::QueryCache;
    use crate::config::CacheConfig;
    use crate::key::QueryKey;
    use crate::status::QueryStatus;
    use crate::testing::{ScriptedSource, Step, batch, names};
    use foundation::LngLat;
    use pretty_assertions::assert_eq;
    use sites::{FetchError, Filter};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Barrier;
    use tokio::time::sleep;

    fn key(filters: &[Filter]) -> QueryKey {
        QueryKey::sites(
            Some(LngLat::new(0.0, 20.0)),
            filters.iter().copied().collect(),
            None,
        )
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_subscribers_share_one_fetch() {
        for _ in 0..100 {
            let source = ScriptedSource::new(Vec::new());
            let cache = QueryCache::new(source.clone(), CacheConfig::default());
            let barrier = Arc::new(Barrier::new(4));

            let tasks: Vec<_> = (0..4)
                .map(|_| {
                    let cache = cache.clone();
                    let barrier = barrier.clone();
                    tokio::spawn(async move {
                        barrier.wait().await;
                        cache.subscribe(key(&[Filter::Seismic]))
                    })
                })
                .collect();

            let mut subscriptions = Vec::new();
            for task in tasks {
                subscriptions.push(task.await.unwrap());
            }
            assert_eq!(cache.fetches_started(), 1);
            assert_eq!(cache.subscriber_count(&key(&[Filter::Seismic])), 4);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn equal_keys_within_stale_time_fetch_once() {
        let source = ScriptedSource::new(vec![Step::ok(ms(800), batch("first", 3))]);
        let cache = QueryCache::new(source.clone(), CacheConfig::default());

        let first = cache.subscribe(key(&[Filter::Mining, Filter::Geological]));
        let second = cache.subscribe(key(&[Filter::Geological, Filter::Mining]));
        assert!(first.snapshot().is_loading);
        assert!(second.snapshot().is_loading);

        sleep(ms(900)).await;
        assert_eq!(first.snapshot().sites().len(), 3);
        assert_eq!(second.snapshot().sites().len(), 3);

        sleep(ms(3_000)).await;
        let third = cache.subscribe(key(&[Filter::Mining, Filter::Geological]));
        let snap = third.snapshot();
        assert!(!snap.is_fetching);
        assert_eq!(snap.status, QueryStatus::Success);
        assert_eq!(names(snap.sites()), ["first-0", "first-1", "first-2"]);

        sleep(ms(100)).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(cache.fetches_started(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.subscriber_count(third.key()), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_entry_is_served_while_revalidating() {
        let source = ScriptedSource::new(vec![
            Step::ok(ms(100), batch("old", 2)),
            Step::ok(ms(100), batch("new", 4)),
        ]);
        let cache = QueryCache::new(source.clone(), CacheConfig::default());
        let k = key(&[Filter::Mining]);

        let sub = cache.subscribe(k.clone());
        sleep(ms(200)).await;
        drop(sub);
        sleep(ms(6_000)).await;

        let sub = cache.subscribe(k.clone());
        let snap = sub.snapshot();
        assert!(snap.is_fetching);
        assert!(!snap.is_loading);
        assert_eq!(names(snap.sites()), ["old-0", "old-1"]);

        sleep(ms(200)).await;
        assert_eq!(sub.snapshot().sites().len(), 4);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn late_result_never_lands_on_another_key() {
        let source = ScriptedSource::new(vec![
            Step::ok(ms(2_000), batch("a", 5)),
            Step::ok(ms(100), batch("b", 2)),
        ]);
        let cache = QueryCache::new(source.clone(), CacheConfig::default());
        let a = key(&[Filter::Mining]);
        let b = key(&[Filter::Geological]);

        let sub_a = cache.subscribe(a.clone());
        sleep(ms(10)).await;
        drop(sub_a);
        let sub_b = cache.subscribe(b.clone());

        sleep(ms(300)).await;
        let before = sub_b.snapshot();
        assert_eq!(names(before.sites()), ["b-0", "b-1"]);

        sleep(ms(2_000)).await;
        assert_eq!(sub_b.snapshot(), before);
        assert_eq!(cache.snapshot(&a).unwrap().sites().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn last_issued_fetch_wins_for_same_key() {
        let source = ScriptedSource::new(vec![
            Step::ok(ms(2_000), batch("first", 5)),
            Step::ok(ms(100), batch("second", 2)),
        ]);
        let cache = QueryCache::new(source.clone(), CacheConfig::default());
        let k = key(&[Filter::Mining]);

        let sub = cache.subscribe(k.clone());
        sleep(ms(10)).await;
        assert!(cache.invalidate(&k).is_some());

        sleep(ms(300)).await;
        assert_eq!(names(sub.snapshot().sites()), ["second-0", "second-1"]);
        assert!(!sub.snapshot().is_fetching);

        sleep(ms(2_000)).await;
        assert_eq!(names(sub.snapshot().sites()), ["second-0", "second-1"]);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_result_is_dropped_even_if_it_arrives_first() {
        let source = ScriptedSource::new(vec![
            Step::ok(ms(100), batch("first", 5)),
            Step::ok(ms(1_000), batch("second", 2)),
        ]);
        let cache = QueryCache::new(source.clone(), CacheConfig::default());
        let k = key(&[Filter::Mining]);

        let sub = cache.subscribe(k.clone());
        sleep(ms(10)).await;
        cache.invalidate(&k);

        sleep(ms(300)).await;
        let snap = sub.snapshot();
        assert!(snap.data.is_none());
        assert!(snap.is_loading);

        sleep(ms(1_000)).await;
        assert_eq!(names(sub.snapshot().sites()), ["second-0", "second-1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refetch_keeps_last_data() {
        let source = ScriptedSource::new(vec![
            Step::ok(ms(100), batch("good", 3)),
            Step::err(ms(100), FetchError::Unavailable("down".to_string())),
        ]);
        let cache = QueryCache::new(source, CacheConfig::default());
        let k = key(&[Filter::Mining]);

        let sub = cache.subscribe(k.clone());
        sleep(ms(200)).await;
        cache.invalidate(&k);
        sleep(ms(200)).await;

        let snap = sub.snapshot();
        assert_eq!(snap.status, QueryStatus::Error);
        assert_eq!(snap.error, Some(FetchError::Unavailable("down".to_string())));
        assert_eq!(names(snap.sites()), ["good-0", "good-1", "good-2"]);
        assert!(!snap.is_loading);
        assert!(!snap.is_fetching);
    }

    #[tokio::test(start_paused = true)]
    async fn first_fetch_error_has_no_data() {
        let source = ScriptedSource::new(vec![Step::err(
            ms(100),
            FetchError::Source("bad payload".to_string()),
        )]);
        let cache = QueryCache::new(source, CacheConfig::default());
        let sub = cache.subscribe(key(&[Filter::Seismic]));
        sleep(ms(200)).await;

        let snap = sub.snapshot();
        assert_eq!(snap.status, QueryStatus::Error);
        assert!(snap.data.is_none());
        assert!(snap.sites().is_empty());
        assert!(!snap.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn errored_entry_refetches_on_next_subscribe() {
        let source = ScriptedSource::new(vec![
            Step::err(ms(100), FetchError::Unavailable("down".to_string())),
            Step::ok(ms(100), batch("back", 1)),
        ]);
        let cache = QueryCache::new(source.clone(), CacheConfig::default());
        let k = key(&[Filter::Mining]);

        let first = cache.subscribe(k.clone());
        sleep(ms(200)).await;
        let second = cache.subscribe(k.clone());
        sleep(ms(200)).await;

        assert_eq!(source.calls(), 2);
        assert_eq!(second.snapshot().status, QueryStatus::Success);
        assert!(first.snapshot().error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_recover_before_publishing_error() {
        let source = ScriptedSource::new(vec![
            Step::err(ms(10), FetchError::Unavailable("1".to_string())),
            Step::err(ms(10), FetchError::Unavailable("2".to_string())),
            Step::ok(ms(10), batch("third", 1)),
        ]);
        let config = CacheConfig {
            retries: 2,
            retry_delay_ms: 500,
            ..CacheConfig::default()
        };
        let cache = QueryCache::new(source.clone(), config);
        let sub = cache.subscribe(key(&[Filter::Mining]));

        sleep(ms(2_000)).await;
        let snap = sub.snapshot();
        assert_eq!(source.calls(), 3);
        assert_eq!(snap.status, QueryStatus::Success);
        assert!(snap.error.is_none());
        assert_eq!(names(snap.sites()), ["third-0"]);
    }

    #[tokio::test(start_paused = true)]
    async fn background_refetch_runs_only_while_subscribed() {
        let source = ScriptedSource::new(Vec::new());
        let cache = QueryCache::new(source.clone(), CacheConfig::default());
        let k = key(&[Filter::Mining]);

        let sub = cache.subscribe(k.clone());
        sleep(ms(95_000)).await;
        assert_eq!(source.calls(), 4);
        assert!(cache.is_refetch_scheduled(&k));

        drop(sub);
        assert!(!cache.is_refetch_scheduled(&k));
        sleep(ms(120_000)).await;
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn refetch_timer_is_reference_counted() {
        let source = ScriptedSource::new(Vec::new());
        let cache = QueryCache::new(source.clone(), CacheConfig::default());
        let k = key(&[Filter::Geological]);

        let a = cache.subscribe(k.clone());
        let b = cache.subscribe(k.clone());
        assert_eq!(cache.subscriber_count(&k), 2);

        drop(a);
        sleep(ms(31_000)).await;
        assert_eq!(source.calls(), 2);

        drop(b);
        assert_eq!(cache.subscriber_count(&k), 0);
        sleep(ms(60_000)).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_interval_never_refetches() {
        let source = ScriptedSource::new(Vec::new());
        let config = CacheConfig {
            refetch_interval_ms: None,
            ..CacheConfig::default()
        };
        let cache = QueryCache::new(source.clone(), config);
        let k = key(&[Filter::Mining]);
        let _sub = cache.subscribe(k.clone());

        sleep(ms(120_000)).await;
        assert_eq!(source.calls(), 1);
        assert!(!cache.is_refetch_scheduled(&k));
    }

    #[tokio::test(start_paused = true)]
    async fn invalidating_unknown_key_is_a_no_op() {
        let cache = QueryCache::new(ScriptedSource::new(Vec::new()), CacheConfig::default());
        assert!(cache.invalidate(&key(&[Filter::Mining])).is_none());
        assert!(cache.is_empty());
    }
}
