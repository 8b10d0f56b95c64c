use sites::SiteSource;
use tracing::debug;

use crate::cache::{QueryCache, Subscription, SubscriptionClosed};
use crate::key::QueryKey;
use crate::request::Request;
use crate::snapshot::QuerySnapshot;

/// Follows one "current" key of a [`QueryCache`].
///
/// Changing the key subscribes to the new key before releasing the old
/// one. The observer only ever reads the current key's entry, so a fetch
/// for a superseded key can finish and fill its own entry but never shows
/// up here.
pub struct QueryObserver<S: SiteSource + 'static> {
    cache: QueryCache<S>,
    current: Subscription<S>,
}

impl<S: SiteSource + 'static> QueryObserver<S> {
    pub fn new(cache: QueryCache<S>, key: QueryKey) -> Self {
        let current = cache.subscribe(key);
        Self { cache, current }
    }

    pub fn key(&self) -> &QueryKey {
        self.current.key()
    }

    /// Switches to `key`. Returns `false` if it equals the current key.
    pub fn set_key(&mut self, key: QueryKey) -> bool {
        if *self.current.key() == key {
            return false;
        }
        debug!(from = %self.current.key(), to = %key, "query key changed");
        let next = self.cache.subscribe(key);
        drop(std::mem::replace(&mut self.current, next));
        true
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        self.current.snapshot()
    }

    /// Waits for the next publish of the current key.
    pub async fn changed(&mut self) -> Result<(), SubscriptionClosed> {
        self.current.changed().await
    }

    /// Forces a refetch of the current key.
    pub fn refetch(&self) -> Option<Request> {
        self.cache.invalidate(self.current.key())
    }
}

#[cfg(test)]
mod tests {
    use super::QueryObserver;
    use crate::cache::QueryCache;
    use crate::config::CacheConfig;
    use crate::key::QueryKey;
    use crate::testing::{ScriptedSource, Step, batch, names};
    use sites::Filter;
    use std::time::Duration;
    use tokio::time::sleep;

    fn key(filters: &[Filter]) -> QueryKey {
        QueryKey::sites(None, filters.iter().copied().collect(), None)
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[tokio::test(start_paused = true)]
    async fn same_key_is_a_no_op() {
        let source = ScriptedSource::new(vec![Step::ok(ms(50), batch("a", 2))]);
        let cache = QueryCache::new(source.clone(), CacheConfig::default());
        let mut observer = QueryObserver::new(cache.clone(), key(&[Filter::Mining]));

        assert!(!observer.set_key(key(&[Filter::Mining])));
        sleep(ms(100)).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(cache.subscriber_count(observer.key()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_keys_releases_the_old_one() {
        let source = ScriptedSource::new(vec![
            Step::ok(ms(50), batch("a", 2)),
            Step::ok(ms(50), batch("b", 3)),
        ]);
        let cache = QueryCache::new(source.clone(), CacheConfig::default());
        let a = key(&[Filter::Mining]);
        let b = key(&[Filter::Seismic]);
        let mut observer = QueryObserver::new(cache.clone(), a.clone());
        sleep(ms(100)).await;

        assert!(observer.set_key(b.clone()));
        assert_eq!(cache.subscriber_count(&a), 0);
        assert_eq!(cache.subscriber_count(&b), 1);
        assert!(!cache.is_refetch_scheduled(&a));
        assert!(observer.snapshot().is_loading);

        sleep(ms(100)).await;
        assert_eq!(names(observer.snapshot().sites()), ["b-0", "b-1", "b-2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn late_result_for_previous_key_is_not_shown() {
        let source = ScriptedSource::new(vec![
            Step::ok(ms(2_000), batch("a", 5)),
            Step::ok(ms(100), batch("b", 2)),
        ]);
        let cache = QueryCache::new(source.clone(), CacheConfig::default());
        let a = key(&[Filter::Mining]);
        let b = key(&[Filter::Geological]);

        let mut observer = QueryObserver::new(cache.clone(), a.clone());
        sleep(ms(10)).await;
        observer.set_key(b.clone());
        sleep(ms(300)).await;

        let before = observer.snapshot();
        assert_eq!(names(before.sites()), ["b-0", "b-1"]);

        sleep(ms(2_000)).await;
        let after = observer.snapshot();
        assert_eq!(after, before);
        assert_eq!(cache.snapshot(&a).unwrap().sites().len(), 5);
        assert_eq!(cache.snapshot(&b).unwrap().sites().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn changed_wakes_on_commit() {
        let source = ScriptedSource::new(vec![Step::ok(ms(800), batch("a", 1))]);
        let cache = QueryCache::new(source, CacheConfig::default());
        let mut observer = QueryObserver::new(cache, key(&[Filter::Mining]));

        while !observer.snapshot().has_data() {
            observer.changed().await.unwrap();
        }
        assert_eq!(names(observer.snapshot().sites()), ["a-0"]);
    }

    #[tokio::test(start_paused = true)]
    async fn refetch_forces_a_new_fetch() {
        let source = ScriptedSource::new(vec![
            Step::ok(ms(10), batch("a", 1)),
            Step::ok(ms(10), batch("b", 1)),
        ]);
        let cache = QueryCache::new(source.clone(), CacheConfig::default());
        let observer = QueryObserver::new(cache, key(&[Filter::Mining]));
        sleep(ms(50)).await;

        assert!(observer.refetch().is_some());
        sleep(ms(50)).await;
        assert_eq!(source.calls(), 2);
        assert_eq!(names(observer.snapshot().sites()), ["b-0"]);
    }
}
