use std::sync::Arc;

use foundation::{LngLat, Viewport};
use sites::{Filter, FilterSet, SiteRecord, SiteSource};
use streaming::{QueryCache, QueryKey, QueryObserver, QuerySnapshot, Request, SubscriptionClosed};
use surface::{ControllerEvent, MapSurface, MapSurfaceController, TileLayer};
use tracing::{debug, info};

use crate::bridge::Bridge;
use crate::search::filter_sites;
use crate::stats::SiteStats;

/// What the markers on the surface were last drawn from.
#[derive(Debug)]
struct Rendered {
    key: QueryKey,
    data: Option<Arc<[SiteRecord]>>,
    selected: Option<String>,
    search: String,
}

impl Rendered {
    fn is_current(
        &self,
        key: &QueryKey,
        snapshot: &QuerySnapshot,
        selected: Option<&str>,
        search: &str,
    ) -> bool {
        let same_data = match (&self.data, &snapshot.data) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_data
            && self.key == *key
            && self.selected.as_deref() == selected
            && self.search == search
    }
}

/// One explorer view: a query observer, the bridge and the map controller.
///
/// Input flows one way. Surface events and UI calls update the [`Bridge`],
/// the bridge's key drives the observer, and [`Session::sync`] pushes the
/// observer's data and the selection back onto the map. Dropping the
/// session tears the surface down and releases the cache subscription.
pub struct Session<S: SiteSource + 'static, M: MapSurface> {
    observer: QueryObserver<S>,
    bridge: Bridge,
    controller: MapSurfaceController<M>,
    search: String,
    rendered: Option<Rendered>,
    last_settled: Option<Viewport>,
}

impl<S: SiteSource + 'static, M: MapSurface> Session<S, M> {
    pub fn new(cache: QueryCache<S>, surface: M, center: LngLat, filters: FilterSet) -> Self {
        Self::with_layer(cache, surface, center, filters, TileLayer::default())
    }

    pub fn with_layer(
        cache: QueryCache<S>,
        surface: M,
        center: LngLat,
        filters: FilterSet,
        base: TileLayer,
    ) -> Self {
        let bridge = Bridge::new(center, filters);
        let observer = QueryObserver::new(cache, bridge.query_key());
        let controller = MapSurfaceController::with_layer(surface, center, base);
        info!(key = %bridge.query_key(), "session started");

        let mut session = Self {
            observer,
            bridge,
            controller,
            search: String::new(),
            rendered: None,
            last_settled: None,
        };
        session.sync();
        session
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn controller(&self) -> &MapSurfaceController<M> {
        &self.controller
    }

    pub fn key(&self) -> &QueryKey {
        self.observer.key()
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        self.observer.snapshot()
    }

    pub fn viewport(&self) -> Viewport {
        self.controller.viewport()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// The last viewport the user settled on, for readouts. Programmatic
    /// moves never land here.
    pub fn last_settled(&self) -> Option<Viewport> {
        self.last_settled
    }

    /// The selected record, if it is in the current data.
    pub fn selected(&self) -> Option<SiteRecord> {
        let id = self.bridge.selected_id()?;
        self.snapshot().sites().iter().find(|s| s.id == id).cloned()
    }

    /// Routes pending surface events, then syncs. Returns how many events
    /// were handled.
    pub fn pump(&mut self) -> usize {
        let events = self.controller.poll();
        let handled = events.len();
        for event in events {
            match event {
                ControllerEvent::ViewportSettled(viewport) => {
                    self.last_settled = Some(viewport);
                    if self.bridge.on_viewport_settle(viewport) {
                        self.apply_key();
                    }
                }
                ControllerEvent::SiteSelected(site) => self.bridge.select_site(&site),
            }
        }
        self.sync();
        handled
    }

    /// Brings the map in line with the bridge and the current data.
    ///
    /// Applies a pending camera target, drops a selection that the latest
    /// data no longer contains and redraws markers if the data, selection
    /// or search changed. Returns `true` if markers were redrawn.
    pub fn sync(&mut self) -> bool {
        if let Some(target) = self.bridge.take_camera_target() {
            self.controller.recenter(target);
        }

        let snapshot = self.observer.snapshot();
        if snapshot.has_data() {
            self.bridge.reconcile_selection(snapshot.sites());
        }

        let key = self.observer.key();
        let selected = self.bridge.selected_id();
        if self
            .rendered
            .as_ref()
            .is_some_and(|r| r.is_current(key, &snapshot, selected, &self.search))
        {
            return false;
        }

        let visible = filter_sites(snapshot.sites(), &self.search);
        self.controller.render(&visible, selected);
        self.rendered = Some(Rendered {
            key: key.clone(),
            data: snapshot.data.clone(),
            selected: selected.map(str::to_string),
            search: self.search.clone(),
        });
        true
    }

    /// List-side selection. Returns `false` if `id` is not in the current
    /// data.
    pub fn select_site_by_id(&mut self, id: &str) -> bool {
        let snapshot = self.observer.snapshot();
        let Some(site) = snapshot.sites().iter().find(|s| s.id == id) else {
            debug!(id, "selection of unknown site ignored");
            return false;
        };
        self.bridge.select_site(site);
        self.sync();
        true
    }

    /// Centers the map on `target` at the current zoom. Selection and query
    /// key are untouched.
    pub fn recenter(&mut self, target: LngLat) {
        self.bridge.set_camera_target(target);
        self.sync();
    }

    pub fn clear_selection(&mut self) {
        if self.bridge.clear_selection() {
            self.sync();
        }
    }

    /// Returns `true` if the query key changed.
    pub fn set_filters(&mut self, filters: FilterSet) -> bool {
        if !self.bridge.set_filters(filters) {
            return false;
        }
        self.apply_key();
        self.sync();
        true
    }

    /// Turns one filter on or off.
    pub fn toggle_filter(&mut self, filter: Filter, on: bool) -> bool {
        let mut filters = self.bridge.filters().clone();
        let changed = if on {
            filters.insert(filter)
        } else {
            filters.remove(filter)
        };
        changed && self.set_filters(filters)
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
        self.sync();
    }

    /// Current data narrowed by the search text.
    pub fn visible_sites(&self) -> Vec<SiteRecord> {
        filter_sites(self.snapshot().sites(), &self.search)
    }

    pub fn stats(&self) -> SiteStats {
        SiteStats::collect(&self.visible_sites())
    }

    /// Forces a refetch of the current key.
    pub fn refresh(&self) -> Option<Request> {
        self.observer.refetch()
    }

    /// Waits until the current key publishes, then syncs.
    pub async fn next_update(&mut self) -> Result<(), SubscriptionClosed> {
        self.observer.changed().await?;
        self.sync();
        Ok(())
    }

    /// Waits until no fetch is in flight for the current key.
    pub async fn settle(&mut self) -> Result<(), SubscriptionClosed> {
        while self.snapshot().is_fetching {
            self.next_update().await?;
        }
        self.sync();
        Ok(())
    }

    fn apply_key(&mut self) {
        let key = self.bridge.query_key();
        if self.observer.set_key(key) {
            info!(key = %self.observer.key(), "query key updated");
        }
    }
}
