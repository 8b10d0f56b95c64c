use foundation::{Bounds, LngLat, Viewport};
use sites::{FilterSet, SiteRecord};
use streaming::QueryKey;
use tracing::debug;

/// Selection plus the inputs of the current query key.
///
/// Camera moves requested by a selection are queued as a target and taken
/// by whoever owns the map surface; the bridge never touches the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Bridge {
    selected: Option<String>,
    center: Option<LngLat>,
    filters: FilterSet,
    bounds: Option<Bounds>,
    camera_target: Option<LngLat>,
}

impl Bridge {
    pub fn new(center: LngLat, filters: FilterSet) -> Self {
        Self {
            selected: None,
            center: Some(center),
            filters,
            bounds: None,
            camera_target: None,
        }
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn center(&self) -> Option<LngLat> {
        self.center
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn query_key(&self) -> QueryKey {
        QueryKey::sites(self.center, self.filters.clone(), self.bounds)
    }

    /// Selects `site` and asks the map to center on it. The query key is
    /// left alone, so selecting never triggers a fetch.
    pub fn select_site(&mut self, site: &SiteRecord) {
        debug!(id = %site.id, "site selected");
        self.selected = Some(site.id.clone());
        self.camera_target = Some(site.coordinates);
    }

    pub fn clear_selection(&mut self) -> bool {
        self.selected.take().is_some()
    }

    /// Returns `true` if the key changed.
    pub fn set_filters(&mut self, filters: FilterSet) -> bool {
        if self.filters == filters {
            return false;
        }
        debug!(from = %self.filters, to = %filters, "filters changed");
        self.filters = filters;
        true
    }

    /// Takes the center and bounds of a user-settled viewport. Returns
    /// `true` if the key changed.
    pub fn on_viewport_settle(&mut self, viewport: Viewport) -> bool {
        let center = Some(viewport.center);
        if self.center == center && self.bounds == viewport.bounds {
            return false;
        }
        self.center = center;
        self.bounds = viewport.bounds;
        true
    }

    /// Clears the selection if `sites` no longer contains it. Returns `true`
    /// if it was cleared.
    pub fn reconcile_selection(&mut self, sites: &[SiteRecord]) -> bool {
        let Some(id) = self.selected.as_deref() else {
            return false;
        };
        if sites.iter().any(|s| s.id == id) {
            return false;
        }
        debug!(id, "selected site no longer listed");
        self.selected = None;
        true
    }

    pub fn camera_target(&self) -> Option<LngLat> {
        self.camera_target
    }

    /// Asks the map to center on `target` without selecting anything. The
    /// query key is left alone; a fetch only follows if the user then pans.
    pub fn set_camera_target(&mut self, target: LngLat) {
        debug!(%target, "camera target set");
        self.camera_target = Some(target);
    }

    /// Pending recenter request; returned once.
    pub fn take_camera_target(&mut self) -> Option<LngLat> {
        self.camera_target.take()
    }
}

#[cfg(test)]
mod tests {
    use super::Bridge;
    use foundation::{Bounds, LngLat, TimestampMs, Viewport};
    use sites::{Filter, FilterSet, GenerationConfig, SiteGenerator, SiteQuery, SiteRecord};
    use streaming::QueryKey;

    fn filters(list: &[Filter]) -> FilterSet {
        list.iter().copied().collect()
    }

    fn bridge() -> Bridge {
        Bridge::new(
            LngLat::new(0.0, 20.0),
            filters(&[Filter::Mining, Filter::Geological]),
        )
    }

    fn geological() -> Vec<SiteRecord> {
        let mut generator = SiteGenerator::with_seed(GenerationConfig::default(), 3);
        let query = SiteQuery::new(None, filters(&[Filter::Geological]), None);
        generator.generate(&query, TimestampMs(1_000_000_000))
    }

    #[test]
    fn selecting_targets_camera_without_touching_key() {
        let mut bridge = bridge();
        let key = bridge.query_key();
        let sites = geological();

        bridge.select_site(&sites[2]);
        assert_eq!(bridge.selected_id(), Some("geological-2"));
        assert_eq!(bridge.query_key(), key);
        assert_eq!(bridge.take_camera_target(), Some(sites[2].coordinates));
        assert_eq!(bridge.take_camera_target(), None);
    }

    #[test]
    fn camera_target_leaves_selection_and_key() {
        let mut bridge = bridge();
        let sites = geological();
        bridge.select_site(&sites[0]);
        bridge.take_camera_target();
        let key = bridge.query_key();

        let target = LngLat::new(-73.9, 40.7);
        bridge.set_camera_target(target);
        assert_eq!(bridge.camera_target(), Some(target));
        assert_eq!(bridge.selected_id(), Some("geological-0"));
        assert_eq!(bridge.query_key(), key);
        assert_eq!(bridge.take_camera_target(), Some(target));
        assert_eq!(bridge.camera_target(), None);
    }

    #[test]
    fn settle_updates_center_and_bounds() {
        let mut bridge = bridge();
        let bounds = Bounds::new(10.0, 0.0, 20.0, 0.0);
        let viewport = Viewport::new(LngLat::new(10.0, 5.0), bounds, 6.0);

        assert!(bridge.on_viewport_settle(viewport));
        assert!(!bridge.on_viewport_settle(viewport));
        assert_eq!(
            bridge.query_key(),
            QueryKey::sites(
                Some(LngLat::new(10.0, 5.0)),
                filters(&[Filter::Geological, Filter::Mining]),
                bounds,
            )
        );
    }

    #[test]
    fn unchanged_filters_keep_key() {
        let mut bridge = bridge();
        assert!(!bridge.set_filters(filters(&[Filter::Geological, Filter::Mining])));
        assert!(bridge.set_filters(filters(&[Filter::Seismic])));
        assert_eq!(bridge.filters(), &filters(&[Filter::Seismic]));
    }

    #[test]
    fn selection_missing_from_new_data_is_cleared() {
        let mut bridge = bridge();
        let sites = geological();
        bridge.select_site(&sites[0]);

        assert!(!bridge.reconcile_selection(&sites));
        assert_eq!(bridge.selected_id(), Some("geological-0"));

        assert!(bridge.reconcile_selection(&sites[1..]));
        assert_eq!(bridge.selected_id(), None);
        assert!(!bridge.reconcile_selection(&[]));
    }
}
