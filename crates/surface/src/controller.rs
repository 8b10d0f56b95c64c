use std::collections::BTreeMap;

use foundation::{LngLat, Viewport};
use sites::SiteRecord;
use tracing::{debug, info};

use crate::surface::{CameraOrigin, MapSurface, MarkerId, SurfaceEvent, TileLayer};
use crate::symbology::MarkerSpec;

/// Zoom the surface starts at.
pub const INITIAL_ZOOM: f64 = 4.0;

/// What the controller reports back to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// A user gesture came to rest; the viewport is canonicalized.
    ViewportSettled(Viewport),
    /// A marker was clicked.
    SiteSelected(SiteRecord),
}

/// Sole owner of one [`MapSurface`] for its whole lifetime.
///
/// The surface is set up once in [`MapSurfaceController::new`] and torn down
/// once on drop. Markers are rebuilt from scratch on every
/// [`render`](Self::render); camera moves made through
/// [`recenter`](Self::recenter) never surface as a settled viewport.
pub struct MapSurfaceController<M: MapSurface> {
    surface: M,
    markers: BTreeMap<MarkerId, SiteRecord>,
    renders: u64,
}

impl<M: MapSurface> MapSurfaceController<M> {
    pub fn new(surface: M, initial_center: LngLat) -> Self {
        Self::with_layer(surface, initial_center, TileLayer::default())
    }

    pub fn with_layer(mut surface: M, initial_center: LngLat, base: TileLayer) -> Self {
        info!(center = %initial_center, zoom = INITIAL_ZOOM, attribution = %base.attribution, "map surface created");
        surface.set_view(initial_center, INITIAL_ZOOM);
        surface.add_tile_layer(base);
        // The initial framing is not a user gesture.
        surface.drain_events();
        Self {
            surface,
            markers: BTreeMap::new(),
            renders: 0,
        }
    }

    pub fn surface(&self) -> &M {
        &self.surface
    }

    pub fn viewport(&self) -> Viewport {
        self.surface.camera()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn render_count(&self) -> u64 {
        self.renders
    }

    /// Replaces every marker with one per site; `selected` is drawn enlarged.
    pub fn render(&mut self, sites: &[SiteRecord], selected: Option<&str>) {
        self.clear_markers();
        for site in sites {
            let is_selected = selected == Some(site.id.as_str());
            let id = self
                .surface
                .add_marker(MarkerSpec::for_site(site, is_selected));
            self.markers.insert(id, site.clone());
        }
        self.renders += 1;
        debug!(markers = self.markers.len(), ?selected, render = self.renders, "markers rendered");
    }

    /// Moves the camera to `center` at the current zoom.
    pub fn recenter(&mut self, center: LngLat) {
        let zoom = self.surface.camera().zoom;
        debug!(%center, zoom, "recenter");
        self.surface.set_view(center, zoom);
    }

    /// Drains surface events into controller events.
    ///
    /// Drag progress and programmatic moves are dropped; clicks on markers
    /// that are no longer rendered are ignored.
    pub fn poll(&mut self) -> Vec<ControllerEvent> {
        let mut out = Vec::new();
        for event in self.surface.drain_events() {
            match event {
                SurfaceEvent::Moving => {}
                SurfaceEvent::MoveEnd {
                    viewport,
                    origin: CameraOrigin::User,
                } => {
                    out.push(ControllerEvent::ViewportSettled(viewport.canonical()));
                }
                SurfaceEvent::MoveEnd {
                    origin: CameraOrigin::Programmatic,
                    ..
                } => {
                    debug!("ignoring programmatic camera move");
                }
                SurfaceEvent::MarkerClicked(id) => match self.markers.get(&id) {
                    Some(site) => out.push(ControllerEvent::SiteSelected(site.clone())),
                    None => {
                        debug!(%id, "click on stale marker");
                    }
                },
            }
        }
        out
    }

    fn clear_markers(&mut self) {
        for (id, _) in std::mem::take(&mut self.markers) {
            self.surface.remove_marker(id);
        }
    }
}

impl<M: MapSurface> Drop for MapSurfaceController<M> {
    fn drop(&mut self) {
        self.clear_markers();
        self.surface.destroy();
        info!(renders = self.renders, "map surface destroyed");
    }
}
