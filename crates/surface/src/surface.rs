use foundation::{LngLat, Viewport};
use serde::{Deserialize, Serialize};

use crate::symbology::MarkerSpec;

/// Surface-assigned marker handle. Never reused by one surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

impl std::fmt::Display for MarkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "marker#{}", self.0)
    }
}

/// Who moved the camera.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraOrigin {
    /// Pan or zoom gesture.
    User,
    /// A `set_view` call.
    Programmatic,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// Camera is moving; emitted continuously during a drag.
    Moving,
    /// Camera came to rest.
    MoveEnd {
        viewport: Viewport,
        origin: CameraOrigin,
    },
    MarkerClicked(MarkerId),
}

/// Raster background layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileLayer {
    pub url_template: String,
    pub attribution: String,
    pub max_zoom: u8,
}

impl TileLayer {
    pub fn open_street_map() -> Self {
        Self {
            url_template: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "© OpenStreetMap contributors".to_string(),
            max_zoom: 19,
        }
    }

    /// Satellite imagery; needs a public access token.
    pub fn mapbox_satellite(token: &str) -> Self {
        Self {
            url_template: format!(
                "https://api.mapbox.com/styles/v1/mapbox/satellite-streets-v12/tiles/256/{{z}}/{{x}}/{{y}}?access_token={token}"
            ),
            attribution: "© Mapbox © OpenStreetMap contributors".to_string(),
            max_zoom: 22,
        }
    }
}

impl Default for TileLayer {
    fn default() -> Self {
        Self::open_street_map()
    }
}

/// Imperative map rendering context.
///
/// Implementations queue camera and marker events; the owner pulls them with
/// [`MapSurface::drain_events`]. A `set_view` call must be reported as a
/// [`CameraOrigin::Programmatic`] move so it can be told apart from user
/// gestures.
pub trait MapSurface {
    fn add_tile_layer(&mut self, layer: TileLayer);

    fn add_marker(&mut self, marker: MarkerSpec) -> MarkerId;

    /// Returns `false` if the marker was not on the surface.
    fn remove_marker(&mut self, id: MarkerId) -> bool;

    fn set_view(&mut self, center: LngLat, zoom: f64);

    fn camera(&self) -> Viewport;

    fn drain_events(&mut self) -> Vec<SurfaceEvent>;

    /// Releases the context. Later calls are ignored and no events are queued.
    fn destroy(&mut self);
}

impl<M: MapSurface + ?Sized> MapSurface for Box<M> {
    fn add_tile_layer(&mut self, layer: TileLayer) {
        (**self).add_tile_layer(layer)
    }

    fn add_marker(&mut self, marker: MarkerSpec) -> MarkerId {
        (**self).add_marker(marker)
    }

    fn remove_marker(&mut self, id: MarkerId) -> bool {
        (**self).remove_marker(id)
    }

    fn set_view(&mut self, center: LngLat, zoom: f64) {
        (**self).set_view(center, zoom)
    }

    fn camera(&self) -> Viewport {
        (**self).camera()
    }

    fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        (**self).drain_events()
    }

    fn destroy(&mut self) {
        (**self).destroy()
    }
}
