//! In-memory [`MapSurface`] that records every call.
//!
//! The surface hands out a [`SurfaceProbe`] sharing its state, so a test (or
//! the headless explorer) can keep observing and driving the map after the
//! surface itself has been moved into a controller.

use std::collections::BTreeMap;
use std::sync::Arc;

use foundation::{LngLat, Viewport};
use parking_lot::Mutex;
use tracing::debug;

use crate::surface::{CameraOrigin, MapSurface, MarkerId, SurfaceEvent, TileLayer};
use crate::symbology::MarkerSpec;

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    AddTileLayer(TileLayer),
    AddMarker { id: MarkerId, site_id: String },
    RemoveMarker(MarkerId),
    SetView { center: LngLat, zoom: f64 },
    Destroy,
}

#[derive(Debug)]
struct HeadlessState {
    width_px: u32,
    height_px: u32,
    center: LngLat,
    zoom: f64,
    layers: Vec<TileLayer>,
    markers: BTreeMap<MarkerId, MarkerSpec>,
    next_marker: u64,
    pending: Vec<SurfaceEvent>,
    calls: Vec<SurfaceCall>,
    destroyed: bool,
}

impl HeadlessState {
    fn viewport(&self) -> Viewport {
        Viewport::from_camera(self.center, self.zoom, self.width_px, self.height_px)
    }

    fn settle(&mut self, origin: CameraOrigin) {
        let viewport = self.viewport();
        self.pending.push(SurfaceEvent::MoveEnd { viewport, origin });
    }
}

pub struct HeadlessSurface {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessSurface {
    pub fn new(width_px: u32, height_px: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(HeadlessState {
                width_px,
                height_px,
                center: LngLat::new(0.0, 0.0),
                zoom: 0.0,
                layers: Vec::new(),
                markers: BTreeMap::new(),
                next_marker: 0,
                pending: Vec::new(),
                calls: Vec::new(),
                destroyed: false,
            })),
        }
    }

    pub fn probe(&self) -> SurfaceProbe {
        SurfaceProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new(1024, 768)
    }
}

impl MapSurface for HeadlessSurface {
    fn add_tile_layer(&mut self, layer: TileLayer) {
        let mut s = self.state.lock();
        if s.destroyed {
            return;
        }
        s.calls.push(SurfaceCall::AddTileLayer(layer.clone()));
        s.layers.push(layer);
    }

    fn add_marker(&mut self, marker: MarkerSpec) -> MarkerId {
        let mut s = self.state.lock();
        s.next_marker += 1;
        let id = MarkerId(s.next_marker);
        if s.destroyed {
            return id;
        }
        s.calls.push(SurfaceCall::AddMarker {
            id,
            site_id: marker.site_id.clone(),
        });
        s.markers.insert(id, marker);
        id
    }

    fn remove_marker(&mut self, id: MarkerId) -> bool {
        let mut s = self.state.lock();
        if s.markers.remove(&id).is_none() {
            return false;
        }
        s.calls.push(SurfaceCall::RemoveMarker(id));
        true
    }

    fn set_view(&mut self, center: LngLat, zoom: f64) {
        let mut s = self.state.lock();
        if s.destroyed {
            return;
        }
        s.center = center;
        s.zoom = zoom;
        s.calls.push(SurfaceCall::SetView { center, zoom });
        s.settle(CameraOrigin::Programmatic);
    }

    fn camera(&self) -> Viewport {
        self.state.lock().viewport()
    }

    fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.state.lock().pending)
    }

    fn destroy(&mut self) {
        let mut s = self.state.lock();
        if s.destroyed {
            return;
        }
        s.destroyed = true;
        s.markers.clear();
        s.pending.clear();
        s.calls.push(SurfaceCall::Destroy);
        debug!("headless surface destroyed");
    }
}

/// Observer and gesture driver for a [`HeadlessSurface`].
#[derive(Clone)]
pub struct SurfaceProbe {
    state: Arc<Mutex<HeadlessState>>,
}

impl SurfaceProbe {
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn set_view_calls(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, SurfaceCall::SetView { .. }))
            .count()
    }

    pub fn layers(&self) -> Vec<TileLayer> {
        self.state.lock().layers.clone()
    }

    /// Markers currently on the map, in creation order.
    pub fn markers(&self) -> Vec<MarkerSpec> {
        self.state.lock().markers.values().cloned().collect()
    }

    pub fn marker_for(&self, site_id: &str) -> Option<MarkerId> {
        let s = self.state.lock();
        s.markers
            .iter()
            .find(|(_, m)| m.site_id == site_id)
            .map(|(id, _)| *id)
    }

    pub fn camera(&self) -> Viewport {
        self.state.lock().viewport()
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    pub fn pending_events(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Drag gesture ending at `center`.
    pub fn pan_to(&self, center: LngLat) {
        let mut s = self.state.lock();
        if s.destroyed {
            return;
        }
        s.pending.push(SurfaceEvent::Moving);
        s.pending.push(SurfaceEvent::Moving);
        s.center = center;
        s.settle(CameraOrigin::User);
    }

    /// Wheel or pinch gesture ending at `zoom`.
    pub fn zoom_to(&self, zoom: f64) {
        let mut s = self.state.lock();
        if s.destroyed {
            return;
        }
        s.pending.push(SurfaceEvent::Moving);
        s.zoom = zoom;
        s.settle(CameraOrigin::User);
    }

    /// Clicks the marker drawn for `site_id`. Returns `false` if none is shown.
    pub fn click_site(&self, site_id: &str) -> bool {
        let Some(id) = self.marker_for(site_id) else {
            return false;
        };
        let mut s = self.state.lock();
        if s.destroyed {
            return false;
        }
        s.pending.push(SurfaceEvent::MarkerClicked(id));
        true
    }
}
