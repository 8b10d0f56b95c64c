use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::coord::{LngLat, round_to};

/// Web map tile edge in pixels.
pub const TILE_SIZE_PX: f64 = 256.0;

/// Decimal places kept by [`Viewport::canonical`] (~0.1 m at the equator).
pub const CANONICAL_DECIMALS: i32 = 6;

/// Camera state of a map surface.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: LngLat,
    pub bounds: Option<Bounds>,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(center: LngLat, bounds: Option<Bounds>, zoom: f64) -> Self {
        Self {
            center,
            bounds,
            zoom,
        }
    }

    /// Derives the visible box of a `width_px` × `height_px` canvas centered
    /// on `center` at `zoom`, using a plate-carrée approximation of the
    /// 256 px tile pyramid. The box is clipped to the globe.
    pub fn from_camera(center: LngLat, zoom: f64, width_px: u32, height_px: u32) -> Self {
        let world_px = TILE_SIZE_PX * 2f64.powf(zoom);
        let half_lng = 180.0 * f64::from(width_px) / world_px;
        let half_lat = 90.0 * f64::from(height_px) / world_px;

        let bounds = Bounds::new(
            (center.lat + half_lat).min(90.0),
            (center.lat - half_lat).max(-90.0),
            (center.lng + half_lng).min(180.0),
            (center.lng - half_lng).max(-180.0),
        );

        Self {
            center,
            bounds,
            zoom,
        }
    }

    /// Rounds the camera so that equal gestures always produce equal values.
    pub fn canonical(&self) -> Self {
        Self {
            center: self.center.rounded(CANONICAL_DECIMALS),
            bounds: self
                .bounds
                .and_then(|b| b.rounded(CANONICAL_DECIMALS).or(Some(b))),
            zoom: round_to(self.zoom, 3),
        }
    }
}
