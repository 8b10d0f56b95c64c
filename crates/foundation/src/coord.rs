use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Geographic position in WGS84 degrees.
///
/// Equality and hashing compare canonical bit patterns, so `-0.0 == 0.0`
/// and positions can key hash maps directly.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    /// Builds a position, clamping latitude to [-90, 90] and wrapping
    /// longitude into [-180, 180].
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            lng: wrap_lng(lng),
            lat: lat.clamp(-90.0, 90.0),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.lng.is_finite() && self.lat.is_finite()
    }

    /// Rounds both axes to `decimals` places.
    pub fn rounded(self, decimals: i32) -> Self {
        Self::new(round_to(self.lng, decimals), round_to(self.lat, decimals))
    }
}

impl PartialEq for LngLat {
    fn eq(&self, other: &Self) -> bool {
        canonical_bits(self.lng) == canonical_bits(other.lng)
            && canonical_bits(self.lat) == canonical_bits(other.lat)
    }
}

impl Eq for LngLat {}

impl Hash for LngLat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        canonical_bits(self.lng).hash(state);
        canonical_bits(self.lat).hash(state);
    }
}

impl std::fmt::Display for LngLat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}°, {:.2}°", self.lat, self.lng)
    }
}

/// Bit pattern used for numeric equality of coordinates.
pub fn canonical_bits(v: f64) -> u64 {
    if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
}

pub fn wrap_lng(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) || !lng.is_finite() {
        return lng;
    }
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

pub fn round_to(v: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (v * scale).round() / scale
}
