use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::coord::{LngLat, canonical_bits, round_to};

/// Geographic bounding box in WGS84 degrees.
///
/// Invariant: `north > south` and `east > west`, all finite. Boxes that
/// straddle the antimeridian are not representable.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawBounds")]
pub struct Bounds {
    north: f64,
    south: f64,
    east: f64,
    west: f64,
}

#[derive(Deserialize)]
struct RawBounds {
    north: f64,
    south: f64,
    east: f64,
    west: f64,
}

impl TryFrom<RawBounds> for Bounds {
    type Error = String;

    fn try_from(raw: RawBounds) -> Result<Self, Self::Error> {
        Bounds::new(raw.north, raw.south, raw.east, raw.west).ok_or_else(|| {
            format!(
                "invalid bounds: north={} south={} east={} west={}",
                raw.north, raw.south, raw.east, raw.west
            )
        })
    }
}

impl Bounds {
    /// Returns `None` unless `north > south`, `east > west` and every edge is finite.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Option<Self> {
        let finite = [north, south, east, west].iter().all(|v| v.is_finite());
        if !finite || north <= south || east <= west {
            return None;
        }
        Some(Self {
            north,
            south,
            east,
            west,
        })
    }

    pub fn north(&self) -> f64 {
        self.north
    }

    pub fn south(&self) -> f64 {
        self.south
    }

    pub fn east(&self) -> f64 {
        self.east
    }

    pub fn west(&self) -> f64 {
        self.west
    }

    pub fn lat_range(&self) -> f64 {
        self.north - self.south
    }

    pub fn lng_range(&self) -> f64 {
        self.east - self.west
    }

    /// Area in square degrees (not a geodesic area).
    pub fn area_deg2(&self) -> f64 {
        self.lat_range() * self.lng_range()
    }

    pub fn center(&self) -> LngLat {
        LngLat::new(
            (self.east + self.west) * 0.5,
            (self.north + self.south) * 0.5,
        )
    }

    pub fn contains(&self, p: LngLat) -> bool {
        p.lat >= self.south && p.lat <= self.north && p.lng >= self.west && p.lng <= self.east
    }

    /// Rounds every edge; returns `None` if rounding collapses the box.
    pub fn rounded(&self, decimals: i32) -> Option<Self> {
        Self::new(
            round_to(self.north, decimals),
            round_to(self.south, decimals),
            round_to(self.east, decimals),
            round_to(self.west, decimals),
        )
    }

    fn bits(&self) -> [u64; 4] {
        [
            canonical_bits(self.north),
            canonical_bits(self.south),
            canonical_bits(self.east),
            canonical_bits(self.west),
        ]
    }
}

impl PartialEq for Bounds {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for Bounds {}

impl Hash for Bounds {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::Bounds;
    use crate::coord::LngLat;

    #[test]
    fn rejects_inverted_or_degenerate_boxes() {
        assert!(Bounds::new(1.0, -1.0, 1.0, -1.0).is_some());
        assert!(Bounds::new(-1.0, 1.0, 1.0, -1.0).is_none());
        assert!(Bounds::new(1.0, 1.0, 1.0, -1.0).is_none());
        assert!(Bounds::new(1.0, -1.0, -1.0, 1.0).is_none());
        assert!(Bounds::new(f64::NAN, -1.0, 1.0, -1.0).is_none());
    }

    #[test]
    fn ranges_area_and_center() {
        let b = Bounds::new(10.0, -2.0, 30.0, 20.0).unwrap();
        assert_eq!(b.lat_range(), 12.0);
        assert_eq!(b.lng_range(), 10.0);
        assert_eq!(b.area_deg2(), 120.0);
        assert_eq!(b.center(), LngLat::new(25.0, 4.0));
        assert!(b.contains(LngLat::new(25.0, 0.0)));
        assert!(!b.contains(LngLat::new(35.0, 0.0)));
    }

    #[test]
    fn deserialization_enforces_invariant() {
        let ok: Result<Bounds, _> =
            serde_json::from_str(r#"{"north":1,"south":-1,"east":1,"west":-1}"#);
        assert!(ok.is_ok());
        let bad: Result<Bounds, _> =
            serde_json::from_str(r#"{"north":-1,"south":1,"east":1,"west":-1}"#);
        assert!(bad.is_err());
    }
}
