use foundation::{Bounds, LngLat, TimestampMs};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::category::{Category, SiteStatus};
use crate::query::SiteQuery;
use crate::record::{
    AirQuality, Alert, Environmental, GeologicalDetails, GeologicalProfile, MiningDetails,
    RiskLevel, SeismicDetails, Severity, SiteDetails, SiteRecord,
};

const HOUR_MS: u64 = 3_600_000;

const MINING_TYPES: [&str; 7] = [
    "gold", "copper", "iron", "coal", "diamond", "silver", "platinum",
];
const MINING_ROCKS: [&str; 3] = ["Igneous", "Sedimentary", "Metamorphic"];
const MINING_FORMATIONS: [&str; 4] = ["Precambrian", "Paleozoic", "Mesozoic", "Cenozoic"];
const GEOLOGICAL_ROCKS: [&str; 4] = ["Granite", "Limestone", "Sandstone", "Shale"];
const GEOLOGICAL_FORMATIONS: [&str; 3] = ["Precambrian", "Paleozoic", "Mesozoic"];

/// Fallback region center (lng, lat) when a query carries neither bounds
/// nor a center.
pub const DEFAULT_CENTER: LngLat = LngLat { lng: 0.0, lat: 20.0 };

/// Per-category volume when the query carries viewport bounds:
/// `clamp(min, max, floor(lat_range * lng_range * density))`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumePolicy {
    pub min: usize,
    pub max: usize,
    pub density: f64,
}

impl VolumePolicy {
    pub const fn new(min: usize, max: usize, density: f64) -> Self {
        Self { min, max, density }
    }

    pub fn count_for(&self, bounds: &Bounds) -> usize {
        let raw = (bounds.area_deg2() * self.density).floor();
        // `as` saturates; NaN and negatives land on 0 and are lifted by `min`.
        let raw = if raw > 0.0 { raw as usize } else { 0 };
        raw.max(self.min).min(self.max)
    }
}

/// Fixed per-category counts used when the query has no bounds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnboundedCounts {
    pub mining: usize,
    pub geological: usize,
    pub seismic: usize,
}

/// Degrees of latitude/longitude sites are scattered over.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Simulated fetch latency.
    pub latency_ms: u64,
    /// Probability that a simulated fetch fails outright.
    pub failure_probability: f64,
    pub unbounded: UnboundedCounts,
    pub mining: VolumePolicy,
    pub geological: VolumePolicy,
    pub seismic: VolumePolicy,
    /// Scatter span used when the query has no bounds.
    pub default_span: Span,
    /// Seismic stations cluster tighter than other sites.
    pub seismic_spread: f64,
    pub mining_alert_probability: f64,
    pub seismic_alert_probability: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            latency_ms: 800,
            failure_probability: 0.0,
            unbounded: UnboundedCounts {
                mining: 25,
                geological: 15,
                seismic: 8,
            },
            mining: VolumePolicy::new(15, 50, 0.5),
            geological: VolumePolicy::new(8, 30, 0.3),
            seismic: VolumePolicy::new(3, 15, 0.2),
            default_span: Span {
                lat: 20.0,
                lng: 40.0,
            },
            seismic_spread: 0.8,
            mining_alert_probability: 0.2,
            seismic_alert_probability: 0.4,
        }
    }
}

impl GenerationConfig {
    pub fn volume(&self, category: Category) -> &VolumePolicy {
        match category {
            Category::Mining => &self.mining,
            Category::Geological => &self.geological,
            Category::Seismic => &self.seismic,
        }
    }

    pub fn unbounded_count(&self, category: Category) -> usize {
        match category {
            Category::Mining => self.unbounded.mining,
            Category::Geological => self.unbounded.geological,
            Category::Seismic => self.unbounded.seismic,
        }
    }
}

/// Area records are scattered over for one query.
#[derive(Debug, Copy, Clone, PartialEq)]
struct Region {
    center: LngLat,
    span: Span,
}

impl Region {
    fn resolve(query: &SiteQuery, config: &GenerationConfig) -> Self {
        match query.bounds {
            Some(b) => Self {
                center: b.center(),
                span: Span {
                    lat: b.lat_range(),
                    lng: b.lng_range(),
                },
            },
            None => Self {
                center: query.center.unwrap_or(DEFAULT_CENTER),
                span: config.default_span,
            },
        }
    }
}

/// Synthesizes site records for a query.
///
/// Output depends only on the query, `now` and the random source. Ids are
/// `{category}-{index}` where `index` is the loop counter, so they are unique
/// within one batch.
#[derive(Debug)]
pub struct SiteGenerator {
    config: GenerationConfig,
    rng: fastrand::Rng,
}

impl SiteGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            config,
            rng: fastrand::Rng::new(),
        }
    }

    pub fn with_seed(config: GenerationConfig, seed: u64) -> Self {
        Self {
            config,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Number of records of `category` a query with `bounds` produces.
    pub fn count_for(&self, category: Category, bounds: Option<&Bounds>) -> usize {
        match bounds {
            Some(b) => self.config.volume(category).count_for(b),
            None => self.config.unbounded_count(category),
        }
    }

    /// Rolls the simulated upstream failure.
    pub fn roll_failure(&mut self) -> bool {
        self.config.failure_probability > 0.0 && self.rng.f64() < self.config.failure_probability
    }

    pub fn generate(&mut self, query: &SiteQuery, now: TimestampMs) -> Vec<SiteRecord> {
        let region = Region::resolve(query, &self.config);
        let mut sites = Vec::new();

        for category in Category::ALL {
            if !query.filters.includes(category) {
                continue;
            }
            let count = self.count_for(category, query.bounds.as_ref());
            sites.reserve(count);
            for index in 0..count {
                let site = match category {
                    Category::Mining => self.mining_site(index, &region, now),
                    Category::Geological => self.geological_site(index, &region, now),
                    Category::Seismic => self.seismic_site(index, &region, now),
                };
                sites.push(site);
            }
        }

        debug!(query = %query, count = sites.len(), "generated site batch");
        sites
    }

    fn scatter(&mut self, region: &Region, spread: f64) -> LngLat {
        let lng = region.center.lng + (self.rng.f64() - 0.5) * region.span.lng * spread;
        let lat = region.center.lat + (self.rng.f64() - 0.5) * region.span.lat * spread;
        LngLat::new(lng, lat)
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.rng.usize(0..items.len())]
    }

    fn risk(&mut self, levels: &[RiskLevel]) -> RiskLevel {
        levels[self.rng.usize(0..levels.len())]
    }

    fn mining_site(&mut self, index: usize, region: &Region, now: TimestampMs) -> SiteRecord {
        let kind = self.pick(&MINING_TYPES);
        let coordinates = self.scatter(region, 1.0);
        let status = if self.rng.f64() >= 0.3 {
            SiteStatus::Active
        } else {
            SiteStatus::Inactive
        };
        let air_quality = [AirQuality::Good, AirQuality::Moderate, AirQuality::Poor]
            [self.rng.usize(0..3)];
        let alerts = if self.rng.f64() < self.config.mining_alert_probability {
            vec![
                Alert::new("Equipment maintenance scheduled", Severity::Info),
                Alert::new("Weather alert: Heavy rainfall expected", Severity::Warning),
            ]
        } else {
            Vec::new()
        };

        SiteRecord {
            id: format!("mining-{index}"),
            name: format!("{} Mine {}", capitalize(kind), index + 1),
            site_type: kind.to_string(),
            coordinates,
            status,
            distance_km: f64::from(self.rng.u32(10..510)),
            last_updated: now.saturating_sub_ms(self.rng.u64(0..24 * HOUR_MS)),
            details: SiteDetails::Mining(MiningDetails {
                depth_m: self.rng.u32(50..850),
                production: format!("{} tons/day", self.rng.u32(100..1100)),
                reserves: format!("{} tons", self.rng.u32(1000..11000)),
                elevation_m: self.rng.u32(100..2100),
                environmental: Environmental {
                    temperature_c: self.rng.i32(5..35),
                    humidity_pct: self.rng.u32(20..80),
                    air_quality,
                },
                geological: GeologicalProfile {
                    rock_type: Some(self.pick(&MINING_ROCKS).to_string()),
                    formation: Some(self.pick(&MINING_FORMATIONS).to_string()),
                    seismic_risk: self.risk(&[RiskLevel::Low, RiskLevel::Medium, RiskLevel::High]),
                },
                alerts,
            }),
        }
    }

    fn geological_site(&mut self, index: usize, region: &Region, now: TimestampMs) -> SiteRecord {
        let coordinates = self.scatter(region, 1.0);
        SiteRecord {
            id: format!("geological-{index}"),
            name: format!("Geological Formation {}", index + 1),
            site_type: Category::Geological.as_str().to_string(),
            coordinates,
            status: SiteStatus::Active,
            distance_km: f64::from(self.rng.u32(5..305)),
            last_updated: now.saturating_sub_ms(self.rng.u64(0..12 * HOUR_MS)),
            details: SiteDetails::Geological(GeologicalDetails {
                elevation_m: self.rng.u32(200..3200),
                geological: GeologicalProfile {
                    rock_type: Some(self.pick(&GEOLOGICAL_ROCKS).to_string()),
                    formation: Some(self.pick(&GEOLOGICAL_FORMATIONS).to_string()),
                    seismic_risk: self.risk(&[RiskLevel::Low, RiskLevel::Medium]),
                },
            }),
        }
    }

    fn seismic_site(&mut self, index: usize, region: &Region, now: TimestampMs) -> SiteRecord {
        let coordinates = self.scatter(region, self.config.seismic_spread);
        let magnitude = ((self.rng.f64() * 3.0 + 1.0) * 10.0).round() / 10.0;
        let alerts = if self.rng.f64() < self.config.seismic_alert_probability {
            vec![Alert::new("Minor seismic activity detected", Severity::Warning)]
        } else {
            Vec::new()
        };

        SiteRecord {
            id: format!("seismic-{index}"),
            name: format!("Seismic Station {}", index + 1),
            site_type: Category::Seismic.as_str().to_string(),
            coordinates,
            status: SiteStatus::Active,
            distance_km: f64::from(self.rng.u32(10..210)),
            last_updated: now.saturating_sub_ms(self.rng.u64(0..6 * HOUR_MS)),
            details: SiteDetails::Seismic(SeismicDetails {
                magnitude,
                depth_km: self.rng.u32(5..55),
                geological: GeologicalProfile {
                    rock_type: None,
                    formation: None,
                    seismic_risk: self.risk(&[RiskLevel::Medium, RiskLevel::High]),
                },
                alerts,
            }),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
