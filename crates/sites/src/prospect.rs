use std::time::Duration;

use foundation::LngLat;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const MINERALS: [&str; 6] = ["gold", "copper", "iron", "coal", "silver", "diamond"];
const FACTORS: [&str; 4] = [
    "Favorable rock formations",
    "Historical mining activity",
    "Mineral-rich soil samples",
    "Geological surveys indicate potential",
];

/// Recommendations produced per city.
pub const PROSPECTS_PER_CITY: usize = 6;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Potential {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Potential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Potential::High => "High",
            Potential::Medium => "Medium",
            Potential::Low => "Low",
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Easy,
    Moderate,
    Difficult,
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Access::Easy => "Easy",
            Access::Moderate => "Moderate",
            Access::Difficult => "Difficult",
        })
    }
}

/// A mock mining opportunity near a searched city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prospect {
    pub id: String,
    pub name: String,
    pub mineral: String,
    pub coordinates: LngLat,
    pub distance_km: u32,
    pub potential: Potential,
    /// Percent, 70..=99.
    pub confidence: u8,
    pub geological_factor: String,
    /// Estimated value in millions of USD.
    pub estimated_value_musd: u32,
    pub access: Access,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProspectError {
    EmptyCity,
}

impl std::fmt::Display for ProspectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProspectError::EmptyCity => {
                write!(f, "enter a city name to search for mining opportunities")
            }
        }
    }
}

impl std::error::Error for ProspectError {}

/// City-based opportunity finder. There is no geocoder behind it: every
/// city lands somewhere in a fixed North American box and gets six
/// prospects scattered within a degree of that point, best confidence
/// first.
pub struct ProspectFinder {
    rng: fastrand::Rng,
    latency: Duration,
}

impl ProspectFinder {
    pub fn new(latency: Duration) -> Self {
        Self {
            rng: fastrand::Rng::new(),
            latency,
        }
    }

    pub fn with_seed(latency: Duration, seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            latency,
        }
    }

    /// Waits the simulated analysis latency, then recommends. A blank city
    /// fails at once.
    pub async fn search(&mut self, city: &str) -> Result<Vec<Prospect>, ProspectError> {
        if city.trim().is_empty() {
            return Err(ProspectError::EmptyCity);
        }
        tokio::time::sleep(self.latency).await;
        self.recommend(city)
    }

    pub fn recommend(&mut self, city: &str) -> Result<Vec<Prospect>, ProspectError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(ProspectError::EmptyCity);
        }

        let base_lat = 40.0 + self.rng.f64() * 20.0;
        let base_lng = -100.0 + self.rng.f64() * 40.0;
        debug!(city, base_lng, base_lat, "city placed");

        let mut prospects: Vec<Prospect> = (0..PROSPECTS_PER_CITY)
            .map(|i| self.prospect(i, base_lng, base_lat))
            .collect();
        prospects.sort_by(|a, b| b.confidence.cmp(&a.confidence));

        info!(city, count = prospects.len(), "prospects found");
        Ok(prospects)
    }

    fn prospect(&mut self, index: usize, base_lng: f64, base_lat: f64) -> Prospect {
        let mineral = MINERALS[index % MINERALS.len()];
        let coordinates = LngLat::new(
            base_lng + (self.rng.f64() - 0.5) * 2.0,
            base_lat + (self.rng.f64() - 0.5) * 2.0,
        );
        let potential = [Potential::High, Potential::Medium, Potential::Low][self.rng.usize(0..3)];
        let access = [Access::Easy, Access::Moderate, Access::Difficult][self.rng.usize(0..3)];
        Prospect {
            id: format!("rec-{index}"),
            name: format!("{} Prospect {}", capitalize(mineral), index + 1),
            mineral: mineral.to_string(),
            coordinates,
            distance_km: self.rng.u32(5..55),
            potential,
            confidence: self.rng.u8(70..100),
            geological_factor: FACTORS[self.rng.usize(0..FACTORS.len())].to_string(),
            estimated_value_musd: self.rng.u32(10..60),
            access,
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{MINERALS, PROSPECTS_PER_CITY, ProspectError, ProspectFinder};
    use std::collections::HashSet;
    use std::time::Duration;

    fn finder(seed: u64) -> ProspectFinder {
        ProspectFinder::with_seed(Duration::from_secs(2), seed)
    }

    #[test]
    fn recommends_six_prospects_best_first() {
        let prospects = finder(4).recommend("Denver").unwrap();
        assert_eq!(prospects.len(), PROSPECTS_PER_CITY);
        assert!(prospects.windows(2).all(|w| w[0].confidence >= w[1].confidence));

        let minerals: HashSet<&str> = prospects.iter().map(|p| p.mineral.as_str()).collect();
        assert_eq!(minerals, MINERALS.into_iter().collect());
        let gold = prospects.iter().find(|p| p.mineral == "gold").unwrap();
        assert_eq!(gold.id, "rec-0");
        assert_eq!(gold.name, "Gold Prospect 1");
    }

    #[test]
    fn values_stay_in_range() {
        let mut finder = finder(8);
        for city in ["Reno", "Butte", "Sudbury", "Timmins"] {
            let prospects = finder.recommend(city).unwrap();
            let center_lng =
                prospects.iter().map(|p| p.coordinates.lng).sum::<f64>() / prospects.len() as f64;
            for p in &prospects {
                assert!((39.0..=61.0).contains(&p.coordinates.lat));
                assert!((-101.0..=-59.0).contains(&p.coordinates.lng));
                assert!((p.coordinates.lng - center_lng).abs() <= 2.0);
                assert!((5..55).contains(&p.distance_km));
                assert!((70..100).contains(&p.confidence));
                assert!((10..60).contains(&p.estimated_value_musd));
            }
        }
    }

    #[test]
    fn blank_city_is_rejected() {
        assert_eq!(finder(1).recommend("  "), Err(ProspectError::EmptyCity));
    }

    #[tokio::test(start_paused = true)]
    async fn search_waits_for_analysis() {
        let mut finder = finder(2);
        let start = tokio::time::Instant::now();
        let prospects = finder.search("Perth").await.unwrap();
        assert_eq!(prospects.len(), PROSPECTS_PER_CITY);
        assert!(start.elapsed() >= Duration::from_secs(2));

        let start = tokio::time::Instant::now();
        assert_eq!(finder.search("").await, Err(ProspectError::EmptyCity));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
