use std::collections::HashSet;

use foundation::{LngLat, TimestampMs};
use serde::{Deserialize, Serialize};

use crate::category::{Category, SiteStatus};

/// One geospatial entity produced by a fetch.
///
/// Records are immutable once produced; a refetch replaces the whole batch.
/// Category-specific attributes live in [`SiteDetails`], so a field is
/// present exactly when the record's category calls for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRecord {
    pub id: String,
    pub name: String,
    /// Mineral or category label, e.g. `gold` or `seismic`.
    #[serde(rename = "type")]
    pub site_type: String,
    pub coordinates: LngLat,
    pub status: SiteStatus,
    pub distance_km: f64,
    pub last_updated: TimestampMs,
    #[serde(flatten)]
    pub details: SiteDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum SiteDetails {
    Mining(MiningDetails),
    Geological(GeologicalDetails),
    Seismic(SeismicDetails),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningDetails {
    pub depth_m: u32,
    pub production: String,
    pub reserves: String,
    pub elevation_m: u32,
    pub environmental: Environmental,
    pub geological: GeologicalProfile,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeologicalDetails {
    pub elevation_m: u32,
    pub geological: GeologicalProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeismicDetails {
    pub magnitude: f64,
    pub depth_km: u32,
    pub geological: GeologicalProfile,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environmental {
    pub temperature_c: i32,
    pub humidity_pct: u32,
    pub air_quality: AirQuality,
}

/// Seismic stations only carry a risk level; rock type and formation are
/// absent for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeologicalProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rock_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formation: Option<String>,
    pub seismic_risk: RiskLevel,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AirQuality {
    Good,
    Moderate,
    Poor,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub message: String,
    pub severity: Severity,
}

impl Alert {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl SiteRecord {
    pub fn category(&self) -> Category {
        match self.details {
            SiteDetails::Mining(_) => Category::Mining,
            SiteDetails::Geological(_) => Category::Geological,
            SiteDetails::Seismic(_) => Category::Seismic,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SiteStatus::Active
    }

    /// Depth in meters (mines are measured in m, seismic events in km).
    pub fn depth_m(&self) -> Option<f64> {
        match &self.details {
            SiteDetails::Mining(m) => Some(f64::from(m.depth_m)),
            SiteDetails::Seismic(s) => Some(f64::from(s.depth_km) * 1000.0),
            SiteDetails::Geological(_) => None,
        }
    }

    pub fn production(&self) -> Option<&str> {
        match &self.details {
            SiteDetails::Mining(m) => Some(&m.production),
            _ => None,
        }
    }

    pub fn reserves(&self) -> Option<&str> {
        match &self.details {
            SiteDetails::Mining(m) => Some(&m.reserves),
            _ => None,
        }
    }

    pub fn elevation_m(&self) -> Option<u32> {
        match &self.details {
            SiteDetails::Mining(m) => Some(m.elevation_m),
            SiteDetails::Geological(g) => Some(g.elevation_m),
            SiteDetails::Seismic(_) => None,
        }
    }

    pub fn environmental(&self) -> Option<&Environmental> {
        match &self.details {
            SiteDetails::Mining(m) => Some(&m.environmental),
            _ => None,
        }
    }

    pub fn geological(&self) -> &GeologicalProfile {
        match &self.details {
            SiteDetails::Mining(m) => &m.geological,
            SiteDetails::Geological(g) => &g.geological,
            SiteDetails::Seismic(s) => &s.geological,
        }
    }

    pub fn magnitude(&self) -> Option<f64> {
        match &self.details {
            SiteDetails::Seismic(s) => Some(s.magnitude),
            _ => None,
        }
    }

    /// `None` for categories that never carry alerts; otherwise the
    /// (possibly empty) alert list.
    pub fn alerts(&self) -> Option<&[Alert]> {
        match &self.details {
            SiteDetails::Mining(m) => Some(&m.alerts),
            SiteDetails::Seismic(s) => Some(&s.alerts),
            SiteDetails::Geological(_) => None,
        }
    }

    /// Rejects records a real data source must not admit into the cache.
    pub fn validate(&self, fetched_at: TimestampMs) -> Result<(), RecordError> {
        if self.id.trim().is_empty() {
            return Err(RecordError::MissingId);
        }
        let fault = |reason| RecordError::Invalid {
            id: self.id.clone(),
            reason,
        };
        if self.name.trim().is_empty() {
            return Err(fault(RecordFault::MissingName));
        }
        let c = self.coordinates;
        if !c.is_finite()
            || !(-90.0..=90.0).contains(&c.lat)
            || !(-180.0..=180.0).contains(&c.lng)
        {
            return Err(fault(RecordFault::CoordinatesOutOfRange));
        }
        if !self.distance_km.is_finite() || self.distance_km < 0.0 {
            return Err(fault(RecordFault::NegativeDistance));
        }
        if self.last_updated > fetched_at {
            return Err(fault(RecordFault::UpdatedAfterFetch));
        }
        if let Some(m) = self.magnitude() {
            if !m.is_finite() || m < 0.0 {
                return Err(fault(RecordFault::InvalidMagnitude));
            }
        }
        Ok(())
    }
}

/// Validates a whole batch, including id uniqueness.
pub fn validate_batch(sites: &[SiteRecord], fetched_at: TimestampMs) -> Result<(), RecordError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(sites.len());
    for site in sites {
        site.validate(fetched_at)?;
        if !seen.insert(site.id.as_str()) {
            return Err(RecordError::Invalid {
                id: site.id.clone(),
                reason: RecordFault::DuplicateId,
            });
        }
    }
    Ok(())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RecordFault {
    MissingName,
    CoordinatesOutOfRange,
    NegativeDistance,
    UpdatedAfterFetch,
    InvalidMagnitude,
    DuplicateId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    MissingId,
    Invalid { id: String, reason: RecordFault },
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::MissingId => write!(f, "site record without id"),
            RecordError::Invalid { id, reason } => {
                let what = match reason {
                    RecordFault::MissingName => "missing name",
                    RecordFault::CoordinatesOutOfRange => "coordinates out of range",
                    RecordFault::NegativeDistance => "negative or non-finite distance",
                    RecordFault::UpdatedAfterFetch => "last update is after fetch time",
                    RecordFault::InvalidMagnitude => "invalid magnitude",
                    RecordFault::DuplicateId => "duplicate id in batch",
                };
                write!(f, "site record {id}: {what}")
            }
        }
    }
}

impl std::error::Error for RecordError {}
