//! Scripted walk through a headless session: initial load, a user pan, a
//! marker click, a list selection and a filter change. A city search can
//! follow as a last stop.

use std::time::Duration;

use foundation::LngLat;
use serde::Serialize;
use session::{Session, SiteStats};
use sites::{Filter, Prospect, ProspectError, ProspectFinder, SiteSource};
use streaming::SubscriptionClosed;
use surface::{HeadlessSurface, SurfaceProbe};
use tracing::info;

/// Longest a single step waits for its fetch.
const STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// Pan offset of the scripted gesture, in degrees.
const PAN_LNG: f64 = 8.0;
const PAN_LAT: f64 = -4.0;

#[derive(Debug, Clone, Serialize)]
pub struct TourStop {
    pub step: &'static str,
    pub key: String,
    pub camera: String,
    pub zoom: f64,
    pub selected: Option<String>,
    pub error: Option<String>,
    pub stats: SiteStats,
}

#[derive(Debug)]
pub enum TourError {
    Timeout(&'static str),
    Closed,
    Prospect(ProspectError),
}

impl std::fmt::Display for TourError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TourError::Timeout(step) => write!(f, "tour step {step:?} timed out"),
            TourError::Closed => write!(f, "query cache closed during tour"),
            TourError::Prospect(err) => write!(f, "city search failed: {err}"),
        }
    }
}

impl std::error::Error for TourError {}

impl From<ProspectError> for TourError {
    fn from(err: ProspectError) -> Self {
        TourError::Prospect(err)
    }
}

impl From<SubscriptionClosed> for TourError {
    fn from(_: SubscriptionClosed) -> Self {
        TourError::Closed
    }
}

type HeadlessSession<S> = Session<S, HeadlessSurface>;

pub async fn run<S: SiteSource + 'static>(
    session: &mut HeadlessSession<S>,
    probe: &SurfaceProbe,
) -> Result<Vec<TourStop>, TourError> {
    let mut stops = Vec::new();

    settle(session, "initial load").await?;
    stops.push(stop("initial load", session));

    let center = session.viewport().center;
    probe.pan_to(LngLat::new(center.lng + PAN_LNG, center.lat + PAN_LAT));
    session.pump();
    settle(session, "pan").await?;
    stops.push(stop("pan", session));

    let first = session.visible_sites().first().map(|s| s.id.clone());
    if let Some(id) = first {
        probe.click_site(&id);
        session.pump();
    }
    stops.push(stop("marker click", session));

    let last = session.visible_sites().last().map(|s| s.id.clone());
    if let Some(id) = last {
        session.select_site_by_id(&id);
        session.pump();
    }
    stops.push(stop("list selection", session));

    if session.toggle_filter(Filter::Seismic, true) {
        settle(session, "filter change").await?;
    }
    stops.push(stop("filter change", session));

    Ok(stops)
}

/// Looks up prospects near `city` and centers the map on the best one.
/// The camera moves programmatically, so no fetch follows.
pub async fn city_search<S: SiteSource + 'static>(
    session: &mut HeadlessSession<S>,
    finder: &mut ProspectFinder,
    city: &str,
) -> Result<(TourStop, Vec<Prospect>), TourError> {
    let prospects = tokio::time::timeout(STEP_TIMEOUT, finder.search(city))
        .await
        .map_err(|_| TourError::Timeout("city search"))??;
    if let Some(best) = prospects.first() {
        info!(city, prospect = %best.name, "centering on best prospect");
        session.recenter(best.coordinates);
    }
    session.pump();
    Ok((stop("city search", session), prospects))
}

async fn settle<S: SiteSource + 'static>(
    session: &mut HeadlessSession<S>,
    step: &'static str,
) -> Result<(), TourError> {
    tokio::time::timeout(STEP_TIMEOUT, session.settle())
        .await
        .map_err(|_| TourError::Timeout(step))??;
    Ok(())
}

fn stop<S: SiteSource + 'static>(step: &'static str, session: &HeadlessSession<S>) -> TourStop {
    let snapshot = session.snapshot();
    let viewport = session.viewport();
    let stop = TourStop {
        step,
        key: session.key().to_string(),
        camera: viewport.center.to_string(),
        zoom: viewport.zoom,
        selected: session.bridge().selected_id().map(str::to_string),
        error: snapshot.error.map(|e| e.to_string()),
        stats: session.stats(),
    };
    info!(
        step,
        key = %stop.key,
        sites = stop.stats.total,
        active = stop.stats.active,
        selected = ?stop.selected,
        "tour stop"
    );
    stop
}
