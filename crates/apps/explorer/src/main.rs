mod config;
mod tour;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use foundation::LngLat;
use serde::Serialize;
use session::{ApiKeys, FileStore, KeyValueStore, MemoryStore, Session, StoreError};
use sites::{FilterSet, Prospect, ProspectFinder, SimulatedSource, SiteRecord, ValidatingSource};
use streaming::QueryCache;
use surface::{HeadlessSurface, TileLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ExplorerConfig;
use crate::tour::TourStop;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Headless explorer for simulated mining, geological and seismic sites"
)]
struct Args {
    /// Initial map center: lng,lat
    #[arg(long, default_value = "0,20", value_parser = parse_center)]
    center: LngLat,

    /// Comma-separated data layers (mining, geological, seismic, weather)
    #[arg(long, default_value = "mining,geological", value_parser = parse_filters)]
    filters: FilterSet,

    /// Case-insensitive search over site name and type
    #[arg(long, default_value = "")]
    search: String,

    /// Seed for reproducible site generation
    #[arg(long)]
    seed: Option<u64>,

    /// JSON config file (takes precedence over TERRASCAN_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON file holding provider keys
    #[arg(long)]
    store: Option<PathBuf>,

    /// Map token to save before starting; an empty value clears it
    #[arg(long)]
    map_token: Option<String>,

    /// City to look up mining prospects near, after the tour
    #[arg(long)]
    city: Option<String>,

    /// Simulated fetch latency in milliseconds
    #[arg(long)]
    latency_ms: Option<u64>,

    /// Print the tour and the final site list as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    tour: &'a [TourStop],
    sites: &'a [SiteRecord],
    prospects: &'a [Prospect],
}

/// Simulated analysis time of a city search.
const CITY_SEARCH_LATENCY: Duration = Duration::from_secs(2);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = ExplorerConfig::load(args.config.as_deref())?;
    if let Some(latency) = args.latency_ms {
        config.generation.latency_ms = latency;
    }

    let base = base_layer(&args)?;
    let simulated = match args.seed {
        Some(seed) => SimulatedSource::with_seed(config.generation.clone(), seed),
        None => SimulatedSource::new(config.generation.clone()),
    };
    let cache = QueryCache::new(ValidatingSource::new(simulated), config.cache.clone());

    let surface = HeadlessSurface::default();
    let probe = surface.probe();
    let mut session = Session::with_layer(cache, surface, args.center, args.filters.clone(), base);
    session.set_search(args.search.clone());

    let mut stops = tour::run(&mut session, &probe).await?;
    let mut prospects = Vec::new();
    if let Some(city) = &args.city {
        let mut finder = match args.seed {
            Some(seed) => ProspectFinder::with_seed(CITY_SEARCH_LATENCY, seed),
            None => ProspectFinder::new(CITY_SEARCH_LATENCY),
        };
        let (stop, found) = tour::city_search(&mut session, &mut finder, city).await?;
        stops.push(stop);
        prospects = found;
    }
    let sites = session.visible_sites();

    if args.json {
        let report = Report {
            tour: &stops,
            sites: &sites,
            prospects: &prospects,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", layer_legend(session.bridge().filters()));
        print_tour(&stops);
        print_sites(&sites);
        print_prospects(&prospects);
    }

    info!(sites = sites.len(), "explorer finished");
    Ok(())
}

fn parse_center(s: &str) -> Result<LngLat, String> {
    let (lng, lat) = s
        .split_once(',')
        .ok_or_else(|| format!("expected lng,lat but got {s:?}"))?;
    let lng: f64 = lng.trim().parse().map_err(|e| format!("bad longitude: {e}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {e}"))?;
    if !lng.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(format!("center out of range: {s}"));
    }
    Ok(LngLat::new(lng, lat))
}

fn parse_filters(s: &str) -> Result<FilterSet, String> {
    FilterSet::parse_list(s).map_err(|e| e.to_string())
}

fn base_layer(args: &Args) -> Result<TileLayer, StoreError> {
    let flag = args.map_token.as_deref();
    let token = match &args.store {
        Some(path) => map_token(ApiKeys::new(FileStore::open(path)?), flag)?,
        None => map_token(ApiKeys::new(MemoryStore::new()), flag)?,
    };
    Ok(match token {
        Some(token) => TileLayer::mapbox_satellite(&token),
        None => TileLayer::open_street_map(),
    })
}

fn map_token<K: KeyValueStore>(
    mut keys: ApiKeys<K>,
    flag: Option<&str>,
) -> Result<Option<String>, StoreError> {
    if let Some(token) = flag {
        keys.set_map_token(token)?;
    }
    keys.map_token()
}

fn layer_legend(filters: &FilterSet) -> String {
    let labels: Vec<&str> = filters.iter().map(|f| f.label()).collect();
    if labels.is_empty() {
        return "layers: none".to_string();
    }
    format!("layers: {}", labels.join(", "))
}

fn print_tour(stops: &[TourStop]) {
    for stop in stops {
        println!(
            "{:<15} {:>3} sites ({:>3}% active)  camera {}  selected {}",
            stop.step,
            stop.stats.total,
            stop.stats.active_percent(),
            stop.camera,
            stop.selected.as_deref().unwrap_or("-"),
        );
        if let Some(error) = &stop.error {
            println!("{:<15} error: {error}", "");
        }
    }
}

fn print_sites(sites: &[SiteRecord]) {
    println!();
    for site in sites {
        println!(
            "{:<14} {:<26} {:<10} {:<9} {:>7.1} km  {}",
            site.id, site.name, site.site_type, site.status, site.distance_km, site.coordinates
        );
    }
}

fn print_prospects(prospects: &[Prospect]) {
    if prospects.is_empty() {
        return;
    }
    println!();
    for p in prospects {
        println!(
            "{:<20} {:<7} {:>3}% conf  {:>3} km  ${}M  access {:<9} {}",
            p.name,
            p.potential,
            p.confidence,
            p.distance_km,
            p.estimated_value_musd,
            p.access,
            p.geological_factor
        );
    }
}
