use foundation::LngLat;
use sites::{Category, Filter, SiteRecord, SiteStatus};

/// Opaque 24-bit color.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn hex(v: u32) -> Self {
        Self((v >> 16) as u8, (v >> 8) as u8, v as u8)
    }

    /// Normalized RGBA with full alpha.
    pub fn to_rgba(self) -> [f32; 4] {
        [
            f32::from(self.0) / 255.0,
            f32::from(self.1) / 255.0,
            f32::from(self.2) / 255.0,
            1.0,
        ]
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

pub const GOLD: Rgb = Rgb::hex(0xFFD700);
pub const COPPER: Rgb = Rgb::hex(0xB87333);
pub const IRON: Rgb = Rgb::hex(0xA0522D);
pub const COAL: Rgb = Rgb::hex(0x2F4F4F);
pub const DIAMOND: Rgb = Rgb::hex(0xE6E6FA);
pub const ORE_DEFAULT: Rgb = Rgb::hex(0xFFA500);

pub const AMBER: Rgb = Rgb::hex(0xF59E0B);
pub const GREEN: Rgb = Rgb::hex(0x22C55E);
pub const RED: Rgb = Rgb::hex(0xEF4444);
pub const BLUE: Rgb = Rgb::hex(0x3B82F6);

/// Scale applied to the selected marker.
pub const SELECTED_SCALE: f32 = 1.25;

/// Color of a mining site by mineral; unknown minerals get orange.
pub fn ore_color(site_type: &str) -> Rgb {
    match site_type.to_ascii_lowercase().as_str() {
        "gold" => GOLD,
        "copper" => COPPER,
        "iron" => IRON,
        "coal" => COAL,
        "diamond" => DIAMOND,
        _ => ORE_DEFAULT,
    }
}

pub fn site_color(site: &SiteRecord) -> Rgb {
    match site.category() {
        Category::Mining => ore_color(&site.site_type),
        Category::Geological => GREEN,
        Category::Seismic => RED,
    }
}

/// Swatch of a filter in the layer legend.
pub fn legend_color(filter: Filter) -> Rgb {
    match filter {
        Filter::Mining => AMBER,
        Filter::Geological => GREEN,
        Filter::Seismic => RED,
        Filter::Weather => BLUE,
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MarkerSymbol {
    Pin,
    Mountain,
    Warning,
}

impl MarkerSymbol {
    pub fn for_category(category: Category) -> Self {
        match category {
            Category::Mining => MarkerSymbol::Pin,
            Category::Geological => MarkerSymbol::Mountain,
            Category::Seismic => MarkerSymbol::Warning,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MarkerStyle {
    pub color: Rgb,
    pub symbol: MarkerSymbol,
    pub scale: f32,
    /// Pulsing badge shown on active sites.
    pub pulse: bool,
}

impl MarkerStyle {
    pub fn for_site(site: &SiteRecord, selected: bool) -> Self {
        Self {
            color: site_color(site),
            symbol: MarkerSymbol::for_category(site.category()),
            scale: if selected { SELECTED_SCALE } else { 1.0 },
            pulse: site.is_active(),
        }
    }
}

/// Summary card attached to a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub name: String,
    pub site_type: String,
    pub status: SiteStatus,
    pub distance_km: f64,
}

impl Popup {
    pub fn for_site(site: &SiteRecord) -> Self {
        Self {
            name: site.name.clone(),
            site_type: site.site_type.clone(),
            status: site.status,
            distance_km: site.distance_km,
        }
    }
}

impl std::fmt::Display for Popup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) · {} · {:.1} km",
            self.name, self.site_type, self.status, self.distance_km
        )
    }
}

/// Everything a surface needs to draw one site.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub site_id: String,
    pub position: LngLat,
    pub style: MarkerStyle,
    pub popup: Popup,
}

impl MarkerSpec {
    pub fn for_site(site: &SiteRecord, selected: bool) -> Self {
        Self {
            site_id: site.id.clone(),
            position: site.coordinates,
            style: MarkerStyle::for_site(site, selected),
            popup: Popup::for_site(site),
        }
    }

    pub fn is_selected(&self) -> bool {
        self.style.scale > 1.0
    }
}
