use serde::Serialize;
use sites::{Category, SiteRecord, SiteStatus};

/// Summary counts over a site list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SiteStats {
    pub total: usize,
    pub active: usize,
    pub potential: usize,
    pub mining: usize,
    pub geological: usize,
    pub seismic: usize,
    /// Most frequent `site_type`; ties go to the first one listed.
    pub most_common_type: Option<String>,
    pub alerts: usize,
}

impl SiteStats {
    pub fn collect(sites: &[SiteRecord]) -> Self {
        let mut stats = SiteStats {
            total: sites.len(),
            ..SiteStats::default()
        };
        let mut types: Vec<(&str, usize)> = Vec::new();

        for site in sites {
            match site.status {
                SiteStatus::Active => stats.active += 1,
                SiteStatus::Potential => stats.potential += 1,
                SiteStatus::Inactive => {}
            }
            match site.category() {
                Category::Mining => stats.mining += 1,
                Category::Geological => stats.geological += 1,
                Category::Seismic => stats.seismic += 1,
            }
            stats.alerts += site.alerts().map_or(0, <[_]>::len);

            match types.iter_mut().find(|(t, _)| *t == site.site_type) {
                Some((_, n)) => *n += 1,
                None => types.push((site.site_type.as_str(), 1)),
            }
        }

        let mut best: Option<(&str, usize)> = None;
        for (t, n) in types {
            if best.is_none_or(|(_, m)| n > m) {
                best = Some((t, n));
            }
        }
        stats.most_common_type = best.map(|(t, _)| t.to_string());
        stats
    }

    /// Share of active sites, rounded to a whole percent.
    pub fn active_percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.active as f64 * 100.0 / self.total as f64).round() as u32
    }
}
