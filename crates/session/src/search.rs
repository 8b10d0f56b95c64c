use sites::SiteRecord;

/// Whether `site` matches a case-insensitive search on its name or type.
/// A blank query matches everything.
pub fn matches(site: &SiteRecord, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    needle.is_empty()
        || site.name.to_lowercase().contains(&needle)
        || site.site_type.to_lowercase().contains(&needle)
}

/// Sites matching `query`, in their original order.
pub fn filter_sites(sites: &[SiteRecord], query: &str) -> Vec<SiteRecord> {
    sites
        .iter()
        .filter(|s| matches(s, query))
        .cloned()
        .collect()
}
