use foundation::{Bounds, LngLat};
use sites::{FilterSet, SiteQuery};

/// Dataset name of site queries.
pub const SITES_DATASET: &str = "mining-sites";

/// Identifies one cacheable request.
///
/// Two keys are equal iff their datasets match, centers and bounds are
/// numerically equal (or both absent) and filters are equal as sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub dataset: String,
    pub query: SiteQuery,
}

impl QueryKey {
    pub fn new(dataset: impl Into<String>, query: SiteQuery) -> Self {
        Self {
            dataset: dataset.into(),
            query,
        }
    }

    pub fn sites(center: Option<LngLat>, filters: FilterSet, bounds: Option<Bounds>) -> Self {
        Self::new(SITES_DATASET, SiteQuery::new(center, filters, bounds))
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.dataset, self.query)
    }
}
