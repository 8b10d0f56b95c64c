use foundation::{Bounds, LngLat};
use serde::{Deserialize, Serialize};

use crate::category::FilterSet;

/// Region plus active filters: everything a `SiteSource` needs to produce
/// a batch of records.
///
/// Equality is the cache-key equality: centers and bounds compare
/// numerically, filters compare as sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteQuery {
    pub center: Option<LngLat>,
    pub filters: FilterSet,
    pub bounds: Option<Bounds>,
}

impl SiteQuery {
    pub fn new(center: Option<LngLat>, filters: FilterSet, bounds: Option<Bounds>) -> Self {
        Self {
            center,
            filters,
            bounds,
        }
    }
}

impl std::fmt::Display for SiteQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.center {
            Some(c) => write!(f, "center=({}, {})", c.lng, c.lat)?,
            None => write!(f, "center=default")?,
        }
        write!(f, " filters=[{}]", self.filters)?;
        match self.bounds {
            Some(b) => write!(
                f,
                " bounds=n{} s{} e{} w{}",
                b.north(),
                b.south(),
                b.east(),
                b.west()
            ),
            None => write!(f, " bounds=none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SiteQuery;
    use crate::category::{Filter, FilterSet};
    use foundation::{Bounds, LngLat};
    use std::collections::HashMap;

    #[test]
    fn equal_queries_share_a_map_slot() {
        let a = SiteQuery::new(
            Some(LngLat::new(0.0, 20.0)),
            [Filter::Geological, Filter::Mining].into_iter().collect(),
            Bounds::new(1.0, -1.0, 1.0, -1.0),
        );
        let b = SiteQuery::new(
            Some(LngLat::new(-0.0, 20.0)),
            [Filter::Mining, Filter::Geological].into_iter().collect(),
            Bounds::new(1.0, -1.0, 1.0, -1.0),
        );
        let mut map = HashMap::new();
        map.insert(a, 1);
        assert_eq!(map.get(&b), Some(&1));
    }

    #[test]
    fn differing_bounds_are_distinct() {
        let filters: FilterSet = [Filter::Mining].into_iter().collect();
        let a = SiteQuery::new(None, filters.clone(), None);
        let b = SiteQuery::new(None, filters, Bounds::new(1.0, -1.0, 1.0, -1.0));
        assert_ne!(a, b);
    }
}
