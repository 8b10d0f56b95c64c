use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Kind of geospatial entity a record describes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Mining,
    Geological,
    Seismic,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Mining, Category::Geological, Category::Seismic];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Mining => "mining",
            Category::Geological => "geological",
            Category::Seismic => "seismic",
        }
    }

    /// Filter that enables this category.
    pub fn filter(self) -> Filter {
        match self {
            Category::Mining => Filter::Mining,
            Category::Geological => Filter::Geological,
            Category::Seismic => Filter::Seismic,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    Active,
    Inactive,
    Potential,
}

impl SiteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SiteStatus::Active => "active",
            SiteStatus::Inactive => "inactive",
            SiteStatus::Potential => "potential",
        }
    }
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Data layer toggled by the filter UI.
///
/// `Weather` is a layer of its own and produces no site records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    Mining,
    Geological,
    Seismic,
    Weather,
}

impl Filter {
    pub const ALL: [Filter; 4] = [
        Filter::Mining,
        Filter::Geological,
        Filter::Seismic,
        Filter::Weather,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Filter::Mining => "mining",
            Filter::Geological => "geological",
            Filter::Seismic => "seismic",
            Filter::Weather => "weather",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Filter::Mining => "Mining Sites",
            Filter::Geological => "Geological Features",
            Filter::Seismic => "Seismic Activity",
            Filter::Weather => "Weather Data",
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterParseError {
    pub input: String,
}

impl std::fmt::Display for FilterParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown filter {:?} (expected mining, geological, seismic or weather)",
            self.input
        )
    }
}

impl std::error::Error for FilterParseError {}

impl std::str::FromStr for Filter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Filter::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| FilterParseError {
                input: s.to_string(),
            })
    }
}

/// Set of active filters. Ordered, so two sets built in different orders
/// compare and hash identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet(BTreeSet<Filter>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a comma-separated list such as `"mining, seismic"`.
    pub fn parse_list(list: &str) -> Result<Self, FilterParseError> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }

    pub fn contains(&self, filter: Filter) -> bool {
        self.0.contains(&filter)
    }

    pub fn includes(&self, category: Category) -> bool {
        self.contains(category.filter())
    }

    /// Returns `true` if the set changed.
    pub fn insert(&mut self, filter: Filter) -> bool {
        self.0.insert(filter)
    }

    /// Returns `true` if the set changed.
    pub fn remove(&mut self, filter: Filter) -> bool {
        self.0.remove(&filter)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Filter> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Filter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for FilterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().map(Filter::as_str).collect();
        f.write_str(&names.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::{Category, Filter, FilterSet};

    #[test]
    fn filter_sets_ignore_order() {
        let a: FilterSet = [Filter::Mining, Filter::Seismic].into_iter().collect();
        let b: FilterSet = [Filter::Seismic, Filter::Mining, Filter::Mining]
            .into_iter()
            .collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.to_string(), "mining,seismic");
    }

    #[test]
    fn parses_case_insensitively() {
        let set = FilterSet::parse_list(" Mining,GEOLOGICAL ,").unwrap();
        assert!(set.includes(Category::Mining));
        assert!(set.includes(Category::Geological));
        assert!(!set.includes(Category::Seismic));
    }

    #[test]
    fn labels_name_the_layer() {
        assert_eq!(Filter::Geological.label(), "Geological Features");
        assert_eq!(Filter::Weather.label(), "Weather Data");
        assert_eq!(format!("{:<8}|", Filter::Mining), "mining  |");
    }

    #[test]
    fn rejects_unknown_filter() {
        let err = FilterSet::parse_list("mining,lava").unwrap_err();
        assert_eq!(err.input, "lava");
    }
}
