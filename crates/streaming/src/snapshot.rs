use std::sync::Arc;

use sites::{FetchError, SiteRecord};
use tokio::time::Instant;

use crate::status::QueryStatus;

/// What a subscriber sees of one cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    pub status: QueryStatus,
    /// Last successful batch, kept through refetches and errors.
    pub data: Option<Arc<[SiteRecord]>>,
    pub error: Option<FetchError>,
    /// Fetching with nothing to show yet.
    pub is_loading: bool,
    /// A fetch is in flight, with or without data to show.
    pub is_fetching: bool,
    pub fetched_at: Option<Instant>,
    /// Bumped on every publish of the entry.
    pub revision: u64,
}

impl QuerySnapshot {
    pub fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            is_loading: false,
            is_fetching: false,
            fetched_at: None,
            revision: 0,
        }
    }

    /// Current records, empty while nothing has loaded.
    pub fn sites(&self) -> &[SiteRecord] {
        self.data.as_deref().unwrap_or(&[])
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}

impl Default for QuerySnapshot {
    fn default() -> Self {
        Self::idle()
    }
}
