/// Lifecycle of a cache entry's most recent fetch.
///
/// Idle → Loading → Success | Error, and back to Loading on every refetch.
/// Data from the last success survives later Loading and Error states.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum QueryStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl QueryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryStatus::Idle => "idle",
            QueryStatus::Loading => "loading",
            QueryStatus::Success => "success",
            QueryStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a fetch was issued (diagnostics only).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FetchCause {
    /// First subscription, or a subscription to a stale entry.
    Subscribe,
    /// Background refetch timer.
    Interval,
    /// Explicit invalidation.
    Invalidate,
}

impl std::fmt::Display for FetchCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FetchCause::Subscribe => "subscribe",
            FetchCause::Interval => "interval",
            FetchCause::Invalidate => "invalidate",
        })
    }
}
