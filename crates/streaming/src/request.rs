/// Identifies one issued fetch.
///
/// Handles come from a single monotonically increasing counter, so for any
/// key a later fetch always carries a larger value than an earlier one. A
/// result is committed only if its handle is still the latest issued for
/// its key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Request(pub u64);

impl Request {
    /// Placeholder for entries that have never fetched.
    pub const NONE: Request = Request(0);
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
