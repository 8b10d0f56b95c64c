pub mod bounds;
pub mod coord;
pub mod time;
pub mod viewport;

// Foundation crate: small, well-tested geographic primitives only.
pub use bounds::*;
pub use coord::*;
pub use time::*;
pub use viewport::*;
