pub mod bridge;
pub mod kv;
pub mod search;
pub mod session;
pub mod stats;

pub use bridge::*;
pub use kv::*;
pub use search::*;
pub use session::*;
pub use stats::*;
