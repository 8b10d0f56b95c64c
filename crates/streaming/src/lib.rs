pub mod cache;
pub mod config;
pub mod key;
pub mod observer;
pub mod request;
pub mod snapshot;
pub mod status;

#[cfg(test)]
mod testing;

pub use cache::*;
pub use config::*;
pub use key::*;
pub use observer::*;
pub use request::*;
pub use snapshot::*;
pub use status::*;
