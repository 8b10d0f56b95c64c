pub mod category;
pub mod generator;
pub mod prospect;
pub mod query;
pub mod record;
pub mod source;

pub use category::*;
pub use generator::*;
pub use prospect::*;
pub use query::*;
pub use record::*;
pub use source::*;
