pub mod controller;
pub mod headless;
pub mod surface;
pub mod symbology;

pub use controller::*;
pub use headless::*;
pub use surface::*;
pub use symbology::*;
