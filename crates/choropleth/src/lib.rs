pub mod accessors;
pub mod config;
pub mod error;
pub mod format;
pub mod geometry;
pub mod labels;
pub mod map;
pub mod prepare;
pub mod surface;
pub mod symbology;
pub mod tooltip;

pub use config::*;
pub use error::*;
pub use map::*;
pub use prepare::*;
pub use surface::*;
