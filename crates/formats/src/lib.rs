pub mod dataset;
pub mod generate;
pub mod geojson;

pub use dataset::*;
pub use generate::*;
pub use geojson::*;
