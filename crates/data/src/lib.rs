pub mod controller;
pub mod filter;
pub mod point;

pub use controller::*;
pub use filter::*;
pub use point::*;
