//! Safe SQL builder: identifiers from layouts and config only, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
