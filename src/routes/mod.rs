pub mod common;
pub mod resource;

pub use common::*;
pub use resource::*;
