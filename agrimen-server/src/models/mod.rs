//! Request / response payloads

pub mod catalog;
pub mod predict;

pub use catalog::*;
pub use predict::*;
