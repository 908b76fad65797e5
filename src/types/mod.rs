//! Shared value types used throughout the library.

mod color;
mod endcap;
mod transform;

pub use color::Color;
pub use endcap::Endcap;
pub use transform::Placement;
