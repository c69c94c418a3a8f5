//! Small, dependency-free value types shared across the crate.

mod blob;
pub use blob::*;

mod byte_range;
pub use byte_range::*;
