//! The tile-byte cache (C2). See [`TileByteCache`] for the public type.

mod disk;
mod memory;
mod traits;
mod two_tier;

pub use traits::{EvictionPolicy, TileByteCacheStats};
pub use two_tier::TileByteCache;
