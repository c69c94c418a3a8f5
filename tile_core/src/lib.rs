//! Data model, configuration, and ambient services shared by the tile
//! streaming core: tile coordinates and the Web Mercator mapping, the
//! tile-byte cache (C2), the tile-byte source contract (C1), and the public
//! error taxonomy.

pub mod cache;
pub mod concurrency;
pub mod config;
mod coordinate;
mod error;
pub mod source;
mod tile_bytes;
mod types;

pub use cache::TileByteCache;
pub use concurrency::ConcurrencyLimits;
pub use config::{TileCacheConfig, TileStreamConfig};
pub use coordinate::{MAX_LATITUDE, TileCoordinate};
pub use error::TileStreamError;
pub use source::{ByteSource, HttpByteSource, MemoryByteSource};
pub use tile_bytes::{TileByteMetadata, TileBytes};
pub use types::{Blob, ByteRange};
