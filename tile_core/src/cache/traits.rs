use crate::{TileBytes, TileCoordinate};

/// Eviction policy for the memory tier of a tile-byte cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
	#[default]
	Lru,
	Lfu,
	SizeBiggestFirst,
	TimeOldestFirst,
}

/// A tier of the two-tier tile-byte cache. Implemented by the memory tier
/// and the disk tier; `TileByteCache` composes one of each.
pub trait CacheTier: Send + Sync {
	fn get(&mut self, coord: TileCoordinate) -> Option<TileBytes>;
	fn contains(&self, coord: TileCoordinate) -> bool;
	fn put(&mut self, bytes: TileBytes);
	fn remove(&mut self, coord: TileCoordinate) -> Option<TileBytes>;
	fn clear(&mut self);
	fn tiles_in_bounds(&self, zoom: u8, x_range: std::ops::Range<i32>, y_range: std::ops::Range<i32>) -> Vec<TileCoordinate>;
	fn tiles_at_zoom(&self, zoom: u8) -> Vec<TileCoordinate>;
}

/// Observational counters for a tile-byte cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct TileByteCacheStats {
	pub hits: u64,
	pub misses: u64,
	pub evictions: u64,
	pub corruptions: u64,
}

impl TileByteCacheStats {
	#[must_use]
	pub fn hit_ratio(&self) -> f64 {
		let total = self.hits + self.misses;
		if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
	}
}
