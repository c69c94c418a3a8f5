//! Configuration for the tile streaming core.
//!
//! Mirrors the teacher's small struct-plus-enum `Config`/`CacheKind` shape
//! rather than a sprawling settings system: every field has a sane default,
//! and callers only override what they need via `with_*` builder methods.

use crate::cache::EvictionPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Operational knobs for the streaming core (§6 of the design).
#[derive(Debug, Clone)]
pub struct TileStreamConfig {
	pub tile_size: u32,
	pub max_pool_layers: u32,
	pub worker_thread_count: u32,
	pub max_uploads_per_frame: u32,
	pub max_full_indirection_zoom: u8,
	pub indirection_window_size: u32,
	pub max_pending_loads: u32,
	pub default_max_age_seconds: u64,
	pub cache: TileCacheConfig,
}

impl Default for TileStreamConfig {
	fn default() -> Self {
		Self {
			tile_size: 256,
			max_pool_layers: 512,
			worker_thread_count: 4,
			max_uploads_per_frame: 5,
			max_full_indirection_zoom: 12,
			indirection_window_size: 512,
			max_pending_loads: 256,
			default_max_age_seconds: 300,
			cache: TileCacheConfig::default(),
		}
	}
}

impl TileStreamConfig {
	#[must_use]
	pub fn with_tile_size(mut self, tile_size: u32) -> Self {
		self.tile_size = tile_size;
		self
	}

	#[must_use]
	pub fn with_max_pool_layers(mut self, max_pool_layers: u32) -> Self {
		self.max_pool_layers = max_pool_layers;
		self
	}

	#[must_use]
	pub fn with_worker_thread_count(mut self, count: u32) -> Self {
		self.worker_thread_count = count;
		self
	}

	#[must_use]
	pub fn with_max_uploads_per_frame(mut self, n: u32) -> Self {
		self.max_uploads_per_frame = n;
		self
	}

	#[must_use]
	pub fn with_cache(mut self, cache: TileCacheConfig) -> Self {
		self.cache = cache;
		self
	}
}

/// Configuration for the tile-byte cache (C2); §6 of the design defers
/// these to "configuration inputs, not core concerns" but a complete crate
/// needs somewhere to put them.
#[derive(Debug, Clone)]
pub struct TileCacheConfig {
	pub memory_capacity_bytes: u64,
	pub disk: Option<PathBuf>,
	pub eviction_policy: EvictionPolicy,
	pub default_ttl: Option<Duration>,
}

impl Default for TileCacheConfig {
	fn default() -> Self {
		Self {
			memory_capacity_bytes: 64 * 1024 * 1024,
			disk: None,
			eviction_policy: EvictionPolicy::Lru,
			default_ttl: None,
		}
	}
}

impl TileCacheConfig {
	#[must_use]
	pub fn with_disk(mut self, path: PathBuf) -> Self {
		self.disk = Some(path);
		self
	}

	#[must_use]
	pub fn with_eviction_policy(mut self, policy: EvictionPolicy) -> Self {
		self.eviction_policy = policy;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_the_documented_knobs() {
		let cfg = TileStreamConfig::default();
		assert_eq!(cfg.tile_size, 256);
		assert_eq!(cfg.max_pool_layers, 512);
		assert_eq!(cfg.worker_thread_count, 4);
		assert_eq!(cfg.max_uploads_per_frame, 5);
		assert_eq!(cfg.max_full_indirection_zoom, 12);
		assert_eq!(cfg.indirection_window_size, 512);
		assert_eq!(cfg.max_pending_loads, 256);
		assert_eq!(cfg.default_max_age_seconds, 300);
	}

	#[test]
	fn builder_methods_chain() {
		let cfg = TileStreamConfig::default().with_tile_size(128).with_max_pool_layers(64);
		assert_eq!(cfg.tile_size, 128);
		assert_eq!(cfg.max_pool_layers, 64);
	}
}
