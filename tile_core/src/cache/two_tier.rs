//! The tile-byte cache (C2): a two-tier associative store keyed by tile
//! coordinate, memory in front of an optional disk tier.
//!
//! Every operation touches per-entry recency/frequency bookkeeping, so
//! "concurrent readers, exclusive writer" collapses to a single mutex here
//! rather than a `RwLock` — there is no read path that doesn't also mutate
//! (a cache hit updates LRU/LFU bookkeeping).

use super::disk::DiskTier;
use super::memory::MemoryTier;
use super::traits::{CacheTier, EvictionPolicy, TileByteCacheStats};
use crate::TileCoordinate;
use crate::config::TileCacheConfig;
use crate::{TileBytes, TileByteMetadata};
use std::sync::Mutex;
use std::time::Duration;

struct Inner {
	memory: MemoryTier,
	disk: Option<DiskTier>,
	stats: TileByteCacheStats,
	default_ttl: Option<Duration>,
}

pub struct TileByteCache {
	inner: Mutex<Inner>,
}

impl TileByteCache {
	#[must_use]
	pub fn new(config: &TileCacheConfig) -> Self {
		let memory = MemoryTier::new(config.memory_capacity_bytes, config.eviction_policy);
		let disk = config.disk.clone().map(DiskTier::new);
		Self {
			inner: Mutex::new(Inner {
				memory,
				disk,
				stats: TileByteCacheStats::default(),
				default_ttl: config.default_ttl,
			}),
		}
	}

	pub fn put(&self, bytes: TileBytes) {
		let mut inner = self.inner.lock().unwrap();
		if let Some(disk) = inner.disk.as_mut() {
			disk.put(bytes.clone());
		}
		inner.memory.put(bytes);
	}

	#[must_use]
	pub fn get(&self, coord: TileCoordinate) -> Option<TileBytes> {
		let mut inner = self.inner.lock().unwrap();
		if let Some(bytes) = inner.memory.get(coord) {
			inner.stats.hits += 1;
			return Some(bytes);
		}
		// Go through `get_checked` rather than the `CacheTier::get` trait
		// method so a corrupt entry (`Err`) stays distinguishable from a
		// plain miss (`Ok(None)`) and can be counted separately (spec.md
		// §4.1: "a cache corruption ... is logged; the corruption counter
		// is incremented").
		let disk_result = inner.disk.as_ref().map(|disk| disk.get_checked(coord));
		let from_disk = match disk_result {
			Some(Ok(found)) => found,
			Some(Err(e)) => {
				log::warn!("disk cache entry for {coord} is corrupt: {e}");
				inner.stats.corruptions += 1;
				None
			}
			None => None,
		};
		match from_disk {
			Some(bytes) => {
				inner.stats.hits += 1;
				inner.memory.put(bytes.clone());
				Some(bytes)
			}
			None => {
				inner.stats.misses += 1;
				None
			}
		}
	}

	#[must_use]
	pub fn contains(&self, coord: TileCoordinate) -> bool {
		let inner = self.inner.lock().unwrap();
		inner.memory.contains(coord) || inner.disk.as_ref().is_some_and(|d| d.contains(coord))
	}

	pub fn remove(&self, coord: TileCoordinate) {
		let mut inner = self.inner.lock().unwrap();
		inner.memory.remove(coord);
		if let Some(disk) = inner.disk.as_mut() {
			disk.remove(coord);
		}
	}

	pub fn clear(&self) {
		let mut inner = self.inner.lock().unwrap();
		inner.memory.clear();
		if let Some(disk) = inner.disk.as_mut() {
			disk.clear();
		}
	}

	/// Updates mutable metadata fields (etag/expires/checksum) for an
	/// already-cached tile, without re-fetching its bytes. No-op only if the
	/// coordinate is absent from both tiers.
	pub fn update_metadata(&self, coord: TileCoordinate, f: impl FnOnce(&mut TileByteMetadata)) {
		let mut inner = self.inner.lock().unwrap();
		if let Some(mut bytes) = inner.memory.remove(coord) {
			f(&mut bytes.metadata);
			inner.memory.put(bytes);
			return;
		}

		// Mirror `get`'s promote-on-disk-hit pattern: a tile evicted to
		// disk-only is still `contains`-true, so updating it must not
		// silently drop the change.
		let from_disk = inner.disk.as_ref().and_then(|d| d.get_checked(coord).ok().flatten());
		if let Some(mut bytes) = from_disk {
			f(&mut bytes.metadata);
			if let Some(disk) = inner.disk.as_mut() {
				disk.put(bytes.clone());
			}
			inner.memory.put(bytes);
		}
	}

	#[must_use]
	pub fn tiles_in_bounds(&self, zoom: u8, x_range: std::ops::Range<i32>, y_range: std::ops::Range<i32>) -> Vec<TileCoordinate> {
		let inner = self.inner.lock().unwrap();
		let mut found = inner.memory.tiles_in_bounds(zoom, x_range.clone(), y_range.clone());
		if let Some(disk) = inner.disk.as_ref() {
			for c in disk.tiles_in_bounds(zoom, x_range, y_range) {
				if !found.contains(&c) {
					found.push(c);
				}
			}
		}
		found
	}

	#[must_use]
	pub fn tiles_at_zoom(&self, zoom: u8) -> Vec<TileCoordinate> {
		let inner = self.inner.lock().unwrap();
		let mut found = inner.memory.tiles_at_zoom(zoom);
		if let Some(disk) = inner.disk.as_ref() {
			for c in disk.tiles_at_zoom(zoom) {
				if !found.contains(&c) {
					found.push(c);
				}
			}
		}
		found
	}

	/// Evicts entries older than `default_ttl`, falling back to the TTL the
	/// cache was configured with (`TileCacheConfig::default_ttl`) when
	/// `None`. A no-op if neither is set. Returns the number evicted.
	pub fn cleanup(&self, default_ttl: Option<Duration>) -> u64 {
		let mut inner = self.inner.lock().unwrap();
		let Some(ttl) = default_ttl.or(inner.default_ttl) else { return 0 };
		let now = std::time::Instant::now();
		let expired = inner.memory.expired_coords(now, ttl);
		for coord in &expired {
			inner.memory.remove(*coord);
		}
		inner.stats.evictions += expired.len() as u64;
		expired.len() as u64
	}

	#[must_use]
	pub fn stats(&self) -> TileByteCacheStats {
		self.inner.lock().unwrap().stats
	}
}
