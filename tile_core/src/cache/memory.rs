//! The in-memory tier of the tile-byte cache.
//!
//! Unlike `LimitedCache` (which caps entry *count* derived from
//! `size_of::<K>() + size_of::<V>()`), tile payloads vary wildly in size, so
//! this tier tracks a running total of `TileBytes::len()` against a
//! configured byte budget and evicts under the configured policy until back
//! under budget.

use super::traits::{CacheTier, EvictionPolicy};
use crate::{TileBytes, TileCoordinate};
use std::collections::HashMap;

pub struct MemoryTier {
	entries: HashMap<TileCoordinate, TileBytes>,
	capacity_bytes: u64,
	used_bytes: u64,
	policy: EvictionPolicy,
}

impl MemoryTier {
	#[must_use]
	pub fn new(capacity_bytes: u64, policy: EvictionPolicy) -> Self {
		Self {
			entries: HashMap::new(),
			capacity_bytes,
			used_bytes: 0,
			policy,
		}
	}

	fn evict_one(&mut self) -> Option<TileCoordinate> {
		let victim = match self.policy {
			EvictionPolicy::Lru => self.entries.values().min_by_key(|b| b.metadata.last_access).map(|b| b.coord),
			EvictionPolicy::Lfu => self.entries.values().min_by_key(|b| b.metadata.access_count).map(|b| b.coord),
			EvictionPolicy::SizeBiggestFirst => self.entries.values().max_by_key(|b| b.metadata.size).map(|b| b.coord),
			EvictionPolicy::TimeOldestFirst => self.entries.values().min_by_key(|b| b.metadata.last_access).map(|b| b.coord),
		};
		if let Some(coord) = victim {
			if let Some(bytes) = self.entries.remove(&coord) {
				self.used_bytes -= bytes.metadata.size;
			}
		}
		victim
	}

	/// Evicts entries until `used_bytes <= capacity_bytes`. Returns the
	/// number of entries evicted.
	fn make_room(&mut self) -> u64 {
		let mut evicted = 0;
		while self.used_bytes > self.capacity_bytes && !self.entries.is_empty() {
			if self.evict_one().is_none() {
				break;
			}
			evicted += 1;
		}
		evicted
	}

	pub fn make_room_for(&mut self) -> u64 {
		self.make_room()
	}

	/// Coordinates whose `last_access` is older than `ttl` relative to `now`.
	pub fn expired_coords(&self, now: std::time::Instant, ttl: std::time::Duration) -> Vec<TileCoordinate> {
		self
			.entries
			.values()
			.filter(|b| now.duration_since(b.metadata.last_access) > ttl)
			.map(|b| b.coord)
			.collect()
	}
}

impl CacheTier for MemoryTier {
	fn get(&mut self, coord: TileCoordinate) -> Option<TileBytes> {
		let bytes = self.entries.get_mut(&coord)?;
		bytes.metadata.touch();
		Some(bytes.clone())
	}

	fn contains(&self, coord: TileCoordinate) -> bool {
		self.entries.contains_key(&coord)
	}

	fn put(&mut self, bytes: TileBytes) {
		if let Some(prev) = self.entries.remove(&bytes.coord) {
			self.used_bytes -= prev.metadata.size;
		}
		self.used_bytes += bytes.metadata.size;
		self.entries.insert(bytes.coord, bytes);
		self.make_room();
	}

	fn remove(&mut self, coord: TileCoordinate) -> Option<TileBytes> {
		let bytes = self.entries.remove(&coord)?;
		self.used_bytes -= bytes.metadata.size;
		Some(bytes)
	}

	fn clear(&mut self) {
		self.entries.clear();
		self.used_bytes = 0;
	}

	fn tiles_in_bounds(&self, zoom: u8, x_range: std::ops::Range<i32>, y_range: std::ops::Range<i32>) -> Vec<TileCoordinate> {
		self
			.entries
			.keys()
			.filter(|c| c.zoom == zoom && x_range.contains(&c.x) && y_range.contains(&c.y))
			.copied()
			.collect()
	}

	fn tiles_at_zoom(&self, zoom: u8) -> Vec<TileCoordinate> {
		self.entries.keys().filter(|c| c.zoom == zoom).copied().collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Blob;

	fn bytes(coord: TileCoordinate, size: usize) -> TileBytes {
		TileBytes::new(coord, Blob::from(vec![0u8; size]), "image/png")
	}

	#[test]
	fn evicts_when_over_budget() {
		let mut tier = MemoryTier::new(150, EvictionPolicy::Lru);
		tier.put(bytes(TileCoordinate::new(0, 0, 0), 100));
		tier.put(bytes(TileCoordinate::new(1, 0, 0), 100));
		// second insert pushes usage to 200 > 150, first (LRU) is evicted
		assert!(!tier.contains(TileCoordinate::new(0, 0, 0)));
		assert!(tier.contains(TileCoordinate::new(1, 0, 0)));
	}

	#[test]
	fn size_biggest_first_evicts_the_largest() {
		let mut tier = MemoryTier::new(150, EvictionPolicy::SizeBiggestFirst);
		tier.put(bytes(TileCoordinate::new(0, 0, 0), 40));
		tier.put(bytes(TileCoordinate::new(1, 0, 0), 120));
		assert!(!tier.contains(TileCoordinate::new(1, 0, 0)));
		assert!(tier.contains(TileCoordinate::new(0, 0, 0)));
	}

	#[test]
	fn tiles_in_bounds_filters_by_zoom_and_range() {
		let mut tier = MemoryTier::new(10_000, EvictionPolicy::Lru);
		tier.put(bytes(TileCoordinate::new(0, 0, 1), 10));
		tier.put(bytes(TileCoordinate::new(5, 5, 1), 10));
		tier.put(bytes(TileCoordinate::new(0, 0, 2), 10));
		let found = tier.tiles_in_bounds(1, 0..2, 0..2);
		assert_eq!(found, vec![TileCoordinate::new(0, 0, 1)]);
	}
}
