//! The coordinator (C7): the public façade and the only component the
//! renderer interacts with directly.
//!
//! C5/C6 are documented as rendering-thread-only with no internal
//! synchronization, but `is_tile_ready`/`get_tile_layer_index`/the texture-id
//! getters are callable from any thread (spec.md §5). Rust's aliasing rules
//! mean that sharing still needs a lock even though, by convention, only the
//! rendering thread ever writes — so both are wrapped in a `RwLock`: readers
//! (any thread) never block each other, and the rendering thread is the only
//! writer. This is a structural necessity, not contention the design
//! expects in practice.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tile_core::{ByteSource, TileByteCache, TileCoordinate, TileStreamConfig};

use crate::gpu_backend::{GpuBackend, GpuHandle};
use crate::indirection::IndirectionTable;
use crate::texture_pool::TexturePool;
use crate::upload_queue::UploadQueue;
use crate::worker_pool::WorkerPool;

/// A tile's lifecycle state as tracked by the coordinator (C7 of the data
/// model). `NotLoaded` is never stored explicitly — its absence from the
/// state map *is* `NotLoaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileStatus {
	NotLoaded,
	Loading,
	Loaded,
}

struct TileState {
	status: TileStatus,
	pool_layer: Option<u32>,
	request_time: Instant,
}

/// Public façade composing C3–C6. Construct once per renderer; the
/// underlying worker pool shuts down and joins its threads on drop.
pub struct Coordinator {
	config: TileStreamConfig,
	state: RwLock<HashMap<TileCoordinate, TileState>>,
	pending_load_count: AtomicU32,
	upload_queue: Arc<UploadQueue>,
	workers: WorkerPool,
	pool: RwLock<TexturePool>,
	indirection: RwLock<IndirectionTable>,
}

impl Coordinator {
	#[must_use]
	pub fn new(
		config: TileStreamConfig,
		cache: Arc<TileByteCache>,
		source: Arc<dyn ByteSource>,
		gpu: Arc<dyn GpuBackend>,
	) -> Self {
		let upload_queue = Arc::new(UploadQueue::new());
		let workers = WorkerPool::new(config.worker_thread_count, cache, source, Arc::clone(&upload_queue), config.tile_size);
		let pool = RwLock::new(TexturePool::new(Arc::clone(&gpu), config.tile_size, config.max_pool_layers));
		let indirection = RwLock::new(IndirectionTable::new(gpu, config.max_full_indirection_zoom, config.indirection_window_size));

		Self {
			config,
			state: RwLock::new(HashMap::new()),
			pending_load_count: AtomicU32::new(0),
			upload_queue,
			workers,
			pool,
			indirection,
		}
	}

	/// Admits every coordinate in `tiles` that is currently absent (i.e.
	/// `NotLoaded`), transitioning it to `Loading` and submitting it to the
	/// worker pool with a no-op completion hook — state transitions happen
	/// on the GL thread inside `process_uploads` instead (see the data
	/// model's lifecycle notes). Idempotent: re-requesting an already
	/// `Loading`/`Loaded` tile is a cheap no-op.
	pub fn request_tiles(&self, tiles: &[TileCoordinate], priority: i32) {
		let eligible: Vec<TileCoordinate> = {
			let state = self.state.read().unwrap();
			tiles.iter().copied().filter(|c| !state.contains_key(c)).collect()
		};
		if eligible.is_empty() {
			return;
		}

		let mut state = self.state.write().unwrap();
		let now = Instant::now();
		for coord in eligible {
			if state.contains_key(&coord) {
				continue;
			}
			state.insert(coord, TileState { status: TileStatus::Loading, pool_layer: None, request_time: now });
			self.pending_load_count.fetch_add(1, Ordering::SeqCst);
			self.workers.submit(coord, priority, Some(Box::new(|_| {})));
		}
	}

	/// Rendering-thread only. Pops up to `max_uploads` decoded tiles from
	/// C3, uploading each to C5 (evicting an LRU victim first if the pool is
	/// full) and writing C6, then transitions the tile to `Loaded`. `None`
	/// falls back to `TileStreamConfig::max_uploads_per_frame` (spec.md §9's
	/// documented default of 5).
	pub fn process_uploads(&self, max_uploads: Option<u32>) {
		let max_uploads = max_uploads.unwrap_or(self.config.max_uploads_per_frame);
		for _ in 0..max_uploads {
			let Some(tile) = self.upload_queue.try_pop() else { break };
			let coord = tile.coord;

			let mut pool = self.pool.write().unwrap();
			if pool.free_count() == 0 && !pool.is_tile_loaded(coord)
				&& let Some(victim) = pool.find_eviction_candidate()
			{
				self.indirection.write().unwrap().clear_tile(victim);
				pool.evict_tile(victim);
				self.state.write().unwrap().remove(&victim);
			}

			match pool.upload_tile(coord, &tile.pixels, tile.width, tile.height, 4) {
				Ok(layer) => {
					drop(pool);
					self.indirection.write().unwrap().set_tile_layer(coord, layer);
					self.state.write().unwrap().insert(
						coord,
						TileState { status: TileStatus::Loaded, pool_layer: Some(layer), request_time: Instant::now() },
					);
					self.pending_load_count.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1))).ok();
					if let Some(hook) = tile.on_complete {
						hook(coord);
					}
				}
				Err(err) => log::warn!("upload failed for {coord}: {err}"),
			}
		}
	}

	/// Rendering-thread only. Evicts every `Loaded` tile whose
	/// `request_time` is older than `max_age`. `None` falls back to
	/// `TileStreamConfig::default_max_age_seconds` (spec.md §9's documented
	/// default of 300s). Returns the number evicted.
	pub fn evict_unused_tiles(&self, max_age: Option<Duration>) -> u32 {
		let max_age = max_age.unwrap_or(Duration::from_secs(self.config.default_max_age_seconds));
		let now = Instant::now();
		let victims: Vec<TileCoordinate> = {
			let state = self.state.read().unwrap();
			state
				.iter()
				.filter(|(_, s)| s.status == TileStatus::Loaded && now.duration_since(s.request_time) > max_age)
				.map(|(c, _)| *c)
				.collect()
		};

		let mut pool = self.pool.write().unwrap();
		let mut indirection = self.indirection.write().unwrap();
		let mut state = self.state.write().unwrap();
		for &victim in &victims {
			indirection.clear_tile(victim);
			pool.evict_tile(victim);
			state.remove(&victim);
		}
		victims.len() as u32
	}

	pub fn update_indirection_window_center(&self, zoom: u8, center_x: i32, center_y: i32) {
		self.indirection.write().unwrap().update_window_center(zoom, center_x, center_y);
	}

	#[must_use]
	pub fn is_tile_ready(&self, coord: TileCoordinate) -> bool {
		self.pool.read().unwrap().is_tile_loaded(coord)
	}

	#[must_use]
	pub fn get_tile_layer_index(&self, coord: TileCoordinate) -> i32 {
		self.pool.read().unwrap().layer_index(coord).map_or(-1, |l| l as i32)
	}

	#[must_use]
	pub fn get_tile_pool_texture_id(&self) -> GpuHandle {
		self.pool.read().unwrap().texture_id()
	}

	#[must_use]
	pub fn get_indirection_texture_id(&self, zoom: u8) -> GpuHandle {
		self.indirection.read().unwrap().get_texture_id(zoom)
	}

	#[must_use]
	pub fn get_indirection_offset(&self, zoom: u8) -> (i32, i32) {
		self.indirection.read().unwrap().get_window_offset(zoom)
	}

	#[must_use]
	pub fn get_tile_status(&self, coord: TileCoordinate) -> TileStatus {
		self.state.read().unwrap().get(&coord).map_or(TileStatus::NotLoaded, |s| s.status)
	}

	#[must_use]
	pub fn get_pending_load_count(&self) -> u32 {
		self.pending_load_count.load(Ordering::SeqCst)
	}

	#[must_use]
	pub fn config(&self) -> &TileStreamConfig {
		&self.config
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gpu_backend::MockGpuBackend;
	use pretty_assertions::assert_eq;
	use std::thread;
	use std::time::Duration;
	use tile_core::{Blob, MemoryByteSource, TileBytes, TileCacheConfig};

	fn png_bytes(size: u32) -> Vec<u8> {
		let img = image::RgbaImage::from_pixel(size, size, image::Rgba([9, 9, 9, 255]));
		let mut buf = Vec::new();
		image::DynamicImage::ImageRgba8(img)
			.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
			.unwrap();
		buf
	}

	fn coordinator(max_pool_layers: u32, worker_thread_count: u32, tile_size: u32, source: Arc<MemoryByteSource>) -> Coordinator {
		let cache = Arc::new(TileByteCache::new(&TileCacheConfig::default()));
		let config = TileStreamConfig::default()
			.with_tile_size(tile_size)
			.with_max_pool_layers(max_pool_layers)
			.with_worker_thread_count(worker_thread_count);
		Coordinator::new(config, cache, source, Arc::new(MockGpuBackend::new()))
	}

	fn wait_until_drained(c: &Coordinator) {
		for _ in 0..500 {
			if c.get_pending_load_count() == 0 {
				return;
			}
			thread::sleep(Duration::from_millis(5));
		}
		panic!("pending_load_count never reached 0");
	}

	#[test]
	fn cold_load_and_render() {
		let source = Arc::new(MemoryByteSource::new());
		for coord in [
			TileCoordinate::new(0, 0, 0),
			TileCoordinate::new(0, 1, 1),
			TileCoordinate::new(1, 0, 1),
			TileCoordinate::new(1, 1, 1),
		] {
			source.insert(coord, TileBytes::new(coord, Blob::from(png_bytes(256)), "image/png"));
		}
		let c = coordinator(4, 2, 256, source);
		let tiles = [
			TileCoordinate::new(0, 0, 0),
			TileCoordinate::new(0, 1, 1),
			TileCoordinate::new(1, 0, 1),
			TileCoordinate::new(1, 1, 1),
		];
		c.request_tiles(&tiles, 0);
		wait_until_drained(&c);
		c.process_uploads(Some(10));

		let mut layers = std::collections::HashSet::new();
		for coord in tiles {
			assert!(c.is_tile_ready(coord));
			let layer = c.get_tile_layer_index(coord);
			assert!((0..4).contains(&layer));
			layers.insert(layer);
		}
		assert_eq!(layers.len(), 4);
	}

	#[test]
	fn lru_eviction_keeps_touched_tiles() {
		let source = Arc::new(MemoryByteSource::new());
		let a = TileCoordinate::new(0, 0, 0);
		let b = TileCoordinate::new(0, 0, 1);
		let c_coord = TileCoordinate::new(0, 1, 1);
		for coord in [a, b, c_coord] {
			source.insert(coord, TileBytes::new(coord, Blob::from(png_bytes(4)), "image/png"));
		}
		let c = coordinator(2, 2, 4, source);

		c.request_tiles(&[a, b], 0);
		wait_until_drained(&c);
		c.process_uploads(Some(10));
		assert!(c.is_tile_ready(a));
		assert!(c.is_tile_ready(b));

		// touch `a` so `b` becomes the LRU victim
		c.pool.write().unwrap().touch_tile(a);

		c.request_tiles(&[c_coord], 0);
		wait_until_drained(&c);
		c.process_uploads(Some(10));

		assert!(c.is_tile_ready(a));
		assert!(c.is_tile_ready(c_coord));
		assert!(!c.is_tile_ready(b));
		assert_eq!(c.indirection.read().unwrap().get_tile_layer(b), None);
	}

	#[test]
	fn windowed_zoom_shift_clears_the_slice() {
		let source = Arc::new(MemoryByteSource::new());
		let c = coordinator(8, 1, 4, source);
		c.update_indirection_window_center(14, 10_000, 10_000);
		c.indirection.write().unwrap().set_tile_layer(TileCoordinate::new(10_000, 10_000, 14), 7);
		c.update_indirection_window_center(14, 10_100, 10_000);
		assert_eq!(c.indirection.read().unwrap().get_tile_layer(TileCoordinate::new(10_000, 10_000, 14)), None);
	}

	#[test]
	fn backpressure_visibility_reports_exact_admitted_count() {
		let source = Arc::new(MemoryByteSource::new());
		// zero workers: nothing drains the submissions before we check.
		let c = coordinator(512, 0, 4, source);
		let tiles: Vec<TileCoordinate> = (0..300).map(|i| TileCoordinate::new(i, 0, 20)).collect();
		c.request_tiles(&tiles, 0);
		assert_eq!(c.get_pending_load_count(), 300);
	}

	#[test]
	fn repeated_request_for_the_same_tile_is_idempotent() {
		let source = Arc::new(MemoryByteSource::new());
		let c = coordinator(4, 0, 4, source);
		let coord = TileCoordinate::new(1, 1, 1);
		c.request_tiles(&[coord], 0);
		c.request_tiles(&[coord], 0);
		assert_eq!(c.get_pending_load_count(), 1);
	}
}
