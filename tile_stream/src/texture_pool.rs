//! The texture pool (C5): a fixed-capacity set of GPU tile slots backed by
//! one texture array, with an explicit (never automatic) eviction contract.
//!
//! Not thread-safe by design (spec.md §5): every call must come from the
//! rendering thread. Callers that need to share a `TexturePool` across
//! threads (the coordinator's read-mostly queries) wrap it in a `RwLock`
//! themselves — see `coordinator.rs`.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use tile_core::{TileCoordinate, TileStreamError};

use crate::gpu_backend::{GpuBackend, GpuHandle};

struct PoolLayer {
	coord: Option<TileCoordinate>,
	occupied: bool,
	last_used: Instant,
}

/// Fixed-capacity GPU tile pool. Layer count never changes after
/// construction (I2: `|free| + |occupied| == max_layers`).
pub struct TexturePool {
	gpu: Arc<dyn GpuBackend>,
	handle: GpuHandle,
	tile_size: u32,
	layers: Vec<PoolLayer>,
	free: VecDeque<u32>,
	resident: HashMap<TileCoordinate, u32>,
}

impl TexturePool {
	#[must_use]
	pub fn new(gpu: Arc<dyn GpuBackend>, tile_size: u32, max_layers: u32) -> Self {
		let handle = gpu.create_tile_pool(tile_size, max_layers);
		let now = Instant::now();
		let layers = (0..max_layers)
			.map(|_| PoolLayer { coord: None, occupied: false, last_used: now })
			.collect();
		let free = (0..max_layers).collect();
		Self { gpu, handle, tile_size, layers, free, resident: HashMap::new() }
	}

	#[must_use]
	pub fn texture_id(&self) -> GpuHandle {
		self.handle
	}

	#[must_use]
	pub fn max_layers(&self) -> usize {
		self.layers.len()
	}

	#[must_use]
	pub fn free_count(&self) -> usize {
		self.free.len()
	}

	/// Uploads `pixels` for `coord`. Rejects mismatched dimensions or
	/// channel counts (category 1 of the error taxonomy); re-uploads in
	/// place if `coord` is already resident; otherwise claims a free layer.
	/// Returns `PoolExhausted` if the free list is empty — the caller (C7)
	/// is responsible for evicting first.
	pub fn upload_tile(&mut self, coord: TileCoordinate, pixels: &[u8], w: u32, h: u32, channels: u32) -> Result<u32, TileStreamError> {
		if pixels.is_empty() || w != self.tile_size || h != self.tile_size || channels != 4 {
			log::warn!("rejected tile upload for {coord}: {w}x{h}x{channels}, expected {0}x{0}x4", self.tile_size);
			return Err(TileStreamError::RequestRejected(format!("invalid tile payload for {coord}")));
		}

		if let Some(&layer) = self.resident.get(&coord) {
			self.gpu.upload_layer(self.handle, layer, pixels, w, h);
			self.layers[layer as usize].last_used = Instant::now();
			return Ok(layer);
		}

		let layer = self.free.pop_front().ok_or(TileStreamError::PoolExhausted)?;
		self.gpu.upload_layer(self.handle, layer, pixels, w, h);
		let slot = &mut self.layers[layer as usize];
		slot.coord = Some(coord);
		slot.occupied = true;
		slot.last_used = Instant::now();
		self.resident.insert(coord, layer);
		Ok(layer)
	}

	/// The LRU occupied layer's tile coordinate, or `None` if the pool has
	/// no occupied layers at all.
	#[must_use]
	pub fn find_eviction_candidate(&self) -> Option<TileCoordinate> {
		self.layers.iter().filter(|l| l.occupied).min_by_key(|l| l.last_used).and_then(|l| l.coord)
	}

	/// Idempotent: frees the layer and removes the map entry, or no-ops if
	/// `coord` was not resident.
	pub fn evict_tile(&mut self, coord: TileCoordinate) {
		if let Some(layer) = self.resident.remove(&coord) {
			let slot = &mut self.layers[layer as usize];
			slot.coord = None;
			slot.occupied = false;
			self.free.push_back(layer);
		}
	}

	/// Updates `last_used` without re-uploading, called by the renderer
	/// each frame for tiles it actually drew.
	pub fn touch_tile(&mut self, coord: TileCoordinate) {
		if let Some(&layer) = self.resident.get(&coord) {
			self.layers[layer as usize].last_used = Instant::now();
		}
	}

	#[must_use]
	pub fn is_tile_loaded(&self, coord: TileCoordinate) -> bool {
		self.resident.contains_key(&coord)
	}

	#[must_use]
	pub fn layer_index(&self, coord: TileCoordinate) -> Option<u32> {
		self.resident.get(&coord).copied()
	}
}
