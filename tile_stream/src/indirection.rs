//! The per-zoom indirection table (C6): a lookup from tile coordinate to
//! pool-layer index, itself mirrored to a GPU texture.
//!
//! Like the texture pool, this component is rendering-thread-only and has
//! no internal synchronization; see `coordinator.rs` for how it's shared.

use std::collections::HashMap;
use std::sync::Arc;

use tile_core::TileCoordinate;

use crate::gpu_backend::{GpuBackend, GpuHandle};

/// Encodes "no tile" in the indirection grid.
pub const SENTINEL: u16 = 0xFFFF;

const WINDOW_SIZE: u32 = 512;
const HALF_WINDOW: i32 = 256;

struct ZoomSlice {
	side: u32,
	windowed: bool,
	grid: Vec<u16>,
	texture: GpuHandle,
	window_offset: (i32, i32),
}

impl ZoomSlice {
	fn new(gpu: &Arc<dyn GpuBackend>, zoom: u8, side: u32, windowed: bool, window_offset: (i32, i32)) -> Self {
		let texture = gpu.create_indirection_texture(zoom, side);
		Self { side, windowed, grid: vec![SENTINEL; (side * side) as usize], texture, window_offset }
	}

	/// Resolves `coord` to local texel coordinates, or `None` if it falls
	/// outside a windowed slice (the contract that makes windowing safe).
	fn texel_xy(&self, coord: TileCoordinate) -> Option<(u32, u32)> {
		if self.windowed {
			let tx = coord.x - self.window_offset.0;
			let ty = coord.y - self.window_offset.1;
			if tx < 0 || ty < 0 || tx as u32 >= self.side || ty as u32 >= self.side {
				return None;
			}
			Some((tx as u32, ty as u32))
		} else {
			Some((coord.x as u32, coord.y as u32))
		}
	}

	fn index_of(&self, x: u32, y: u32) -> usize {
		(y * self.side + x) as usize
	}
}

/// Per-zoom-level indirection slices, lazily allocated on first write.
pub struct IndirectionTable {
	gpu: Arc<dyn GpuBackend>,
	max_full_indirection_zoom: u8,
	window_size: u32,
	slices: HashMap<u8, ZoomSlice>,
}

impl IndirectionTable {
	#[must_use]
	pub fn new(gpu: Arc<dyn GpuBackend>, max_full_indirection_zoom: u8, window_size: u32) -> Self {
		Self { gpu, max_full_indirection_zoom, window_size, slices: HashMap::new() }
	}

	fn side_and_mode(&self, zoom: u8) -> (u32, bool) {
		if zoom <= self.max_full_indirection_zoom {
			(1u32 << zoom, false)
		} else {
			(self.window_size, true)
		}
	}

	fn ensure_slice(&mut self, zoom: u8) -> &mut ZoomSlice {
		let gpu = Arc::clone(&self.gpu);
		let (side, windowed) = self.side_and_mode(zoom);
		self
			.slices
			.entry(zoom)
			.or_insert_with(|| ZoomSlice::new(&gpu, zoom, side, windowed, (0, 0)))
	}

	/// Resolves the texel for `coord` and writes `layer` into it. Silently
	/// dropped if the slice is windowed and `coord` falls outside the
	/// current window (error category 5: no log).
	pub fn set_tile_layer(&mut self, coord: TileCoordinate, layer: u32) {
		let gpu = Arc::clone(&self.gpu);
		let slice = self.ensure_slice(coord.zoom);
		let Some((x, y)) = slice.texel_xy(coord) else { return };
		let idx = slice.index_of(x, y);
		slice.grid[idx] = layer as u16;
		gpu.write_indirection_texel(slice.texture, x, y, layer as u16);
	}

	/// Resets `coord`'s texel to the sentinel. No-op if no slice exists yet
	/// for its zoom, or if `coord` is outside a windowed slice.
	pub fn clear_tile(&mut self, coord: TileCoordinate) {
		let Some(slice) = self.slices.get_mut(&coord.zoom) else { return };
		let Some((x, y)) = slice.texel_xy(coord) else { return };
		let idx = slice.index_of(x, y);
		slice.grid[idx] = SENTINEL;
		self.gpu.write_indirection_texel(slice.texture, x, y, SENTINEL);
	}

	#[must_use]
	pub fn get_tile_layer(&self, coord: TileCoordinate) -> Option<u32> {
		let slice = self.slices.get(&coord.zoom)?;
		let (x, y) = slice.texel_xy(coord)?;
		let value = slice.grid[slice.index_of(x, y)];
		(value != SENTINEL).then_some(u32::from(value))
	}

	#[must_use]
	pub fn get_texture_id(&self, zoom: u8) -> GpuHandle {
		self.slices.get(&zoom).map_or(GpuHandle::NONE, |s| s.texture)
	}

	#[must_use]
	pub fn get_window_offset(&self, zoom: u8) -> (i32, i32) {
		self.slices.get(&zoom).map_or((0, 0), |s| s.window_offset)
	}

	/// Recenters the windowed slice for `zoom` on tile `(cx, cy)`. A
	/// `delta == (0, 0)` is a no-op. Any other delta clears the whole slice
	/// and adopts the new offset — including the "jumped past itself" case
	/// (`|delta| >= window/2`), which this crate does not distinguish from
	/// a smaller non-zero delta: both end in the same cleared state, and
	/// spec.md explicitly permits either behavior exactly at the boundary.
	///
	/// TODO: shift the overlapping region in place instead of clearing the
	/// whole slice; deferred per spec.md §9, the ~0.5 MiB clear is cheap
	/// enough for now.
	pub fn update_window_center(&mut self, zoom: u8, center_x: i32, center_y: i32) {
		let new_offset = (center_x - HALF_WINDOW, center_y - HALF_WINDOW);
		if let Some(slice) = self.slices.get_mut(&zoom) {
			if !slice.windowed || slice.window_offset == new_offset {
				return;
			}
			slice.grid.iter_mut().for_each(|v| *v = SENTINEL);
			self.gpu.clear_indirection_texture(slice.texture, slice.side);
			slice.window_offset = new_offset;
		} else {
			let (side, windowed) = self.side_and_mode(zoom);
			let gpu = Arc::clone(&self.gpu);
			let offset = if windowed { new_offset } else { (0, 0) };
			self.slices.insert(zoom, ZoomSlice::new(&gpu, zoom, side, windowed, offset));
		}
	}

	pub fn release_zoom(&mut self, zoom: u8) {
		self.slices.remove(&zoom);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gpu_backend::MockGpuBackend;

	fn table() -> IndirectionTable {
		IndirectionTable::new(Arc::new(MockGpuBackend::new()), 12, WINDOW_SIZE)
	}

	#[test]
	fn full_mode_round_trips_through_set_and_get() {
		let mut t = table();
		let coord = TileCoordinate::new(2, 2, 2);
		t.set_tile_layer(coord, 7);
		assert_eq!(t.get_tile_layer(coord), Some(7));
	}

	#[test]
	fn zoom_zero_is_a_single_texel_full_slice() {
		let mut t = table();
		let coord = TileCoordinate::new(0, 0, 0);
		t.set_tile_layer(coord, 3);
		assert_eq!(t.get_tile_layer(coord), Some(3));
	}

	#[test]
	fn windowed_write_outside_the_window_is_silently_dropped() {
		let mut t = table();
		// zoom 14 > cutoff 12, so it's windowed with default offset (0,0)
		// and side 512: a tile far outside [0, 512) falls outside.
		let coord = TileCoordinate::new(100_000, 100_000, 14);
		t.set_tile_layer(coord, 1);
		assert_eq!(t.get_tile_layer(coord), None);
	}

	#[test]
	fn recenter_with_zero_delta_is_a_noop() {
		let mut t = table();
		t.update_window_center(14, 10_000, 10_000);
		let coord = TileCoordinate::new(10_000, 10_000, 14);
		t.set_tile_layer(coord, 7);
		t.update_window_center(14, 10_000, 10_000);
		assert_eq!(t.get_tile_layer(coord), Some(7));
	}

	#[test]
	fn recenter_with_nonzero_delta_clears_the_slice() {
		let mut t = table();
		t.update_window_center(14, 10_000, 10_000);
		let coord = TileCoordinate::new(10_000, 10_000, 14);
		t.set_tile_layer(coord, 7);
		t.update_window_center(14, 10_100, 10_000);
		assert_eq!(t.get_tile_layer(coord), None);
	}

	#[test]
	fn release_zoom_drops_the_slice_entirely() {
		let mut t = table();
		let coord = TileCoordinate::new(0, 0, 0);
		t.set_tile_layer(coord, 1);
		t.release_zoom(0);
		assert_eq!(t.get_tile_layer(coord), None);
		assert_eq!(t.get_texture_id(0), GpuHandle::NONE);
	}
}
