//! The GL upload queue (C3): an unbounded FIFO of `DecodedTile`s, written by
//! worker threads and drained, a bounded count at a time, by the rendering
//! thread's `process_uploads`.

use std::collections::VecDeque;
use std::sync::Mutex;

use tile_core::TileCoordinate;

/// Invoked once a tile's upload has been fully committed (texture upload +
/// indirection write + state transition) by `process_uploads`.
pub type CompletionHook = Box<dyn FnOnce(TileCoordinate) + Send>;

/// A fully decoded tile, owned exclusively by whichever side holds it —
/// a worker thread until pushed, the rendering thread after popping.
pub struct DecodedTile {
	pub coord: TileCoordinate,
	pub pixels: Vec<u8>,
	pub width: u32,
	pub height: u32,
	pub on_complete: Option<CompletionHook>,
}

impl std::fmt::Debug for DecodedTile {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DecodedTile")
			.field("coord", &self.coord)
			.field("width", &self.width)
			.field("height", &self.height)
			.field("pixels_len", &self.pixels.len())
			.finish_non_exhaustive()
	}
}

/// Multi-producer, single/multi-consumer FIFO. `try_pop` never blocks: the
/// rendering thread must never wait on queue contents.
#[derive(Default)]
pub struct UploadQueue {
	inner: Mutex<VecDeque<DecodedTile>>,
}

impl UploadQueue {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&self, tile: DecodedTile) {
		self.inner.lock().unwrap().push_back(tile);
	}

	#[must_use]
	pub fn try_pop(&self) -> Option<DecodedTile> {
		self.inner.lock().unwrap().pop_front()
	}

	/// Approximate size; callers must not rely on this for correctness.
	#[must_use]
	pub fn len(&self) -> usize {
		self.inner.lock().unwrap().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
