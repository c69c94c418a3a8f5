//! The worker pool (C4): N stateless OS threads competing on a shared
//! priority queue, deduplicating in-flight requests.
//!
//! Grounded in the pack's `Condvar`-guarded priority queue pattern (e.g.
//! `examples/zaari-garta/src/core/tiles.rs`'s `TileRequestQueue`), adapted to
//! `std::sync::{Mutex, Condvar}` and a `BinaryHeap` max-heap as spec.md §5
//! prescribes for this component (a deliberate divergence from the teacher's
//! `tokio`-first idiom, justified in the crate-level docs).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use tile_core::{ByteSource, TileByteCache, TileCoordinate, TileStreamError};

use crate::upload_queue::{CompletionHook, DecodedTile, UploadQueue};

struct Request {
	coord: TileCoordinate,
	priority: i32,
	seq: u64,
	on_complete: Option<CompletionHook>,
}

/// Lower numeric priority ranks higher; ties are broken FIFO by submission
/// order. `BinaryHeap` is a max-heap, so both fields are compared in
/// reverse to make "lowest priority, earliest seq" sort greatest.
impl Ord for Request {
	fn cmp(&self, other: &Self) -> Ordering {
		other.priority.cmp(&self.priority).then_with(|| other.seq.cmp(&self.seq))
	}
}
impl PartialOrd for Request {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
impl PartialEq for Request {
	fn eq(&self, other: &Self) -> bool {
		self.priority == other.priority && self.seq == other.seq
	}
}
impl Eq for Request {}

struct Shared {
	queue: BinaryHeap<Request>,
	dedup: HashSet<TileCoordinate>,
	shutdown: bool,
	next_seq: u64,
}

/// N long-lived worker threads draining a shared priority queue. Dropping
/// the pool signals shutdown and joins every worker.
pub struct WorkerPool {
	state: Arc<Mutex<Shared>>,
	condvar: Arc<Condvar>,
	handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
	#[must_use]
	pub fn new(
		worker_thread_count: u32,
		cache: Arc<TileByteCache>,
		source: Arc<dyn ByteSource>,
		upload_queue: Arc<UploadQueue>,
		tile_size: u32,
	) -> Self {
		let state = Arc::new(Mutex::new(Shared {
			queue: BinaryHeap::new(),
			dedup: HashSet::new(),
			shutdown: false,
			next_seq: 0,
		}));
		let condvar = Arc::new(Condvar::new());

		let handles = (0..worker_thread_count)
			.map(|_| {
				let state = Arc::clone(&state);
				let condvar = Arc::clone(&condvar);
				let cache = Arc::clone(&cache);
				let source = Arc::clone(&source);
				let upload_queue = Arc::clone(&upload_queue);
				thread::spawn(move || worker_loop(&state, &condvar, &cache, &*source, &upload_queue, tile_size))
			})
			.collect();

		Self { state, condvar, handles }
	}

	/// Enqueues a tile fetch at `priority`. A no-op if `coord` is already
	/// in flight (I4: at most one in-flight request per coordinate).
	pub fn submit(&self, coord: TileCoordinate, priority: i32, on_complete: Option<CompletionHook>) {
		let mut state = self.state.lock().unwrap();
		if !state.dedup.insert(coord) {
			return;
		}
		let seq = state.next_seq;
		state.next_seq += 1;
		state.queue.push(Request { coord, priority, seq, on_complete });
		self.condvar.notify_one();
	}

	#[must_use]
	pub fn pending_count(&self) -> usize {
		self.state.lock().unwrap().queue.len()
	}
}

impl Drop for WorkerPool {
	fn drop(&mut self) {
		self.state.lock().unwrap().shutdown = true;
		self.condvar.notify_all();
		for handle in self.handles.drain(..) {
			let _ = handle.join();
		}
	}
}

fn worker_loop(
	state: &Arc<Mutex<Shared>>,
	condvar: &Condvar,
	cache: &TileByteCache,
	source: &dyn ByteSource,
	upload_queue: &UploadQueue,
	tile_size: u32,
) {
	loop {
		let request = {
			let mut guard = state.lock().unwrap();
			loop {
				if let Some(request) = guard.queue.pop() {
					break request;
				}
				if guard.shutdown {
					return;
				}
				guard = condvar.wait(guard).unwrap();
			}
		};

		match fetch_and_decode(cache, source, tile_size, request.coord) {
			Ok((pixels, width, height)) => {
				upload_queue.push(DecodedTile {
					coord: request.coord,
					pixels,
					width,
					height,
					on_complete: request.on_complete,
				});
			}
			Err(err) => {
				log::warn!("worker step failed: {err}");
			}
		}

		state.lock().unwrap().dedup.remove(&request.coord);
	}
}

/// Steps 1–3 of the worker step: cache lookup (falling back to the byte
/// source), then decode to RGBA8 at `tile_size`, forcing 4 channels — a
/// contract the texture pool (C5) relies on. Byte-source and decode
/// failures surface through the matching typed `TileStreamError` variant
/// (error taxonomy categories 2/3) rather than an opaque `anyhow::Error`,
/// even though this worker step only ever logs them.
fn fetch_and_decode(
	cache: &TileByteCache,
	source: &dyn ByteSource,
	tile_size: u32,
	coord: TileCoordinate,
) -> Result<(Vec<u8>, u32, u32), TileStreamError> {
	let bytes = match cache.get(coord) {
		Some(bytes) => bytes,
		None => {
			let bytes = source.load(coord).map_err(|err| TileStreamError::Source { coord, source: err })?;
			cache.put(bytes.clone());
			bytes
		}
	};

	let image =
		image::load_from_memory(bytes.data.as_slice()).map_err(|e| TileStreamError::Decode { coord, source: anyhow::Error::new(e) })?;
	let rgba = image.to_rgba8();
	if rgba.width() != tile_size || rgba.height() != tile_size {
		return Err(TileStreamError::Decode {
			coord,
			source: anyhow::anyhow!("decoded tile is {}x{}, expected {tile_size}x{tile_size}", rgba.width(), rgba.height()),
		});
	}
	Ok((rgba.into_raw(), tile_size, tile_size))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Mutex as StdMutex;
	use std::time::Duration;
	use tile_core::{Blob, TileBytes, TileCacheConfig};

	fn png_bytes(size: u32) -> Vec<u8> {
		let img = image::RgbaImage::from_pixel(size, size, image::Rgba([1, 2, 3, 255]));
		let mut buf = Vec::new();
		image::DynamicImage::ImageRgba8(img)
			.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
			.unwrap();
		buf
	}

	#[test]
	fn dedup_prevents_a_second_submission_while_in_flight() {
		let source = Arc::new(tile_core::MemoryByteSource::new());
		let coord = TileCoordinate::new(5, 5, 5);
		source.insert(coord, TileBytes::new(coord, Blob::from(png_bytes(4)), "image/png"));

		let cache = Arc::new(TileByteCache::new(&TileCacheConfig::default()));
		let upload_queue = Arc::new(UploadQueue::new());
		let pool = WorkerPool::new(1, cache, source, Arc::clone(&upload_queue), 4);

		let seen = Arc::new(StdMutex::new(0u32));
		for priority in [9, 8, 7, 6, 5, 4, 3, 2, 1, 0] {
			let seen = Arc::clone(&seen);
			pool.submit(
				coord,
				priority,
				Some(Box::new(move |_| {
					*seen.lock().unwrap() += 1;
				})),
			);
		}

		// Give the single worker a moment to process the admitted request.
		for _ in 0..200 {
			if !upload_queue.is_empty() {
				break;
			}
			thread::sleep(Duration::from_millis(5));
		}

		assert_eq!(upload_queue.len(), 1, "exactly one decoded tile should be enqueued");
	}

	#[test]
	fn pending_count_reflects_queued_not_yet_popped_requests() {
		let source = Arc::new(tile_core::MemoryByteSource::new());
		let cache = Arc::new(TileByteCache::new(&TileCacheConfig::default()));
		let upload_queue = Arc::new(UploadQueue::new());
		// Zero workers: nothing pops the queue, so submissions stay pending.
		let pool = WorkerPool::new(0, cache, source, upload_queue, 4);
		pool.submit(TileCoordinate::new(1, 1, 1), 0, None);
		pool.submit(TileCoordinate::new(2, 2, 1), 0, None);
		assert_eq!(pool.pending_count(), 2);
	}
}
