//! Encoded tile payloads and the metadata carried alongside them through the
//! cache and byte-source layers.

use crate::{Blob, TileCoordinate};
use std::time::Instant;

/// Encoded image bytes plus metadata, as produced by the tile-byte cache or
/// tile-byte source. Immutable once constructed.
#[derive(Clone, Debug)]
pub struct TileBytes {
	pub coord: TileCoordinate,
	pub data: Blob,
	pub metadata: TileByteMetadata,
}

impl TileBytes {
	#[must_use]
	pub fn new(coord: TileCoordinate, data: Blob, content_type: impl Into<String>) -> Self {
		let size = data.len();
		Self {
			coord,
			data,
			metadata: TileByteMetadata {
				content_type: content_type.into(),
				etag: None,
				expires: None,
				size,
				checksum: None,
				access_count: 0,
				last_access: Instant::now(),
			},
		}
	}

	#[must_use]
	pub fn len(&self) -> u64 {
		self.metadata.size
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.metadata.size == 0
	}
}

/// Metadata tracked per cached tile. `access_count`/`last_access` back the
/// LFU and time-based eviction policies (§4.1 of the cache design); a plain
/// LRU policy only needs `last_access`.
#[derive(Clone, Debug)]
pub struct TileByteMetadata {
	pub content_type: String,
	pub etag: Option<String>,
	pub expires: Option<Instant>,
	pub size: u64,
	pub checksum: Option<u64>,
	pub access_count: u64,
	pub last_access: Instant,
}

impl TileByteMetadata {
	pub(crate) fn touch(&mut self) {
		self.access_count += 1;
		self.last_access = Instant::now();
	}
}
