//! The tile-byte source contract (C1): produces encoded tile bytes for a
//! tile coordinate, from a cache or a network endpoint.
//!
//! Blocking by design — workers call this off the condition-variable wait,
//! not from an async executor (see the crate's concurrency notes).

use crate::{Blob, TileBytes, TileCoordinate, TileStreamError};
use anyhow::{Result, bail};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Mutex;
use std::time::Duration;

/// A source of encoded tile bytes. Implementations must be safe to call
/// concurrently from many worker threads.
pub trait ByteSource: Debug + Send + Sync {
	/// Fetches the encoded bytes for `coord`. Blocking.
	fn load(&self, coord: TileCoordinate) -> Result<TileBytes>;
}

/// Fetches tiles from an HTTP endpoint templated on `{z}/{x}/{y}`.
///
/// Uses a blocking `reqwest` client so it can be called directly from a
/// worker thread without involving an async runtime.
#[derive(Debug)]
pub struct HttpByteSource {
	client: reqwest::blocking::Client,
	url_template: String,
}

impl HttpByteSource {
	/// Builds a source from a URL template containing `{z}`, `{x}`, `{y}`
	/// placeholders, e.g. `https://tiles.example.com/{z}/{x}/{y}.png`.
	///
	/// Returns `TileStreamError::Construction` on a malformed template or a
	/// client the underlying HTTP library refuses to build — both are
	/// construction-time failures a caller may want to match on directly,
	/// not the internal `anyhow` plumbing `load()` uses.
	pub fn new(url_template: impl Into<String>) -> Result<Self, TileStreamError> {
		let url_template = url_template.into();
		if !url_template.contains("{z}") || !url_template.contains("{x}") || !url_template.contains("{y}") {
			return Err(TileStreamError::Construction(format!(
				"url template '{url_template}' is missing a {{z}}/{{x}}/{{y}} placeholder"
			)));
		}
		let client = reqwest::blocking::Client::builder()
			.tcp_keepalive(Duration::from_secs(600))
			.build()
			.map_err(|e| TileStreamError::Construction(format!("failed to build HTTP client: {e}")))?;
		Ok(Self { client, url_template })
	}

	fn url_for(&self, coord: TileCoordinate) -> String {
		self
			.url_template
			.replace("{z}", &coord.zoom.to_string())
			.replace("{x}", &coord.x.to_string())
			.replace("{y}", &coord.y.to_string())
	}
}

impl ByteSource for HttpByteSource {
	fn load(&self, coord: TileCoordinate) -> Result<TileBytes> {
		let url = self.url_for(coord);
		let response = self.client.get(&url).send()?;
		if !response.status().is_success() {
			bail!("tile source returned {} for {url}", response.status());
		}
		let content_type = response
			.headers()
			.get(reqwest::header::CONTENT_TYPE)
			.and_then(|v| v.to_str().ok())
			.unwrap_or("application/octet-stream")
			.to_string();
		let bytes = response.bytes()?;
		Ok(TileBytes::new(coord, Blob::from(bytes.as_ref()), content_type))
	}
}

/// An in-memory byte source, useful as a test double and for the demo
/// binary. Coordinates not present in the map fail with an error, exactly
/// as a real network miss would.
#[derive(Debug, Default)]
pub struct MemoryByteSource {
	tiles: Mutex<HashMap<TileCoordinate, TileBytes>>,
}

impl MemoryByteSource {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&self, coord: TileCoordinate, bytes: TileBytes) {
		self.tiles.lock().unwrap().insert(coord, bytes);
	}
}

impl ByteSource for MemoryByteSource {
	fn load(&self, coord: TileCoordinate) -> Result<TileBytes> {
		self
			.tiles
			.lock()
			.unwrap()
			.get(&coord)
			.cloned()
			.ok_or_else(|| anyhow::anyhow!("no tile bytes registered for {coord}"))
	}
}
