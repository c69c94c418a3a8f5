//! The on-disk tier of the tile-byte cache.
//!
//! One file per tile coordinate, named by percent-encoding the coordinate's
//! cache key — the same scheme the teacher's on-disk cache uses for
//! arbitrary string keys, specialized here to a fixed `z/x/y` key. Writes go
//! through a temp file and an atomic rename so a reader never observes a
//! half-written entry.

use super::traits::CacheTier;
use crate::{Blob, TileBytes, TileByteMetadata, TileCoordinate};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub struct DiskTier {
	root: PathBuf,
}

impl DiskTier {
	pub fn new(root: PathBuf) -> Self {
		fs::create_dir_all(&root).ok();
		Self { root }
	}

	fn cache_key(coord: TileCoordinate) -> String {
		format!("{}_{}_{}", coord.zoom, coord.x, coord.y)
	}

	fn entry_path(&self, coord: TileCoordinate) -> PathBuf {
		let name = Self::cache_key(coord)
			.bytes()
			.map(|b| {
				if (b as char).is_ascii_alphanumeric() || b == b'_' || b == b'-' {
					(b as char).to_string()
				} else {
					format!("%{b:02x}")
				}
			})
			.collect::<String>();
		self.root.join(format!("{name}.tile"))
	}

	/// Reads and decodes an entry, distinguishing a missing file (`Ok(None)`)
	/// from a corrupt one (`Err`, short header or truncated payload) so the
	/// cache above can count corruptions separately from plain misses.
	pub(crate) fn get_checked(&self, coord: TileCoordinate) -> anyhow::Result<Option<TileBytes>> {
		Self::read_entry(&self.entry_path(coord), coord)
	}

	fn read_entry(path: &Path, coord: TileCoordinate) -> anyhow::Result<Option<TileBytes>> {
		if !path.exists() {
			return Ok(None);
		}
		let mut file = File::open(path)?;
		let mut raw = Vec::new();
		file.read_to_end(&mut raw)?;
		if raw.len() < 2 {
			anyhow::bail!("truncated cache entry header");
		}
		let ct_len = u16::from_le_bytes([raw[0], raw[1]]) as usize;
		if raw.len() < 2 + ct_len {
			anyhow::bail!("truncated cache entry content-type");
		}
		let content_type = String::from_utf8(raw[2..2 + ct_len].to_vec())?;
		let payload = &raw[2 + ct_len..];
		Ok(Some(TileBytes {
			coord,
			data: Blob::from(payload),
			metadata: TileByteMetadata {
				content_type,
				etag: None,
				expires: None,
				size: payload.len() as u64,
				checksum: None,
				access_count: 0,
				last_access: Instant::now(),
			},
		}))
	}

	fn write_entry(path: &Path, bytes: &TileBytes) -> anyhow::Result<()> {
		let ct = bytes.metadata.content_type.as_bytes();
		let mut out = Vec::with_capacity(2 + ct.len() + bytes.data.as_slice().len());
		out.extend_from_slice(&(ct.len() as u16).to_le_bytes());
		out.extend_from_slice(ct);
		out.extend_from_slice(bytes.data.as_slice());

		let tmp_path = path.with_extension("tmp");
		let mut tmp = File::create(&tmp_path)?;
		tmp.write_all(&out)?;
		drop(tmp);
		fs::rename(&tmp_path, path)?;
		Ok(())
	}
}

impl CacheTier for DiskTier {
	fn get(&mut self, coord: TileCoordinate) -> Option<TileBytes> {
		match Self::read_entry(&self.entry_path(coord), coord) {
			Ok(found) => found,
			Err(e) => {
				log::warn!("disk cache entry for {coord} is corrupt: {e}");
				None
			}
		}
	}

	fn contains(&self, coord: TileCoordinate) -> bool {
		self.entry_path(coord).exists()
	}

	fn put(&mut self, bytes: TileBytes) {
		let path = self.entry_path(bytes.coord);
		if let Err(e) = Self::write_entry(&path, &bytes) {
			log::warn!("failed to write disk cache entry for {}: {e}", bytes.coord);
		}
	}

	fn remove(&mut self, coord: TileCoordinate) -> Option<TileBytes> {
		let path = self.entry_path(coord);
		let found = Self::read_entry(&path, coord).ok().flatten();
		if path.exists() {
			fs::remove_file(&path).ok();
		}
		found
	}

	fn clear(&mut self) {
		fs::remove_dir_all(&self.root).ok();
		fs::create_dir_all(&self.root).ok();
	}

	fn tiles_in_bounds(&self, zoom: u8, x_range: std::ops::Range<i32>, y_range: std::ops::Range<i32>) -> Vec<TileCoordinate> {
		self
			.tiles_at_zoom(zoom)
			.into_iter()
			.filter(|c| x_range.contains(&c.x) && y_range.contains(&c.y))
			.collect()
	}

	fn tiles_at_zoom(&self, zoom: u8) -> Vec<TileCoordinate> {
		let Ok(read_dir) = fs::read_dir(&self.root) else {
			return Vec::new();
		};
		let prefix = format!("{zoom}_");
		read_dir
			.filter_map(Result::ok)
			.filter_map(|entry| {
				let name = entry.file_name().into_string().ok()?;
				let stem = name.strip_suffix(".tile")?;
				if !stem.starts_with(&prefix) {
					return None;
				}
				let mut parts = stem.splitn(3, '_');
				let z: u8 = parts.next()?.parse().ok()?;
				let x: i32 = parts.next()?.parse().ok()?;
				let y: i32 = parts.next()?.parse().ok()?;
				Some(TileCoordinate::new(x, y, z))
			})
			.collect()
	}
}
