//! Manual exercise of the tile streaming core: wires an in-memory byte
//! source and the mock GPU backend to the coordinator, requests a small grid
//! of tiles, and drains the pipeline while reporting progress — living
//! documentation of the public API rather than a real renderer.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use tile_core::{Blob, MemoryByteSource, TileByteCache, TileCacheConfig, TileCoordinate, TileStreamConfig};
use tile_stream::{Coordinator, MockGpuBackend};

/// Requests a small quadtree of synthetic tiles and drains the pipeline.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
	/// Deepest zoom level to request (tiles 0..2^zoom on each side).
	#[arg(long, default_value_t = 2)]
	zoom: u8,

	/// Worker thread count (C4).
	#[arg(long, default_value_t = 4)]
	workers: u32,

	/// GPU texture-array depth (C5).
	#[arg(long, default_value_t = 64)]
	max_pool_layers: u32,

	/// Edge length of each synthetic tile, in pixels.
	#[arg(long, default_value_t = 64)]
	tile_size: u32,
}

fn main() -> Result<()> {
	env_logger::Builder::new().filter_level(log::LevelFilter::Info).format_timestamp(None).init();

	let cli = Cli::parse();
	let limits = tile_core::ConcurrencyLimits::default();
	log::info!("host reports {} logical CPUs (io_bound suggestion: {})", tile_core::ConcurrencyLimits::cpu_count(), limits.io_bound);

	let source = Arc::new(MemoryByteSource::new());
	let tiles = seed_tiles(&source, cli.zoom, cli.tile_size)?;

	let cache = Arc::new(TileByteCache::new(&TileCacheConfig::default()));
	let config = TileStreamConfig::default()
		.with_tile_size(cli.tile_size)
		.with_max_pool_layers(cli.max_pool_layers)
		.with_worker_thread_count(cli.workers);
	let coordinator = Coordinator::new(config, cache, source, Arc::new(MockGpuBackend::new()));

	log::info!("requesting {} tiles up to zoom {}", tiles.len(), cli.zoom);
	coordinator.request_tiles(&tiles, 0);

	while coordinator.get_pending_load_count() > 0 {
		thread::sleep(Duration::from_millis(10));
		coordinator.process_uploads(Some(5));
	}
	coordinator.process_uploads(Some(tiles.len() as u32));

	let ready = tiles.iter().filter(|&&c| coordinator.is_tile_ready(c)).count();
	log::info!("{ready}/{} tiles ready, pool texture id = {:?}", tiles.len(), coordinator.get_tile_pool_texture_id());

	let evicted = coordinator.evict_unused_tiles(Some(Duration::from_secs(0)));
	log::info!("evicted {evicted} tiles older than 0s (demo teardown)");

	Ok(())
}

/// Registers one solid-color PNG per tile coordinate in `0..zoom` and
/// returns the full coordinate list, shallowest zoom first.
fn seed_tiles(source: &MemoryByteSource, zoom: u8, tile_size: u32) -> Result<Vec<TileCoordinate>> {
	let mut tiles = Vec::new();
	for z in 0..=zoom {
		let side = TileCoordinate::tiles_per_side(z);
		for y in 0..side.min(4) {
			for x in 0..side.min(4) {
				let coord = TileCoordinate::new(x as i32, y as i32, z);
				let pixel = [((x * 37) % 255) as u8, ((y * 53) % 255) as u8, (z as u32 * 29 % 255) as u8, 255];
				let img = image::RgbaImage::from_pixel(tile_size, tile_size, image::Rgba(pixel));
				let mut buf = Vec::new();
				image::DynamicImage::ImageRgba8(img).write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)?;
				source.insert(coord, tile_core::TileBytes::new(coord, Blob::from(buf), "image/png"));
				tiles.push(coord);
			}
		}
	}
	Ok(tiles)
}
