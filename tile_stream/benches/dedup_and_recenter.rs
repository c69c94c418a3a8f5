use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use tile_stream::gpu_backend::MockGpuBackend;
use tile_stream::indirection::IndirectionTable;
use tile_stream::GpuBackend;
use tile_core::TileCoordinate;

fn bench_recenter_clear_cost(c: &mut Criterion) {
	c.bench_function("indirection_recenter_clear_512", |b| {
		let gpu: Arc<dyn GpuBackend> = Arc::new(MockGpuBackend::new());
		let mut table = IndirectionTable::new(gpu, 12, 512);
		table.update_window_center(14, 10_000, 10_000);
		for i in 0..1000 {
			table.set_tile_layer(TileCoordinate::new(10_000 + i % 400, 10_000, 14), (i % 512) as u32);
		}
		let mut cx = 10_100;
		b.iter(|| {
			table.update_window_center(14, black_box(cx), 10_000);
			cx += 1;
		});
	});
}

criterion_group!(dedup_and_recenter, bench_recenter_clear_cost);
criterion_main!(dedup_and_recenter);
