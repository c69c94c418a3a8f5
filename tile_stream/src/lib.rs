//! C3–C7 of the tile streaming core: the GL upload queue, worker pool, GPU
//! texture pool, per-zoom indirection table, and the public `Coordinator`
//! façade that composes them — plus the `GpuBackend` abstraction that lets
//! this crate compile and test without a live GPU context.

pub mod coordinator;
pub mod gpu_backend;
pub mod indirection;
pub mod texture_pool;
pub mod upload_queue;
pub mod worker_pool;

pub use coordinator::{Coordinator, TileStatus};
pub use gpu_backend::{GpuBackend, GpuHandle, MockGpuBackend};
pub use indirection::IndirectionTable;
pub use texture_pool::TexturePool;
pub use upload_queue::{CompletionHook, DecodedTile, UploadQueue};
pub use worker_pool::WorkerPool;
