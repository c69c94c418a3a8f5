//! The public error taxonomy.
//!
//! Internal plumbing (cache I/O, HTTP fetch, config validation) keeps the
//! `anyhow` idiom used throughout this workspace. This enum exists for the
//! small set of failure categories a caller embedding the streaming core may
//! want to match on directly — see the crate-level error handling notes for
//! the propagation policy (most categories are logged and swallowed, never
//! surfaced here).

use crate::TileCoordinate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TileStreamError {
	#[error("invalid tile payload: {0}")]
	RequestRejected(String),

	#[error("tile source failed for {coord}: {source}")]
	Source {
		coord: TileCoordinate,
		#[source]
		source: anyhow::Error,
	},

	#[error("tile decode failed for {coord}: {source}")]
	Decode {
		coord: TileCoordinate,
		#[source]
		source: anyhow::Error,
	},

	#[error("pool exhausted and no eviction candidate available")]
	PoolExhausted,

	#[error("construction failed: {0}")]
	Construction(String),
}
