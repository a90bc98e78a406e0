//! Public surface for the `yads-node` crate.
//!
//! Exposes the router builder, storage backends and config types so that
//! external crates (e.g. the conformance test suite) can spin up an
//! in-process node without spawning a subprocess.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod seed;
pub mod storage;

pub use config::{ConfigError, NodeConfig};
pub use router::build_router;
pub use seed::load_fixtures;
pub use storage::{memory::MemoryStorage, sqlite::SqliteStorage, Storage};
