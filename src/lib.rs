//! # Linkstore
//!
//! The persistence and identifier-generation engine behind a link
//! shortener: an in-memory keyed store, a deterministic reversible
//! short-key generator, an append-only durability journal, periodic
//! atomic snapshots, and startup recovery that reconciles the two.
//!
//! ## Core Concepts
//!
//! - **Short keys**: derived from a monotonic counter via a bijective
//!   scramble plus base-62 encoding, collision-free without lookups
//! - **Store**: one table plus counter behind a single reader/writer lock
//! - **Journal**: one JSON line per committed mutation, written by a
//!   dedicated single-writer thread
//! - **Snapshots**: periodic full-state files, written atomically via
//!   temp-file-plus-rename; each successful snapshot clears the journal
//! - **Recovery**: snapshot load plus last-write-wins journal replay,
//!   tolerant of missing or partly corrupt files
//!
//! ## Example
//!
//! ```ignore
//! use linkstore::{EngineConfig, LinkEngine};
//!
//! let engine = LinkEngine::open(EngineConfig {
//!     path: "./links".into(),
//!     ..Default::default()
//! })?;
//!
//! let key = engine.shorten("https://example.com");
//! let url = engine.resolve(&key)?; // counts the visit
//! ```

pub mod codec;
pub mod engine;
pub mod error;
pub mod journal;
pub mod recovery;
pub mod snapshot;
pub mod store;
pub mod types;

// Re-exports
pub use engine::{EngineConfig, LinkEngine};
pub use error::{Result, StoreError};
pub use journal::Journal;
pub use recovery::{recover, RecoveryReport};
pub use snapshot::{read_snapshot, write_snapshot, SnapshotManager};
pub use store::UrlStore;
pub use types::{LogEntry, StoreState, StoreStats, UrlRecord};
