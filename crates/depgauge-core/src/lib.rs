//! depgauge Core - records, manifest parsing and persistence
//!
//! This crate provides the pure building blocks of the sizing pipeline:
//! - Repository records, size fields and sizing work items
//! - `go.mod` parsing, including `replace` redirects to inner manifests
//! - Order-preserving deduplication
//! - The repository store trait with SQLite and in-memory implementations

pub mod dedup;
pub mod manifest;
pub mod record;
pub mod store;

pub use dedup::{dedup, partition_duplicates};
pub use manifest::{InnerManifestBase, ManifestParser, ParsedManifest, MANIFEST_FILENAME};
pub use record::{
    DependencyIdentifier, RepositoryCoordinates, RepositoryRecord, SizeField, WorkItem,
    REPOSITORY_TYPE_PRIMARY,
};
pub use store::{MemoryStore, RepositoryStore, SqliteStore, StoreError};
