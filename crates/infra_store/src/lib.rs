//! Storage Infrastructure Layer
//!
//! File-backed implementations of the metering domain's storage ports:
//!
//! - [`FileStore`]: the local key-value store, one file per key under a data
//!   directory, with a byte quota like a browser's local storage
//! - [`DirectoryBlobStore`]: backup documents kept in a directory, each
//!   guarded by an edit key
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_store::{FileStore, DirectoryBlobStore};
//!
//! let store = FileStore::open("./data", 5 * 1024 * 1024)?;
//! let ledger = Ledger::open(store, LedgerConfig::default(), clock)?;
//! let backups = Arc::new(DirectoryBlobStore::open("./backups").await?);
//! ```

pub mod error;
pub mod file_store;
pub mod blob_store;

pub use error::StorageError;
pub use file_store::FileStore;
pub use blob_store::DirectoryBlobStore;
