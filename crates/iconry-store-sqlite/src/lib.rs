//! SQLite backend for the Iconry icon store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every write operation runs inside one
//! `BEGIN IMMEDIATE` transaction; operations that allocate codes additionally
//! hold the store's [`AllocationLock`].

mod allocator;
mod associations;
mod audit;
mod disabled;
mod encode;
mod queries;
mod replace;
mod schema;
mod store;
mod submit;

pub mod error;
pub mod log;

pub use allocator::AllocationLock;
pub use error::{Error, Result};
pub use log::{LogRecorder, TableLogRecorder};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
