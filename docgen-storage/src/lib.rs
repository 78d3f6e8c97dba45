//! docgen-storage: the document generation worker's storage client.
//!
//! A thin, retrying wrapper around an S3-compatible object store covering
//! exactly the three operations the worker needs: ensure the bucket
//! exists, store a finished document, and download a template asset.

mod client;
mod config;
mod error;

pub use client::StorageClient;
pub use config::S3Config;
pub use error::{StorageError, StorageResult};
