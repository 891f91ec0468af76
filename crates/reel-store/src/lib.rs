//! Persistence for the ReelPress pipeline.
//!
//! This crate provides:
//! - Store traits for videos, import requests and cloud connections
//! - A Firestore REST implementation with token caching, retry and
//!   optimistic-concurrency updates
//! - An in-memory implementation for local runs and tests
//!
//! Every status change is validated against the model transition tables
//! before it is written.

pub mod client;
pub mod codec;
pub mod error;
pub mod firestore;
pub mod memory;
pub mod metrics;
pub mod retry;
pub mod store;
pub mod token_cache;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{StoreError, StoreResult};
pub use firestore::FirestoreStore;
pub use memory::MemoryStore;
pub use store::{ConnectionStore, ImportStore, VideoStore};
