//! # In-Memory Storage
//!
//! In-memory contract storage for deterministic tests.
//!
//! Uses `im::OrdMap` for O(1) structural-sharing clones, so a test can
//! checkpoint the store before a transaction and compare or restore
//! afterwards without copying the whole dataset.

mod storage;

pub use storage::MemoryStorage;
