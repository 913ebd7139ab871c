//! Caching for parsed paths and expressions
//!
//! Parsing is cheap but not free, and mapping templates re-evaluate the same
//! expressions for every row. This module provides a pluggable
//! [`CacheDriver`], an in-memory LRU driver and the [`ParseCache`] that the
//! accessor, mutator and mapper share.

#![warn(missing_docs)]

pub mod driver;
pub mod parse_cache;
pub mod stats;

pub use driver::{CacheDriver, MemoryCacheDriver};
pub use parse_cache::{
    DEFAULT_CACHE_SIZE, ParseCache, global_expression_cache, global_path_cache,
    reset_global_caches,
};
pub use stats::CacheStats;
