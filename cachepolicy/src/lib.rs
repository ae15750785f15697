//! # CachePolicy
//!
//! CachePolicy is a library for simulating set-associative caches under interchangeable
//! replacement policies
//!
//! It provides a generic cache implementation which can be parameterised by a replacement policy
//! (LRU, LFU, or a simplified ARC), and a simulator which replays a trace of loads and stores
//! against one or more caches side by side
//!
//! A cache is built once from a validated geometry and never allocates again: its blocks are
//! reused in place for as long as it lives

/// Contains the block metadata and its states
pub mod block;

/// Contains the implementation of the cache, and a utility enum for the provided policies
pub mod cache;

/// Contains definitions for the JSON input format
pub mod config;

/// Contains the error types of the library
pub mod error;

/// Contains the address decomposition for a cache's geometry
pub mod geometry;

/// Contains the ghost lists used by the ARC policy
pub mod ghost;

/// Contains the helper for opening trace files
pub mod io;

/// Contains the provided replacement policies, with a trait for implementing custom replacement
/// policies
pub mod replacement_policies;

/// Contains the simulator used to replay a trace against a cache configuration
pub mod simulator;

/// Contains the trace format and its reader
pub mod trace;

#[cfg(test)]
mod test;

/// Contains utilities for generating synthetic traces for tests and benchmarks
pub mod util;
