//! Foundational low-level utilities shared across Tau crates.
//!
//! Provides the crash-safe file replacement used by session persistence and the
//! timestamp helper it uses to name temporary files.

pub mod atomic_io;
pub mod time_utils;

pub use atomic_io::write_bytes_atomic;
pub use time_utils::current_unix_timestamp_ms;
