//! Low-level primitives for building the storage engine.
//!
//! Includes fixed-offset byte helpers and positional file access.

/// Byte-level utilities for fixed-layout records and attribute blobs.
pub mod bytes;

/// Positional file access and the per-engine file registry.
pub mod io;
