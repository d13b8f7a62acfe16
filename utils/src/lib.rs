//! Shared infrastructure utilities for Finaptico.
//!
//! Cross-cutting helpers that multiple crates need but that don't belong in
//! the domain-pure `finaptico-types` crate. Currently this is crash-safe file
//! persistence, used for the cached auth session and config writes.

pub mod atomic_write;

pub use atomic_write::{Sensitivity, atomic_write};
