//! Shared test utilities for the folder-mirror workspace.
//!
//! This crate provides standardised fixtures so every crate's tests build
//! source/replica pairs the same way. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`trees`]: [`TestTrees`] source/replica pair with write, mtime and comparison helpers
//! - [`lock`]: holding a source file exclusively, the way a slow writer would

pub mod lock;
pub mod trees;

pub use lock::{HeldFile, hold_exclusive};
pub use trees::{Node, TestTrees, listing, stamp};
