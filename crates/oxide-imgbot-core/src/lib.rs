#![deny(missing_docs)]
//! Oxide image bot core library.
//!
//! Transport-agnostic search engine: providers, translation, per-chat search
//! sessions and de-duplicated delivery backed by persistent history.

/// Configuration management.
pub mod config;
/// Image search and translation providers.
pub mod providers;
/// Search sessions, delivery walker and session controller.
pub mod search;
/// Storage layer for delivery history (R2/S3).
pub mod storage;
/// Query normalization via the translation provider.
pub mod translation;
/// Utility functions.
pub mod utils;

#[cfg(test)]
pub mod testing;
