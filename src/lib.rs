//! `KeyTrack` - Key custody tracking for a real-estate brokerage
//!
//! This crate provides the data layer of a key custody system: it records which
//! physical property key is checked out, by whom, and for how long, flags
//! overdue checkouts, and exposes role-gated operations (admin vs. broker) over
//! a remote data store with an in-memory fallback when that store is
//! unreachable or unconfigured.

// Deny the most critical lints that could lead to bugs or security issues
#![deny(
    unsafe_code,
    unsafe_op_in_unsafe_fn,
    unreachable_code,
    unreachable_patterns,
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links
)]
// Warn on things that should be fixed but aren't necessarily bugs
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::dbg_macro,
    clippy::exit,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::match_same_arms,
    clippy::semicolon_if_nothing_returned,
    clippy::wildcard_imports,
    future_incompatible,
    rust_2018_idioms
)]
// Allow some pedantic lints that are too noisy or not applicable
#![allow(
    clippy::module_name_repetitions, // Common pattern in Rust
    clippy::missing_errors_doc,      // Will add gradually
    clippy::missing_panics_doc       // Will add gradually
)]

/// Environment-driven configuration for the remote store and session file
pub mod config;
/// Core business logic - custody operations, authentication, and derived views
pub mod core;
/// SeaORM entity definitions for the remote tables
pub mod entities;
/// Unified error types and result handling
pub mod errors;
/// Durable persistence of the currently logged-in user
pub mod session;
/// Data access facade over the remote store and the in-memory fallback
pub mod store;

#[cfg(test)]
pub(crate) mod test_utils;
