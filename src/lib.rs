//! PetChain - an append-only, hash-linked ledger of pet records
//!
//! # Architecture
//!
//! ## Ledger Core
//! - [`blockchain`] - Blocks, the ledger and chain validation
//! - [`miner`] - Proof-of-work search
//! - [`crypto`] - Canonical serialization and hashing
//!
//! ## Collaborators
//! - [`persistence`] - Storage backends (SQLite, in-memory)
//! - [`node`] - Shared ledger handle and process wiring
//! - [`placeholder`] - Placeholder payloads
//! - [`api`] - HTTP endpoints
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Ledger Core
// ============================================================================
pub mod blockchain;
pub mod crypto;
pub mod miner;

// ============================================================================
// Collaborators
// ============================================================================
pub mod node;
pub mod persistence;
pub mod placeholder;

#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
