// Thin re-export module: the ledger lives in `blockchain/core.rs`, split into
// the chain itself and its validation routines.

pub mod core;
pub use self::core::*;
