//! Single-process blockchain ledger with Proof-of-Work, longest-chain fork
//! choice, and race / majority double-spend attack scenarios.

pub mod api;
pub mod attack;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod transaction;
