//! simwallet-engine crate
//!
//! Correlation engine: pairwise and neighborhood matching, wallet scoring,
//! neighborhood expansion over the block RPC, and the [`SimilarityEngine`]
//! boundary consumed by the CLI.

pub mod attestation;
pub mod config;
pub mod engine;
pub mod matcher;
pub mod neighborhood;
pub mod score;

pub use config::CorrelationConfig;
pub use engine::{compare_histories, SimilarWalletsReport, SimilarityEngine};
pub use matcher::SimilarityMatch;
pub use score::{RankedWallet, WalletScore};
