//! simwallet-data crate
//!
//! Transaction and block retrieval for wallet correlation: the data model,
//! provider traits, the explorer and JSON-RPC clients, and the shared
//! request rate limiter.

pub mod blocks;
pub mod error;
pub mod explorer;
pub mod provider;
pub mod rate_limit;
pub mod types;

pub use error::{Error, Result};
pub use provider::{BlockSource, TransactionSource};
pub use rate_limit::{RateLimited, RateLimiter};
pub use types::{format_address, format_eth, parse_wallet_address, Block, Transaction};
