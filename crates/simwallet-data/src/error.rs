//! Error taxonomy shared by the data and engine crates.

/// Errors raised while fetching or correlating wallet activity.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed wallet address, rejected before any external call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Transaction history fetch failed. Fatal for the whole operation.
    #[error("transaction provider failed for {address}: {reason}")]
    Provider {
        /// Wallet whose history was requested.
        address: String,
        /// Upstream failure description.
        reason: String,
    },

    /// Single block fetch failed. Absorbed as an absent block by callers.
    #[error("failed to fetch block {block_number}: {reason}")]
    BlockFetch {
        /// Requested block number.
        block_number: u64,
        /// Upstream failure description.
        reason: String,
    },

    /// Attestation signing failed.
    #[error("attestation signing failed: {0}")]
    Attestation(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias for correlation operations.
pub type Result<T> = std::result::Result<T, Error>;
