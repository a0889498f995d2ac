//! Type definitions for wallet correlation data.

use alloy::primitives::{hex, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A transaction as seen by the correlation engine.
///
/// Built either from an explorer `txlist` row or from a full JSON-RPC block.
/// Immutable once fetched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Block number containing the transaction.
    pub block_number: u64,
    /// Timestamp in unix seconds (the block timestamp).
    pub timestamp: u64,
    /// Sender address.
    pub from: Address,
    /// Recipient address (None for contract creation).
    pub to: Option<Address>,
    /// Transaction hash.
    pub hash: B256,
    /// Transferred value in wei.
    pub value: U256,
    /// Call data.
    pub input: Bytes,
}

impl Transaction {
    /// Leading 4 bytes of the call data, rendered as `0x` + 8 hex chars.
    ///
    /// Shorter call data is rendered whole, so a plain transfer yields `"0x"`.
    pub fn method_signature(&self) -> String {
        let len = self.input.len().min(4);
        hex::encode_prefixed(&self.input[..len])
    }
}

/// Block contents needed for neighborhood expansion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block number.
    pub number: u64,
    /// Timestamp in unix seconds.
    pub timestamp: u64,
    /// Transactions in block order.
    pub transactions: Vec<Transaction>,
}

/// Parses a user-supplied wallet address.
///
/// Accepts `0x`-prefixed 40-char hex in any letter case; checksums are not
/// enforced so that lowercase and mixed-case inputs resolve to the same wallet.
pub fn parse_wallet_address(input: &str) -> Result<Address> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("wallet address is required".into()));
    }
    if !trimmed.starts_with("0x") && !trimmed.starts_with("0X") {
        return Err(Error::InvalidInput(format!(
            "wallet address must be 0x-prefixed: {trimmed}"
        )));
    }
    trimmed
        .to_ascii_lowercase()
        .parse::<Address>()
        .map_err(|e| Error::InvalidInput(format!("malformed wallet address {trimmed}: {e}")))
}

/// Renders an address as lowercase `0x`-prefixed hex.
pub fn format_address(address: &Address) -> String {
    hex::encode_prefixed(address.as_slice())
}

/// Formats wei as ETH with exactly 6 decimal places.
///
/// Examples:
/// - `1_000_000_000_000_000_000` -> `"1.000000 ETH"`
/// - `123_000_000_000_000` -> `"0.000123 ETH"`
pub fn format_eth(wei: U256) -> String {
    let wei_per_eth = U256::from(1_000_000_000_000_000_000u128);
    let scale = U256::from(1_000_000u64);

    let whole = wei / wei_per_eth;
    let fractional = ((wei % wei_per_eth) * scale) / wei_per_eth;

    format!("{whole}.{:06} ETH", fractional.to::<u64>())
}
