//! JSON-RPC block client used for neighborhood expansion.
//!
//! Fetches full blocks (`eth_getBlockByNumber` with transaction objects) and
//! maps them to [`Block`]. JSON-RPC quantities are `0x`-prefixed base-16, so
//! block numbers, timestamps and values are parsed as hex here.

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::explorer::parse_input;
use crate::provider::BlockSource;
use crate::types::{Block, Transaction};

/// Block object as returned with `includeTransactions = true`.
#[derive(Debug, Deserialize)]
struct RpcBlock {
    number: String,
    timestamp: String,
    #[serde(default)]
    transactions: Vec<RpcTransaction>,
}

/// Transaction object embedded in an [`RpcBlock`].
#[derive(Debug, Deserialize)]
struct RpcTransaction {
    hash: String,
    from: String,
    to: Option<String>,
    #[serde(default)]
    value: String,
    #[serde(default)]
    input: String,
}

/// Fetches full blocks from an Ethereum-compatible JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcBlockClient {
    client: reqwest::Client,
    rpc_url: reqwest::Url,
}

impl RpcBlockClient {
    /// Creates a client for `rpc_url`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if the URL is malformed or the HTTP
    /// client cannot be built.
    pub fn new(rpc_url: &str) -> Result<Self> {
        let rpc_url = reqwest::Url::parse(rpc_url)
            .map_err(|e| Error::InvalidConfig(format!("invalid RPC URL format: {e}")))?;
        if !matches!(rpc_url.scheme(), "http" | "https") {
            return Err(Error::InvalidConfig(format!(
                "unsupported RPC URL scheme: {}",
                rpc_url.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, rpc_url })
    }

    /// Fetches a block with all transactions.
    ///
    /// Returns `Ok(None)` if the node reports no such block.
    ///
    /// # Errors
    /// Returns [`Error::BlockFetch`] if the call fails or the payload cannot
    /// be mapped.
    #[tracing::instrument(skip(self))]
    pub async fn get_block_by_number(&self, block_number: u64) -> Result<Option<Block>> {
        let block_err = |reason: String| Error::BlockFetch {
            block_number,
            reason,
        };

        let params = [json!(format!("0x{block_number:x}")), json!(true)];
        let result = self
            .rpc_call("eth_getBlockByNumber", &params)
            .await
            .map_err(block_err)?;

        parse_block(result).map_err(block_err)
    }

    /// Makes a single JSON-RPC call and returns the `result` field.
    async fn rpc_call(&self, method: &str, params: &[Value]) -> std::result::Result<Value, String> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(self.rpc_url.clone())
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| format!("network error: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {} from RPC", status.as_u16()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| format!("failed to read RPC body: {e}"))?;
        let json: Value =
            serde_json::from_str(&text).map_err(|e| format!("JSON parse error: {e}"))?;

        if let Some(err) = json.get("error") {
            let msg = err
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown RPC error");
            return Err(format!("RPC error: {msg}"));
        }

        Ok(json.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl BlockSource for RpcBlockClient {
    async fn fetch_block(&self, block_number: u64) -> Option<Block> {
        match self.get_block_by_number(block_number).await {
            Ok(Some(block)) => Some(block),
            Ok(None) => {
                tracing::debug!(block_number, "block not found");
                None
            }
            Err(e) => {
                tracing::warn!(block_number, error = %e, "block fetch failed, treating as absent");
                None
            }
        }
    }
}

/// Maps a `eth_getBlockByNumber` result to a [`Block`].
///
/// `null` maps to `Ok(None)`. Transactions inherit the block timestamp.
pub fn parse_block(result: Value) -> std::result::Result<Option<Block>, String> {
    if result.is_null() {
        return Ok(None);
    }

    let raw: RpcBlock =
        serde_json::from_value(result).map_err(|e| format!("block deserialize: {e}"))?;
    let number = parse_hex_u64(&raw.number)?;
    let timestamp = parse_hex_u64(&raw.timestamp)?;

    let transactions = raw
        .transactions
        .into_iter()
        .map(|tx| parse_transaction(tx, number, timestamp))
        .collect::<std::result::Result<Vec<_>, String>>()?;

    Ok(Some(Block {
        number,
        timestamp,
        transactions,
    }))
}

fn parse_transaction(
    tx: RpcTransaction,
    block_number: u64,
    timestamp: u64,
) -> std::result::Result<Transaction, String> {
    let hash = B256::from_str(&tx.hash).map_err(|e| format!("bad tx hash {:?}: {e}", tx.hash))?;
    let from = Address::from_str(&tx.from.to_ascii_lowercase())
        .map_err(|e| format!("bad from {:?}: {e}", tx.from))?;
    let to = match tx.to.as_deref() {
        None | Some("") => None,
        Some(to) => Some(
            Address::from_str(&to.to_ascii_lowercase())
                .map_err(|e| format!("bad to {to:?}: {e}"))?,
        ),
    };
    let value = if tx.value.is_empty() {
        U256::ZERO
    } else {
        parse_hex_u256(&tx.value)?
    };

    Ok(Transaction {
        block_number,
        timestamp,
        from,
        to,
        hash,
        value,
        input: parse_input(&tx.input)?,
    })
}

/// Parses a `0x`-prefixed JSON-RPC quantity.
pub fn parse_hex_u64(value: &str) -> std::result::Result<u64, String> {
    let digits = strip_hex_prefix(value)?;
    u64::from_str_radix(digits, 16).map_err(|e| format!("bad hex quantity {value:?}: {e}"))
}

fn parse_hex_u256(value: &str) -> std::result::Result<U256, String> {
    let digits = strip_hex_prefix(value)?;
    U256::from_str_radix(digits, 16).map_err(|e| format!("bad hex quantity {value:?}: {e}"))
}

fn strip_hex_prefix(value: &str) -> std::result::Result<&str, String> {
    value
        .strip_prefix("0x")
        .filter(|digits| !digits.is_empty())
        .ok_or_else(|| format!("expected 0x-prefixed quantity, got {value:?}"))
}
