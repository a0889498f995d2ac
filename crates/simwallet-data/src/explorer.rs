//! Explorer `txlist` client for full wallet histories.
//!
//! Talks to an Etherscan-compatible API (Scrollscan by default). The explorer
//! reports numeric fields as base-10 strings, unlike the JSON-RPC block
//! endpoint, so every field here is parsed as decimal.

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::provider::TransactionSource;
use crate::types::{format_address, Transaction};

/// Default explorer API endpoint.
pub const DEFAULT_EXPLORER_URL: &str = "https://api.scrollscan.com/api";

/// Highest block requested from the explorer; it clamps to the chain head.
const END_BLOCK: &str = "99999999";

/// Message the explorer returns alongside `status = "0"` for an empty history.
const NO_TRANSACTIONS_MESSAGE: &str = "No transactions found";

/// Envelope of every explorer response.
#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    message: String,
    /// Array of rows on success, error text otherwise.
    result: serde_json::Value,
}

/// One row of the `txlist` result.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxListRow {
    block_number: String,
    time_stamp: String,
    hash: String,
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    input: String,
}

/// HTTP client for the explorer `account/txlist` endpoint.
#[derive(Debug, Clone)]
pub struct ExplorerClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ExplorerClient {
    /// Creates a client for `base_url` with an optional API key.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
        })
    }

    /// Endpoint this client queries.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TransactionSource for ExplorerClient {
    #[tracing::instrument(skip(self), fields(address = %format_address(&address)))]
    async fn fetch_transactions(&self, address: Address) -> Result<Vec<Transaction>> {
        let address_text = format_address(&address);
        let provider_err = |reason: String| Error::Provider {
            address: address_text.clone(),
            reason,
        };

        let mut query: Vec<(&str, &str)> = vec![
            ("module", "account"),
            ("action", "txlist"),
            ("address", address_text.as_str()),
            ("startblock", "0"),
            ("endblock", END_BLOCK),
            ("sort", "asc"),
        ];
        if let Some(key) = self.api_key.as_deref() {
            query.push(("apikey", key));
        }

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| provider_err(format!("txlist request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_err(format!(
                "explorer returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| provider_err(format!("failed to read txlist body: {e}")))?;

        let transactions = parse_txlist_response(&address_text, &body)?;
        tracing::debug!(count = transactions.len(), "fetched wallet history");
        Ok(transactions)
    }
}

/// Parses an explorer `txlist` body into transactions sorted by block number.
///
/// # Errors
/// Returns [`Error::Provider`] for undecodable JSON, a non-success status
/// (other than the empty-history reply), or a malformed row.
pub fn parse_txlist_response(address: &str, body: &str) -> Result<Vec<Transaction>> {
    let provider_err = |reason: String| Error::Provider {
        address: address.to_string(),
        reason,
    };

    let envelope: ExplorerResponse = serde_json::from_str(body)
        .map_err(|e| provider_err(format!("failed to parse txlist JSON: {e}")))?;

    if envelope.status != "1" {
        if envelope.message.starts_with(NO_TRANSACTIONS_MESSAGE) {
            return Ok(Vec::new());
        }
        let detail = envelope
            .result
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| envelope.result.to_string());
        return Err(provider_err(format!(
            "explorer status {} ({}): {}",
            envelope.status, envelope.message, detail
        )));
    }

    let rows: Vec<TxListRow> = serde_json::from_value(envelope.result)
        .map_err(|e| provider_err(format!("unexpected txlist result shape: {e}")))?;

    let mut transactions = rows
        .into_iter()
        .map(parse_row)
        .collect::<std::result::Result<Vec<_>, String>>()
        .map_err(provider_err)?;

    // Stable: equal block numbers keep the explorer's order.
    transactions.sort_by_key(|tx| tx.block_number);
    Ok(transactions)
}

fn parse_row(row: TxListRow) -> std::result::Result<Transaction, String> {
    let block_number = row
        .block_number
        .parse::<u64>()
        .map_err(|e| format!("bad blockNumber {:?}: {e}", row.block_number))?;
    let timestamp = row
        .time_stamp
        .parse::<u64>()
        .map_err(|e| format!("bad timeStamp {:?}: {e}", row.time_stamp))?;
    let hash = B256::from_str(&row.hash).map_err(|e| format!("bad hash {:?}: {e}", row.hash))?;
    let from = Address::from_str(&row.from.to_ascii_lowercase())
        .map_err(|e| format!("bad from {:?}: {e}", row.from))?;
    let to = if row.to.is_empty() {
        None
    } else {
        Some(
            Address::from_str(&row.to.to_ascii_lowercase())
                .map_err(|e| format!("bad to {:?}: {e}", row.to))?,
        )
    };
    let value = if row.value.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&row.value, 10).map_err(|e| format!("bad value {:?}: {e}", row.value))?
    };
    let input = parse_input(&row.input)?;

    Ok(Transaction {
        block_number,
        timestamp,
        from,
        to,
        hash,
        value,
        input,
    })
}

/// Decodes `0x`-prefixed call data; empty strings and a bare `0x` are empty.
pub(crate) fn parse_input(input: &str) -> std::result::Result<Bytes, String> {
    if input.is_empty() || input == "0x" {
        return Ok(Bytes::new());
    }
    Bytes::from_str(input).map_err(|e| format!("bad input data: {e}"))
}
