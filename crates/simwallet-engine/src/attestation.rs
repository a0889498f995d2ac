//! Attestation issued to wallets with no similar wallets.
//!
//! The signature covers `keccak256(address)` and is consumed by a downstream
//! mint contract. Signing sits outside the correlation error model: a signer
//! failure never fails the similarity search.

use std::str::FromStr;

use alloy::primitives::{hex, keccak256, Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;
use simwallet_data::{Error, Result};

/// Signs the digest of a wallet address.
#[async_trait]
pub trait AttestationSigner: Send + Sync {
    /// Returns the `0x`-prefixed hex signature over `digest`.
    async fn sign_digest(&self, digest: B256) -> Result<String>;
}

/// Digest signed for `address`: keccak256 of its 20 raw bytes.
pub fn address_digest(address: &Address) -> B256 {
    keccak256(address.as_slice())
}

/// Signer backed by a local secp256k1 key.
///
/// Produces EIP-191 personal-message signatures over the digest bytes.
pub struct LocalAttestationSigner {
    signer: PrivateKeySigner,
}

impl LocalAttestationSigner {
    /// Loads the signer from a hex private key (with or without `0x`).
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if the key is not a valid secp256k1
    /// private key.
    pub fn from_hex(private_key: &str) -> Result<Self> {
        let signer = PrivateKeySigner::from_str(private_key.trim())
            .map_err(|e| Error::InvalidConfig(format!("invalid signer key: {e}")))?;
        Ok(Self { signer })
    }

    /// Address of the signing key.
    pub fn signer_address(&self) -> Address {
        self.signer.address()
    }
}

#[async_trait]
impl AttestationSigner for LocalAttestationSigner {
    async fn sign_digest(&self, digest: B256) -> Result<String> {
        let signature = self
            .signer
            .sign_message(digest.as_slice())
            .await
            .map_err(|e| Error::Attestation(e.to_string()))?;
        Ok(hex::encode_prefixed(signature.as_bytes()))
    }
}
