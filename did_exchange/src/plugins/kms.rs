use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sha2::{Digest, Sha256};

use crate::errors::error::prelude::*;

/// Key types a key manager can hold. The ECDSA variants distinguish the
/// export serialization: DER-wrapped PKIX or the raw IEEE-P1363 point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyType {
    Ed25519,
    Bls12381G2,
    EcdsaP256Der,
    EcdsaP256Ieee1363,
    EcdsaP384Der,
    EcdsaP384Ieee1363,
    EcdsaP521Der,
    EcdsaP521Ieee1363,
}

/// Opaque reference to key material held by the key manager. Only the key
/// manager that minted the handle can resolve it back to a private key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyHandle {
    kid: String,
}

impl KeyHandle {
    pub fn new(kid: impl Into<String>) -> Self {
        Self { kid: kid.into() }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }
}

#[async_trait]
pub trait KeyManager: Send + Sync {
    /// Creates a fresh keypair and returns its key id together with the
    /// exported public key bytes.
    async fn create_and_export_pub_key_bytes(
        &self,
        key_type: KeyType,
    ) -> DidExchangeResult<(String, Vec<u8>)>;

    /// Resolves a key id back to a handle usable for signing.
    async fn get(&self, kid: &str) -> DidExchangeResult<KeyHandle>;

    /// Deterministic key id for public key bytes, so a key created earlier
    /// (e.g. for an invitation) can be recovered from its public half alone.
    fn create_kid(&self, pub_key_bytes: &[u8], key_type: KeyType) -> DidExchangeResult<String> {
        deterministic_kid(pub_key_bytes, key_type)
    }
}

pub fn deterministic_kid(pub_key_bytes: &[u8], _key_type: KeyType) -> DidExchangeResult<String> {
    if pub_key_bytes.is_empty() {
        return Err(err_msg(
            DidExchangeErrorKind::InvalidVerkey,
            "cannot derive KID from empty public key",
        ));
    }
    let digest = Sha256::digest(pub_key_bytes);
    Ok(URL_SAFE_NO_PAD.encode(digest))
}
