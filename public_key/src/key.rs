use serde::{Deserialize, Serialize};

use crate::{error::PublicKeyError, KeyType};

const DID_KEY_PREFIX: &str = "did:key:";

/// Raw public key bytes together with their key type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    key_type: KeyType,
    key: Vec<u8>,
}

impl Key {
    /// Keys sourced from verification methods sometimes arrive with the
    /// multicodec descriptor still attached; strip it so `key` always holds
    /// the bare key bytes.
    pub fn new(key: Vec<u8>, key_type: KeyType) -> Self {
        let key = Self::strip_multicodec_prefix_if_present(key, &key_type);
        Self { key_type, key }
    }

    pub fn key_type(&self) -> &KeyType {
        &self.key_type
    }

    pub fn key(&self) -> &[u8] {
        self.key.as_ref()
    }

    pub fn validate_key_type(&self, key_type: KeyType) -> Result<&Self, PublicKeyError> {
        if self.key_type() != &key_type {
            return Err(PublicKeyError::InvalidKeyType(self.key_type, key_type));
        }
        Ok(self)
    }

    pub fn multicodec_prefixed_key(&self) -> Vec<u8> {
        let code = u64::from(self.key_type());
        let mut buffer = unsigned_varint::encode::u64_buffer();
        let mut prefixed_key = unsigned_varint::encode::u64(code, &mut buffer).to_vec();
        prefixed_key.extend_from_slice(&self.key);
        prefixed_key
    }

    /// Base58btc multibase encoding of the multicodec-prefixed key, i.e. the
    /// method-specific identifier of the key's `did:key` form.
    pub fn fingerprint(&self) -> String {
        multibase::encode(multibase::Base::Base58Btc, self.multicodec_prefixed_key())
    }

    pub fn did_key(&self) -> String {
        format!("{DID_KEY_PREFIX}{}", self.fingerprint())
    }

    pub fn base58(&self) -> String {
        bs58::encode(&self.key).into_string()
    }

    pub fn from_fingerprint(fingerprint: &str) -> Result<Self, PublicKeyError> {
        let (_base, decoded) = multibase::decode(fingerprint)?;
        let (code, remaining) = unsigned_varint::decode::u64(&decoded)?;
        Ok(Self {
            key_type: code.try_into()?,
            key: remaining.to_vec(),
        })
    }

    pub fn from_did_key(did_key: &str) -> Result<Self, PublicKeyError> {
        let fingerprint = did_key
            .strip_prefix(DID_KEY_PREFIX)
            .ok_or_else(|| PublicKeyError::InvalidDidKey(did_key.to_string()))?;
        Self::from_fingerprint(fingerprint)
    }

    pub fn from_base58(base58: &str, key_type: KeyType) -> Result<Self, PublicKeyError> {
        let decoded = bs58::decode(base58).into_vec()?;
        Ok(Self::new(decoded, key_type))
    }

    fn strip_multicodec_prefix_if_present(key: Vec<u8>, key_type: &KeyType) -> Vec<u8> {
        if let Ok((code, remaining)) = unsigned_varint::decode::u64(&key) {
            if code == u64::from(key_type) {
                return remaining.to_vec();
            }
        }
        key
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    // vector from https://w3c-ccg.github.io/did-method-key/#ed25519-x25519
    const ED25519_FINGERPRINT: &str = "z6MkiTBz1ymuepAQ4HEHYSF1H8quG5GLVVQR3djdX3mDooWp";

    #[test]
    fn test_ed25519_fingerprint_roundtrip() {
        let key = Key::from_fingerprint(ED25519_FINGERPRINT).unwrap();
        assert_eq!(key.key_type(), &KeyType::Ed25519);
        assert_eq!(key.key().len(), 32);
        assert_eq!(key.fingerprint(), ED25519_FINGERPRINT);
    }

    #[test]
    fn test_did_key_roundtrip() {
        let key = Key::from_fingerprint(ED25519_FINGERPRINT).unwrap();
        let did_key = key.did_key();
        assert_eq!(did_key, format!("did:key:{ED25519_FINGERPRINT}"));
        assert_eq!(Key::from_did_key(&did_key).unwrap(), key);
    }

    #[test]
    fn test_from_did_key_rejects_other_did_methods() {
        let err = Key::from_did_key("did:peer:123").unwrap_err();
        assert!(matches!(err, PublicKeyError::InvalidDidKey(_)));
    }

    #[test]
    fn test_multicodec_prefix_is_stripped_on_construction() {
        let plain = Key::from_fingerprint(ED25519_FINGERPRINT).unwrap();
        let prefixed = Key::new(plain.multicodec_prefixed_key(), KeyType::Ed25519);
        assert_eq!(plain, prefixed);
    }

    #[test]
    fn test_unknown_multicodec_descriptor_fails() {
        let encoded = multibase::encode(multibase::Base::Base58Btc, [0x07, 0x01, 0x02]);
        let err = Key::from_fingerprint(&encoded).unwrap_err();
        assert!(matches!(
            err,
            PublicKeyError::UnsupportedMulticodecDescriptor(7)
        ));
    }
}
