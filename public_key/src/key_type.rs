use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::PublicKeyError;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Ed25519,
    X25519,
    Bls12381g2,
    P256,
    P384,
    P521,
}

impl Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyType::Ed25519 => write!(f, "ed25519"),
            KeyType::X25519 => write!(f, "x25519"),
            KeyType::Bls12381g2 => write!(f, "bls12381g2"),
            KeyType::P256 => write!(f, "p256"),
            KeyType::P384 => write!(f, "p384"),
            KeyType::P521 => write!(f, "p521"),
        }
    }
}

impl From<&KeyType> for u64 {
    fn from(key_type: &KeyType) -> Self {
        match key_type {
            KeyType::Ed25519 => 237,
            KeyType::X25519 => 236,
            KeyType::Bls12381g2 => 235,
            KeyType::P256 => 4608,
            KeyType::P384 => 4609,
            KeyType::P521 => 4610,
        }
    }
}

impl TryFrom<u64> for KeyType {
    type Error = PublicKeyError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            235 => Ok(KeyType::Bls12381g2),
            236 => Ok(KeyType::X25519),
            237 => Ok(KeyType::Ed25519),
            4608 => Ok(KeyType::P256),
            4609 => Ok(KeyType::P384),
            4610 => Ok(KeyType::P521),
            other => Err(PublicKeyError::UnsupportedMulticodecDescriptor(other)),
        }
    }
}
