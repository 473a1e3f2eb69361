use async_trait::async_trait;

use crate::errors::error::DidExchangeResult;
use crate::plugins::kms::KeyHandle;

/// Raw signing and verification over the primitive the key handle refers to.
#[async_trait]
pub trait Crypto: Send + Sync {
    async fn sign(&self, message: &[u8], key_handle: &KeyHandle) -> DidExchangeResult<Vec<u8>>;

    async fn verify(
        &self,
        signature: &[u8],
        message: &[u8],
        pub_key_bytes: &[u8],
    ) -> DidExchangeResult<()>;
}
