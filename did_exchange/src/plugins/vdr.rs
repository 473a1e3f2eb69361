use async_trait::async_trait;
use diddoc::aries::diddoc::AriesDidDoc;

use crate::errors::error::DidExchangeResult;

#[derive(Clone, Debug, PartialEq)]
pub struct DidResolution {
    pub did_document: AriesDidDoc,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DidCreateOpts {
    /// When set, the registry only persists the provided document instead of
    /// deriving a new one.
    pub store: bool,
}

/// DID method registry: resolves DIDs and creates (or stores) documents
/// under a given method.
#[async_trait]
pub trait VdrRegistry: Send + Sync {
    async fn resolve(&self, did: &str) -> DidExchangeResult<DidResolution>;

    async fn create(
        &self,
        method: &str,
        did_doc: &AriesDidDoc,
        opts: DidCreateOpts,
    ) -> DidExchangeResult<DidResolution>;
}
