use async_trait::async_trait;

use crate::errors::error::DidExchangeResult;

/// Routing mediator used by edge agents without a public endpoint. Router
/// connections are referenced by their connection id.
#[async_trait]
pub trait MediatorService: Send + Sync {
    /// Endpoint and routing keys to advertise for the given router
    /// connection. `default_endpoint` is used when the router has none.
    async fn get_router_config(
        &self,
        conn_id: &str,
        default_endpoint: &str,
    ) -> DidExchangeResult<(String, Vec<String>)>;

    /// Registers a recipient key with the router so it can forward inbound
    /// messages for that key.
    async fn add_key_to_router(&self, conn_id: &str, recipient_key: &str)
        -> DidExchangeResult<()>;
}
