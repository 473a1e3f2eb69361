use async_trait::async_trait;
use messages::a2a::A2AMessage;

use crate::common::destination::Destination;
use crate::errors::error::DidExchangeResult;

/// Outbound transport. Envelope construction and wire packing live behind
/// this trait; the core only decides what to send, to where, and as whom.
#[async_trait]
pub trait OutboundDispatcher: Send + Sync {
    async fn send(
        &self,
        msg: &A2AMessage,
        sender_verkey: &str,
        destination: &Destination,
    ) -> DidExchangeResult<()>;
}
