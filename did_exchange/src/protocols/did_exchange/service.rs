use log::{error, trace};

use crate::errors::error::prelude::*;
use crate::protocols::did_exchange::context::Context;
use crate::protocols::did_exchange::states::{
    state_from_msg_type, state_from_name, OutboundAction, StateMachineMsg, StateTransition,
    STATE_NAME_NOOP, STATE_NAME_NULL,
};

/// Protocol name under which this service registers.
pub const DID_EXCHANGE: &str = "didexchange";

/// Inbound-dispatch framework of the did-exchange protocol. For every
/// inbound message it determines the expected state from the message type,
/// checks the transition is legal for the record's current state, executes
/// states until one returns the no-op followup, and persists each record
/// before running the state's outbound action.
pub struct DidExchangeService {
    ctx: Context,
}

impl DidExchangeService {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub fn name(&self) -> &'static str {
        DID_EXCHANGE
    }

    pub fn accept(&self, msg_type: &str) -> bool {
        state_from_msg_type(msg_type).is_ok()
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Drives one inbound message through the state machine. Returns the
    /// connection id of the last persisted record.
    pub async fn handle_inbound(
        &self,
        msg: StateMachineMsg,
        thid: &str,
    ) -> DidExchangeResult<String> {
        trace!(
            "DidExchangeService::handle_inbound >>> msg_type: {}, thid: {}",
            msg.msg_type(),
            thid
        );

        let current_name = msg
            .conn_record
            .as_ref()
            .map(|record| record.state.as_str())
            .filter(|state| !state.is_empty())
            .unwrap_or(STATE_NAME_NULL);
        let current = state_from_name(current_name)?;

        let mut next = state_from_msg_type(msg.msg_type())?;

        if !current.can_transition_to(next.as_ref()) {
            return Err(err_msg(
                DidExchangeErrorKind::InvalidState,
                format!(
                    "invalid state transition {} -> {}",
                    current.name(),
                    next.name()
                ),
            ));
        }

        let mut connection_id = msg
            .conn_record
            .as_ref()
            .map(|record| record.connection_id.clone())
            .unwrap_or_default();

        loop {
            let StateTransition {
                record,
                next: followup,
                action,
            } = next.execute_inbound(&msg, thid, &self.ctx).await?;

            if let Some(mut record) = record {
                record.state = next.name().to_string();
                self.ctx
                    .connection_recorder
                    .save_record(&record)
                    .await
                    .map_err(|err| err.extend("failed to persist connection record"))?;
                connection_id = record.connection_id.clone();
            }

            // the record is durable at this point; dispatch failures are
            // logged, not escalated into a state change
            self.run_action(action).await;

            if followup.name() == STATE_NAME_NOOP {
                break;
            }
            next = followup;
        }

        Ok(connection_id)
    }

    async fn run_action(&self, action: OutboundAction) {
        let OutboundAction::Send {
            message,
            sender_verkey,
            destination,
        } = action
        else {
            return;
        };

        if let Err(err) = self
            .ctx
            .outbound_dispatcher
            .send(&message, &sender_verkey, &destination)
            .await
        {
            error!("failed to dispatch outbound message: {}", err);
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use messages::a2a::DidCommMsg;
    use messages::msg_types::RESPONSE_MSG_TYPE;
    use serde_json::json;

    use super::*;
    use crate::storage::record::Record;
    use crate::utils::test_utils::test_context;

    #[tokio::test]
    async fn test_unknown_message_type_is_rejected() {
        let service = DidExchangeService::new(test_context());
        let msg = StateMachineMsg::new(DidCommMsg::new(json!({
            "@type": "https://didcomm.org/didexchange/1.0/bogus"
        })));
        let err = service.handle_inbound(msg, "t-1").await.unwrap_err();
        assert_eq!(err.kind(), DidExchangeErrorKind::UnknownMessageType);
    }

    #[tokio::test]
    async fn test_redelivery_at_later_state_is_rejected() {
        let service = DidExchangeService::new(test_context());

        let mut msg = StateMachineMsg::new(DidCommMsg::new(json!({
            "@type": RESPONSE_MSG_TYPE,
            "~thread": { "thid": "t-1" }
        })));
        msg.conn_record = Some(Record {
            state: "completed".to_string(),
            thread_id: "t-1".to_string(),
            ..Record::default()
        });

        let err = service.handle_inbound(msg, "t-1").await.unwrap_err();
        assert_eq!(err.kind(), DidExchangeErrorKind::InvalidState);
        assert_eq!(err.msg(), "invalid state transition completed -> responded");
    }

    #[test]
    fn test_accepts_only_protocol_messages() {
        let service = DidExchangeService::new(test_context());
        assert!(service.accept(RESPONSE_MSG_TYPE));
        assert!(!service.accept("https://didcomm.org/trust_ping/1.0/ping"));
        assert_eq!(service.name(), DID_EXCHANGE);
    }
}
