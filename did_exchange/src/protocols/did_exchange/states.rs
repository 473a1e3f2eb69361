use async_trait::async_trait;
use messages::a2a::{A2AMessage, DidCommMsg};
use messages::msg_types::{
    ACK_MSG_TYPE, COMPLETE_MSG_TYPE, INVITATION_MSG_TYPE, OOB_INVITATION_MSG_TYPE,
    REQUEST_MSG_TYPE, RESPONSE_MSG_TYPE,
};
use messages::protocols::did_exchange::{Complete, Invitation, Request, Response};
use serde::de::DeserializeOwned;

use crate::common::destination::Destination;
use crate::errors::error::prelude::*;
use crate::protocols::did_exchange::context::{Context, Options};
use crate::storage::record::Record;

pub const STATE_NAME_NOOP: &str = "noop";
pub const STATE_NAME_NULL: &str = "null";
/// Invited phase of the did-exchange protocol.
pub const STATE_ID_INVITED: &str = "invited";
/// Requested phase of the did-exchange protocol.
pub const STATE_ID_REQUESTED: &str = "requested";
/// Responded phase of the did-exchange protocol.
pub const STATE_ID_RESPONDED: &str = "responded";
/// Completed phase of the did-exchange protocol.
pub const STATE_ID_COMPLETED: &str = "completed";
/// Abandoned phase of the did-exchange protocol.
pub const STATE_ID_ABANDONED: &str = "abandoned";

/// Inbound unit fed into the state machine: the raw message, the connection
/// record pre-loaded for its thread, and options supplied by the caller.
#[derive(Clone, Debug)]
pub struct StateMachineMsg {
    pub msg: DidCommMsg,
    pub conn_record: Option<Record>,
    pub options: Option<Options>,
}

impl StateMachineMsg {
    pub fn new(msg: DidCommMsg) -> Self {
        Self {
            msg,
            conn_record: None,
            options: None,
        }
    }

    pub fn msg_type(&self) -> &str {
        self.msg.msg_type()
    }

    pub fn decode<T: DeserializeOwned>(&self) -> DidExchangeResult<T> {
        self.msg.decode().map_err(DidExchangeError::from)
    }

    fn require_record(&self) -> DidExchangeResult<Record> {
        self.conn_record.clone().ok_or_else(|| {
            err_msg(
                DidExchangeErrorKind::InvalidState,
                "inbound message has no connection record attached",
            )
        })
    }
}

/// Deferred network side effect of a state execution. The framework runs it
/// only after the record and state transition have been persisted.
#[derive(Clone, Debug)]
pub enum OutboundAction {
    None,
    Send {
        message: A2AMessage,
        sender_verkey: String,
        destination: Destination,
    },
}

pub struct StateTransition {
    pub record: Option<Record>,
    pub next: Box<dyn State>,
    pub action: OutboundAction,
}

impl std::fmt::Debug for StateTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateTransition")
            .field("record", &self.record)
            .field("next", &self.next.name())
            .field("action", &self.action)
            .finish()
    }
}

/// A state of the did-exchange protocol.
#[async_trait]
pub trait State: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this state allows transitioning into the next state.
    fn can_transition_to(&self, next: &dyn State) -> bool;

    /// Handles an inbound message in this state, returning the updated
    /// record, a followup state to execute immediately ([`NoOp`] if none)
    /// and the outbound side effect to run after persisting.
    async fn execute_inbound(
        &self,
        msg: &StateMachineMsg,
        thid: &str,
        ctx: &Context,
    ) -> DidExchangeResult<StateTransition>;
}

impl std::fmt::Debug for dyn State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("dyn State").field("name", &self.name()).finish()
    }
}

/// The state the protocol moves towards when a message of the given type is
/// processed.
pub fn state_from_msg_type(msg_type: &str) -> DidExchangeResult<Box<dyn State>> {
    match msg_type {
        INVITATION_MSG_TYPE | OOB_INVITATION_MSG_TYPE => Ok(Box::new(Invited)),
        REQUEST_MSG_TYPE => Ok(Box::new(Requested)),
        RESPONSE_MSG_TYPE => Ok(Box::new(Responded)),
        ACK_MSG_TYPE | COMPLETE_MSG_TYPE => Ok(Box::new(Completed)),
        other => Err(err_msg(
            DidExchangeErrorKind::UnknownMessageType,
            format!("unrecognized msg type: {other}"),
        )),
    }
}

pub fn state_from_name(name: &str) -> DidExchangeResult<Box<dyn State>> {
    match name {
        STATE_NAME_NOOP => Ok(Box::new(NoOp)),
        STATE_NAME_NULL => Ok(Box::new(Null)),
        STATE_ID_INVITED => Ok(Box::new(Invited)),
        STATE_ID_REQUESTED => Ok(Box::new(Requested)),
        STATE_ID_RESPONDED => Ok(Box::new(Responded)),
        STATE_ID_COMPLETED => Ok(Box::new(Completed)),
        STATE_ID_ABANDONED => Ok(Box::new(Abandoned)),
        other => Err(err_msg(
            DidExchangeErrorKind::InvalidState,
            format!("invalid state name {other}"),
        )),
    }
}

/// Short message kind used in errors, e.g. `response` for the full type URI.
fn msg_kind(msg_type: &str) -> &str {
    msg_type.rsplit('/').next().unwrap_or(msg_type)
}

fn illegal_msg_type(msg_type: &str, state_name: &str) -> DidExchangeError {
    err_msg(
        DidExchangeErrorKind::InvalidState,
        format!(
            "illegal msg type {} for state {}",
            msg_kind(msg_type),
            state_name
        ),
    )
}

/// Sentinel state meaning "stay where you are"; cannot be executed.
pub struct NoOp;

#[async_trait]
impl State for NoOp {
    fn name(&self) -> &'static str {
        STATE_NAME_NOOP
    }

    fn can_transition_to(&self, _next: &dyn State) -> bool {
        false
    }

    async fn execute_inbound(
        &self,
        _msg: &StateMachineMsg,
        _thid: &str,
        _ctx: &Context,
    ) -> DidExchangeResult<StateTransition> {
        Err(err_msg(
            DidExchangeErrorKind::InvalidState,
            "cannot execute no-op",
        ))
    }
}

/// Entry sentinel: the state of a record before any message was processed.
pub struct Null;

#[async_trait]
impl State for Null {
    fn name(&self) -> &'static str {
        STATE_NAME_NULL
    }

    fn can_transition_to(&self, next: &dyn State) -> bool {
        next.name() == STATE_ID_INVITED || next.name() == STATE_ID_REQUESTED
    }

    async fn execute_inbound(
        &self,
        _msg: &StateMachineMsg,
        _thid: &str,
        _ctx: &Context,
    ) -> DidExchangeResult<StateTransition> {
        Ok(StateTransition {
            record: Some(Record::default()),
            next: Box::new(NoOp),
            action: OutboundAction::None,
        })
    }
}

pub struct Invited;

#[async_trait]
impl State for Invited {
    fn name(&self) -> &'static str {
        STATE_ID_INVITED
    }

    fn can_transition_to(&self, next: &dyn State) -> bool {
        next.name() == STATE_ID_REQUESTED
    }

    async fn execute_inbound(
        &self,
        msg: &StateMachineMsg,
        _thid: &str,
        _ctx: &Context,
    ) -> DidExchangeResult<StateTransition> {
        if msg.msg_type() != INVITATION_MSG_TYPE && msg.msg_type() != OOB_INVITATION_MSG_TYPE {
            return Err(illegal_msg_type(msg.msg_type(), self.name()));
        }

        Ok(StateTransition {
            record: msg.conn_record.clone(),
            next: Box::new(Requested),
            action: OutboundAction::None,
        })
    }
}

pub struct Requested;

#[async_trait]
impl State for Requested {
    fn name(&self) -> &'static str {
        STATE_ID_REQUESTED
    }

    fn can_transition_to(&self, next: &dyn State) -> bool {
        next.name() == STATE_ID_RESPONDED
    }

    async fn execute_inbound(
        &self,
        msg: &StateMachineMsg,
        thid: &str,
        ctx: &Context,
    ) -> DidExchangeResult<StateTransition> {
        let options = msg.options.clone().unwrap_or_default();
        match msg.msg_type() {
            OOB_INVITATION_MSG_TYPE => {
                let (action, record) = ctx
                    .handle_inbound_oob_invitation(msg, thid, &options)
                    .await
                    .map_err(|err| err.extend("failed to handle inbound oob invitation"))?;

                Ok(StateTransition {
                    record: Some(record),
                    next: Box::new(NoOp),
                    action,
                })
            }
            INVITATION_MSG_TYPE => {
                let invitation: Invitation = msg
                    .decode()
                    .map_err(|err| err.extend("JSON unmarshalling of invitation"))?;

                let (action, record) = ctx
                    .handle_inbound_invitation(&invitation, thid, &options, msg.require_record()?)
                    .await
                    .map_err(|err| err.extend("handle inbound invitation"))?;

                Ok(StateTransition {
                    record: Some(record),
                    next: Box::new(NoOp),
                    action,
                })
            }
            REQUEST_MSG_TYPE => Ok(StateTransition {
                record: msg.conn_record.clone(),
                next: Box::new(Responded),
                action: OutboundAction::None,
            }),
            other => Err(illegal_msg_type(other, self.name())),
        }
    }
}

pub struct Responded;

#[async_trait]
impl State for Responded {
    fn name(&self) -> &'static str {
        STATE_ID_RESPONDED
    }

    fn can_transition_to(&self, next: &dyn State) -> bool {
        next.name() == STATE_ID_COMPLETED
    }

    async fn execute_inbound(
        &self,
        msg: &StateMachineMsg,
        _thid: &str,
        ctx: &Context,
    ) -> DidExchangeResult<StateTransition> {
        let options = msg.options.clone().unwrap_or_default();
        match msg.msg_type() {
            REQUEST_MSG_TYPE => {
                let request: Request = msg
                    .decode()
                    .map_err(|err| err.extend("JSON unmarshalling of request"))?;

                let (action, record) = ctx
                    .handle_inbound_request(&request, &options, msg.require_record()?)
                    .await
                    .map_err(|err| err.extend("handle inbound request"))?;

                Ok(StateTransition {
                    record: Some(record),
                    next: Box::new(NoOp),
                    action,
                })
            }
            RESPONSE_MSG_TYPE | COMPLETE_MSG_TYPE => Ok(StateTransition {
                record: msg.conn_record.clone(),
                next: Box::new(Completed),
                action: OutboundAction::None,
            }),
            other => Err(illegal_msg_type(other, self.name())),
        }
    }
}

pub struct Completed;

#[async_trait]
impl State for Completed {
    fn name(&self) -> &'static str {
        STATE_ID_COMPLETED
    }

    fn can_transition_to(&self, _next: &dyn State) -> bool {
        false
    }

    async fn execute_inbound(
        &self,
        msg: &StateMachineMsg,
        _thid: &str,
        ctx: &Context,
    ) -> DidExchangeResult<StateTransition> {
        match msg.msg_type() {
            RESPONSE_MSG_TYPE => {
                let response: Response = msg
                    .decode()
                    .map_err(|err| err.extend("JSON unmarshalling of response"))?;

                let (action, record) = ctx
                    .handle_inbound_response(&response)
                    .await
                    .map_err(|err| err.extend("handle inbound response"))?;

                Ok(StateTransition {
                    record: Some(record),
                    next: Box::new(NoOp),
                    action,
                })
            }
            ACK_MSG_TYPE => Ok(StateTransition {
                record: msg.conn_record.clone(),
                next: Box::new(NoOp),
                action: OutboundAction::None,
            }),
            COMPLETE_MSG_TYPE => {
                let _complete: Complete = msg
                    .decode()
                    .map_err(|err| err.extend("JSON unmarshalling of complete"))?;

                Ok(StateTransition {
                    record: msg.conn_record.clone(),
                    next: Box::new(NoOp),
                    action: OutboundAction::None,
                })
            }
            other => Err(illegal_msg_type(other, self.name())),
        }
    }
}

/// Declared terminal failure state. Transitions into it are not wired up;
/// problem-report handling is a protocol extension this core does not
/// implement.
pub struct Abandoned;

#[async_trait]
impl State for Abandoned {
    fn name(&self) -> &'static str {
        STATE_ID_ABANDONED
    }

    fn can_transition_to(&self, _next: &dyn State) -> bool {
        false
    }

    async fn execute_inbound(
        &self,
        _msg: &StateMachineMsg,
        _thid: &str,
        _ctx: &Context,
    ) -> DidExchangeResult<StateTransition> {
        Err(err_msg(
            DidExchangeErrorKind::UnimplementedFeature,
            "not implemented",
        ))
    }
}
