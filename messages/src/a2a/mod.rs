use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::protocols::did_exchange::{Ack, Complete, Request, Response};

/// Outbound messages the protocol hands to the dispatcher. Every variant
/// carries its own `@type`, so the enum serializes transparently.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum A2AMessage {
    Request(Request),
    Response(Response),
    Ack(Ack),
    Complete(Complete),
}

impl From<Request> for A2AMessage {
    fn from(msg: Request) -> Self {
        A2AMessage::Request(msg)
    }
}

impl From<Response> for A2AMessage {
    fn from(msg: Response) -> Self {
        A2AMessage::Response(msg)
    }
}

impl From<Ack> for A2AMessage {
    fn from(msg: Ack) -> Self {
        A2AMessage::Ack(msg)
    }
}

impl From<Complete> for A2AMessage {
    fn from(msg: Complete) -> Self {
        A2AMessage::Complete(msg)
    }
}

/// Loosely typed inbound message. Routing only needs the `@type` and thread
/// decorator; the payload is decoded into a concrete message once the state
/// machine knows what it is looking at.
#[derive(Clone, Debug, PartialEq)]
pub struct DidCommMsg {
    payload: Value,
}

impl DidCommMsg {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    pub fn from_msg<T: Serialize>(msg: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            payload: serde_json::to_value(msg)?,
        })
    }

    pub fn msg_type(&self) -> &str {
        self.payload["@type"].as_str().unwrap_or_default()
    }

    pub fn id(&self) -> &str {
        self.payload["@id"].as_str().unwrap_or_default()
    }

    pub fn thread_id(&self) -> &str {
        self.payload["~thread"]["thid"].as_str().unwrap_or_default()
    }

    pub fn parent_thread_id(&self) -> &str {
        self.payload["~thread"]["pthid"].as_str().unwrap_or_default()
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}
