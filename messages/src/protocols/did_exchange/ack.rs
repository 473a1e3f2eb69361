use serde::{Deserialize, Serialize};

use crate::decorators::thread::Thread;

pub const ACK_STATUS_OK: &str = "ok";

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Ack {
    #[serde(rename = "@type", skip_serializing_if = "String::is_empty")]
    pub msg_type: String,
    #[serde(rename = "@id", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(rename = "~thread", skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
}
