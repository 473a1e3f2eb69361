use serde::{Deserialize, Serialize};

use crate::decorators::thread::Thread;

/// Post-response confirmation used instead of an ack by peers following the
/// newer completion flow.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Complete {
    #[serde(rename = "@type", skip_serializing_if = "String::is_empty")]
    pub msg_type: String,
    #[serde(rename = "@id", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "~thread", skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
}
