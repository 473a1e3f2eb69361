use diddoc::aries::service::AriesService;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Out-of-band invitation as seen by the did-exchange protocol. The newer
/// invitation format can point at its inviter in three shapes, so `target`
/// is a sum resolved at decode time.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OobInvitation {
    #[serde(rename = "@type", skip_serializing_if = "String::is_empty")]
    pub msg_type: String,
    #[serde(rename = "@id", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "thid", skip_serializing_if = "String::is_empty")]
    pub thread_id: String,
    #[serde(rename = "their_label", skip_serializing_if = "String::is_empty")]
    pub their_label: String,
    #[serde(rename = "my_label", skip_serializing_if = "String::is_empty")]
    pub my_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<OobTarget>,
    #[serde(rename = "media_type_profiles", skip_serializing_if = "Vec::is_empty")]
    pub media_type_profiles: Vec<String>,
}

/// The polymorphic invitation target: a DID to resolve, an inlined service
/// block, or an arbitrary JSON value decoded into a service at use time.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum OobTarget {
    DidRef(String),
    Service(AriesService),
    Raw(Value),
}
