use serde::{Deserialize, Serialize};

/// Legacy pairwise invitation. Either `did` is set (and the receiver resolves
/// the service from the DID document) or the service details are inlined.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Invitation {
    #[serde(rename = "@type", skip_serializing_if = "String::is_empty")]
    pub msg_type: String,
    #[serde(rename = "@id", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub did: String,
    #[serde(rename = "recipientKeys", skip_serializing_if = "Vec::is_empty")]
    pub recipient_keys: Vec<String>,
    #[serde(rename = "serviceEndpoint", skip_serializing_if = "String::is_empty")]
    pub service_endpoint: String,
    #[serde(rename = "routingKeys", skip_serializing_if = "Vec::is_empty")]
    pub routing_keys: Vec<String>,
    #[serde(rename = "imageUrl", skip_serializing_if = "String::is_empty")]
    pub image_url: String,
}
