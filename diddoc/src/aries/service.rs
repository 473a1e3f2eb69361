use serde::{Deserialize, Serialize};

/// Service type used by DIDComm v1 agents to advertise their messaging
/// endpoint, as defined in the did-exchange and out-of-band RFCs.
pub const SERVICE_TYPE_DID_COMM: &str = "did-communication";

/// Service block of an Aries DID document. Note the divergence from the w3c
/// service definition: recipient/routing keys and the `accept` media type
/// profiles live directly on the service.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AriesService {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub type_: String,
    pub priority: u32,
    #[serde(rename = "recipientKeys", skip_serializing_if = "Vec::is_empty")]
    pub recipient_keys: Vec<String>,
    #[serde(rename = "routingKeys", skip_serializing_if = "Vec::is_empty")]
    pub routing_keys: Vec<String>,
    #[serde(rename = "serviceEndpoint", skip_serializing_if = "String::is_empty")]
    pub service_endpoint: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accept: Vec<String>,
}

impl AriesService {
    pub fn create() -> Self {
        Self {
            type_: SERVICE_TYPE_DID_COMM.to_string(),
            ..Self::default()
        }
    }

    pub fn set_id(mut self, id: String) -> Self {
        self.id = id;
        self
    }

    pub fn set_service_endpoint(mut self, service_endpoint: String) -> Self {
        self.service_endpoint = service_endpoint;
        self
    }

    pub fn set_recipient_keys(mut self, recipient_keys: Vec<String>) -> Self {
        self.recipient_keys = recipient_keys;
        self
    }

    pub fn set_routing_keys(mut self, routing_keys: Vec<String>) -> Self {
        self.routing_keys = routing_keys;
        self
    }

    pub fn set_accept(mut self, accept: Vec<String>) -> Self {
        self.accept = accept;
        self
    }
}
