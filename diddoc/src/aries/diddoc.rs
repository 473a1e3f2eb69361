use serde::{Deserialize, Serialize};

use crate::aries::service::AriesService;

pub const CONTEXT: &str = "https://w3id.org/did/v1";

fn default_context() -> String {
    CONTEXT.to_string()
}

/// DID document in the flat JSON-LD shape exchanged by DIDComm v1 agents.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AriesDidDoc {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    // older agents publish keys under `publicKey` instead of `verificationMethod`
    #[serde(rename = "verificationMethod", alias = "publicKey", skip_serializing_if = "Vec::is_empty")]
    pub verification_method: Vec<VerificationMethod>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<VerificationMethodKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<AriesService>,
}

impl Default for AriesDidDoc {
    fn default() -> Self {
        Self {
            context: default_context(),
            id: String::new(),
            verification_method: Vec::new(),
            authentication: Vec::new(),
            service: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: VerificationMethodType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub controller: String,
    #[serde(rename = "publicKeyBase58", default, skip_serializing_if = "String::is_empty")]
    pub public_key_base58: String,
}

/// An authentication entry is either a reference to a verification method
/// declared elsewhere in the document or an embedded method of its own.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum VerificationMethodKind {
    Resolvable(String),
    Resolved(VerificationMethod),
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum VerificationMethodType {
    Ed25519VerificationKey2018,
    Bls12381G2Key2020,
    JsonWebKey2020,
}

impl std::fmt::Display for VerificationMethodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationMethodType::Ed25519VerificationKey2018 => {
                write!(f, "Ed25519VerificationKey2018")
            }
            VerificationMethodType::Bls12381G2Key2020 => write!(f, "Bls12381G2Key2020"),
            VerificationMethodType::JsonWebKey2020 => write!(f, "JsonWebKey2020"),
        }
    }
}

impl AriesDidDoc {
    pub fn set_id(&mut self, id: String) {
        self.id = id;
    }

    /// Appends a verification method and references it from `authentication`.
    pub fn add_key_and_authentication(&mut self, method: VerificationMethod) {
        let reference = method.id.clone();
        self.verification_method.push(method);
        self.authentication
            .push(VerificationMethodKind::Resolvable(reference));
    }

    /// First service of the given type, if any.
    pub fn resolve_service(&self, service_type: &str) -> Option<&AriesService> {
        self.service.iter().find(|svc| svc.type_ == service_type)
    }

    /// Looks a verification method up by id. Relative references (`#key-1`)
    /// match both the bare fragment and the fully qualified `did#fragment`.
    pub fn resolve_verification_method(&self, reference: &str) -> Option<&VerificationMethod> {
        let fragment = reference.rsplit('#').next().unwrap_or(reference);
        self.verification_method.iter().find(|vm| {
            vm.id == reference || vm.id.rsplit('#').next().unwrap_or(vm.id.as_str()) == fragment
        })
    }
}

#[cfg(test)]
pub mod unit_tests {
    use serde_json::json;

    use super::*;
    use crate::aries::service::SERVICE_TYPE_DID_COMM;

    pub fn sample_doc() -> AriesDidDoc {
        let mut doc = AriesDidDoc::default();
        doc.set_id("did:peer:GjwheH2TbTArMyf7Hv6y7v".to_string());
        doc.add_key_and_authentication(VerificationMethod {
            id: "#key-1".to_string(),
            type_: VerificationMethodType::Ed25519VerificationKey2018,
            controller: doc.id.clone(),
            public_key_base58: "CnEDk9HrMnmiHXEV1WFgbVCRteYnPqsJwrTdcZaNhFVW".to_string(),
        });
        doc.service.push(
            AriesService::create()
                .set_id("#didcomm".to_string())
                .set_service_endpoint("https://agent.example.com/msg".to_string())
                .set_recipient_keys(vec!["#key-1".to_string()]),
        );
        doc
    }

    #[test]
    fn test_did_comm_service_lookup() {
        let doc = sample_doc();
        let svc = doc.resolve_service(SERVICE_TYPE_DID_COMM).unwrap();
        assert_eq!(svc.service_endpoint, "https://agent.example.com/msg");
        assert!(doc.resolve_service("did-configuration").is_none());
    }

    #[test]
    fn test_verification_method_reference_forms() {
        let doc = sample_doc();
        assert!(doc.resolve_verification_method("#key-1").is_some());
        let qualified = format!("{}#key-1", doc.id);
        assert!(doc.resolve_verification_method(&qualified).is_some());
        assert!(doc.resolve_verification_method("#key-2").is_none());
    }

    #[test]
    fn test_authentication_serialized_as_reference() {
        let doc = sample_doc();
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["authentication"], json!(["#key-1"]));
        assert_eq!(
            value["verificationMethod"][0]["type"],
            json!("Ed25519VerificationKey2018")
        );
    }

    #[test]
    fn test_legacy_public_key_alias() {
        let legacy = json!({
            "@context": CONTEXT,
            "id": "did:sov:WRfXPg8dantKVubE3HX8pw",
            "publicKey": [{
                "id": "#key-1",
                "type": "Ed25519VerificationKey2018",
                "publicKeyBase58": "CnEDk9HrMnmiHXEV1WFgbVCRteYnPqsJwrTdcZaNhFVW"
            }]
        });
        let doc: AriesDidDoc = serde_json::from_value(legacy).unwrap();
        assert_eq!(doc.verification_method.len(), 1);
    }
}
