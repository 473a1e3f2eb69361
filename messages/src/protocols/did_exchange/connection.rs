use diddoc::aries::diddoc::AriesDidDoc;
use serde::{Deserialize, Serialize};

/// The pairwise DID a party contributes to the connection. When the document
/// is omitted the remote side resolves the DID through its registry.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Connection {
    #[serde(rename = "DID")]
    pub did: String,
    #[serde(rename = "DIDDoc", default, skip_serializing_if = "Option::is_none")]
    pub did_doc: Option<AriesDidDoc>,
}

/// Signature over a [`Connection`] prefixed by an 8-byte big-endian UNIX
/// timestamp. `sig_data` and `signature` are URL-safe base64; `signer` is
/// the `did:key` form of the signing Ed25519 key.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ConnectionSignature {
    #[serde(rename = "@type", skip_serializing_if = "String::is_empty")]
    pub msg_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub signature: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sig_data: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub signer: String,
}

#[cfg(test)]
mod unit_tests {
    use serde_json::json;

    use super::*;
    use crate::msg_types::CONNECTION_SIGNATURE_TYPE;

    #[test]
    fn test_connection_wire_names() {
        let conn = Connection {
            did: "did:peer:abc".to_string(),
            did_doc: None,
        };
        assert_eq!(
            serde_json::to_value(&conn).unwrap(),
            json!({ "DID": "did:peer:abc" })
        );
    }

    #[test]
    fn test_connection_signature_wire_names() {
        let sig = ConnectionSignature {
            msg_type: CONNECTION_SIGNATURE_TYPE.to_string(),
            signature: "c2ln".to_string(),
            sig_data: "ZGF0YQ==".to_string(),
            signer: "did:key:z6MkexampleX".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&sig).unwrap(),
            json!({
                "@type": CONNECTION_SIGNATURE_TYPE,
                "signature": "c2ln",
                "sig_data": "ZGF0YQ==",
                "signer": "did:key:z6MkexampleX"
            })
        );
    }
}
