use serde::{Deserialize, Serialize};

use crate::decorators::{attachment::Attachment, thread::Thread};

use super::connection::ConnectionSignature;

/// Exchange response sent by the inviter. The standard form carries the
/// signed connection under `connection~sig`; the signed-attachment form sets
/// `did` and `did_doc~attach` instead.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Response {
    #[serde(rename = "@type", skip_serializing_if = "String::is_empty")]
    pub msg_type: String,
    #[serde(rename = "@id", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "connection~sig", skip_serializing_if = "Option::is_none")]
    pub connection_signature: Option<ConnectionSignature>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub did: String,
    #[serde(rename = "did_doc~attach", skip_serializing_if = "Option::is_none")]
    pub did_doc_attach: Option<Attachment>,
    #[serde(rename = "~thread")]
    pub thread: Thread,
}

#[cfg(test)]
mod unit_tests {
    use serde_json::json;

    use super::*;
    use crate::msg_types::{CONNECTION_SIGNATURE_TYPE, RESPONSE_MSG_TYPE};

    #[test]
    fn test_response_serde() {
        let response = Response {
            msg_type: RESPONSE_MSG_TYPE.to_string(),
            id: "resp-1".to_string(),
            connection_signature: Some(ConnectionSignature {
                msg_type: CONNECTION_SIGNATURE_TYPE.to_string(),
                signature: "c2ln".to_string(),
                sig_data: "ZGF0YQ==".to_string(),
                signer: "did:key:z6MkexampleX".to_string(),
            }),
            thread: Thread::builder().thid("t-1").build(),
            ..Response::default()
        };

        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("connection~sig").is_some());
        assert_eq!(value["~thread"]["thid"], "t-1");
        assert_eq!(serde_json::from_value::<Response>(value).unwrap(), response);
    }
}
