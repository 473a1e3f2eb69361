use serde::{Deserialize, Serialize};

use crate::decorators::{attachment::Attachment, thread::Thread};

use super::connection::Connection;

/// Exchange request sent by the invitee. `connection` is the standard field;
/// `did` plus `did_doc~attach` is the signed-attachment form used by peers
/// that predate the connection block.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Request {
    #[serde(rename = "@type", skip_serializing_if = "String::is_empty")]
    pub msg_type: String,
    #[serde(rename = "@id", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<Connection>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub did: String,
    #[serde(rename = "did_doc~attach", skip_serializing_if = "Option::is_none")]
    pub did_doc_attach: Option<Attachment>,
    #[serde(rename = "~thread", skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
}

#[cfg(test)]
mod unit_tests {
    use serde_json::json;

    use super::*;
    use crate::msg_types::REQUEST_MSG_TYPE;

    #[test]
    fn test_request_serde() {
        let request = Request {
            msg_type: REQUEST_MSG_TYPE.to_string(),
            id: "t-1".to_string(),
            label: "Bob".to_string(),
            connection: Some(Connection {
                did: "did:peer:bob".to_string(),
                did_doc: None,
            }),
            thread: Some(Thread::builder().pthid("inv-1").build()),
            ..Request::default()
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "@type": REQUEST_MSG_TYPE,
                "@id": "t-1",
                "label": "Bob",
                "connection": { "DID": "did:peer:bob" },
                "~thread": { "pthid": "inv-1" }
            })
        );
        assert_eq!(serde_json::from_value::<Request>(value).unwrap(), request);
    }
}
