use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const MIME_TYPE_JSON: &str = "application/json";

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Attachment carries no base64 or json content")]
    NoContent,
    #[error("Base 64 decoding error: {0}")]
    Base64DecodingError(#[from] base64::DecodeError),
    #[error("JSON encoding error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// The `~attach` decorator used to embed a payload (here: a DID document)
/// into a message.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Attachment {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "mime-type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub data: AttachmentData,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AttachmentData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jws: Option<Jws>,
}

/// Detached JWS protecting the attachment content.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Jws {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<JwsHeader>,
    pub protected: String,
    pub signature: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct JwsHeader {
    pub kid: String,
}

impl Attachment {
    pub fn base64_encoded(content: &[u8]) -> Self {
        Self {
            id: None,
            mime_type: Some(MIME_TYPE_JSON.to_string()),
            data: AttachmentData {
                base64: Some(STANDARD.encode(content)),
                json: None,
                jws: None,
            },
        }
    }
}

impl AttachmentData {
    /// Raw content bytes, whichever representation the sender used.
    pub fn fetch(&self) -> Result<Vec<u8>, AttachmentError> {
        if let Some(base64) = &self.base64 {
            return Ok(STANDARD.decode(base64)?);
        }
        if let Some(json) = &self.json {
            return Ok(serde_json::to_vec(json)?);
        }
        Err(AttachmentError::NoContent)
    }
}

#[cfg(test)]
mod unit_tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_base64_fetch_roundtrip() {
        let attachment = Attachment::base64_encoded(b"{\"id\":\"did:peer:abc\"}");
        assert_eq!(
            attachment.data.fetch().unwrap(),
            b"{\"id\":\"did:peer:abc\"}"
        );
    }

    #[test]
    fn test_json_fetch() {
        let data = AttachmentData {
            base64: None,
            json: Some(json!({"id": "did:peer:abc"})),
            jws: None,
        };
        let bytes = data.fetch().unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["id"], "did:peer:abc");
    }

    #[test]
    fn test_empty_attachment_fails() {
        let data = AttachmentData::default();
        assert!(matches!(
            data.fetch().unwrap_err(),
            AttachmentError::NoContent
        ));
    }

    #[test]
    fn test_wire_names() {
        let mut attachment = Attachment::base64_encoded(b"x");
        attachment.id = Some("attach-1".to_string());
        let value = serde_json::to_value(&attachment).unwrap();
        assert!(value.get("@id").is_some());
        assert!(value.get("mime-type").is_some());
    }
}
