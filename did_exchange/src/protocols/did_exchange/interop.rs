//! Signed-attachment response path spoken by ACA-Py peers: instead of a
//! `connection~sig` block, the response carries the DID document in a legacy
//! serialization as a base64 attachment signed with the invitation key, and
//! the bare method-specific identifier in `did`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use diddoc::aries::diddoc::{AriesDidDoc, VerificationMethodKind, CONTEXT};
use messages::decorators::attachment::{Attachment, Jws, JwsHeader};
use messages::protocols::did_exchange::{Request, Response};
use serde_json::{json, Value};

use crate::common::keys::pub_key_from_did_key;
use crate::errors::error::prelude::*;
use crate::plugins::kms::{KeyHandle, KeyType};
use crate::protocols::did_exchange::context::Context;

const DID_SOV_PREFIX: &str = "did:sov:";
const DID_PEER_PREFIX: &str = "did:peer:";

impl Context {
    pub(crate) async fn prepare_response_with_signed_attachment(
        &self,
        request: &Request,
        mut response: Response,
        response_did_doc: &AriesDidDoc,
    ) -> DidExchangeResult<Response> {
        if let Some(attachment) = &request.did_doc_attach {
            self.verify_signed_attachment(attachment)
                .await
                .map_err(|err| err.extend("verifying signature on doc~attach"))?;
        }

        let doc_bytes = serialize_interop(response_did_doc)
            .map_err(|err| err.extend("marshaling did doc"))?;
        let mut doc_attach = Attachment::base64_encoded(&doc_bytes);

        let invitation_id = request
            .thread
            .as_ref()
            .and_then(|thread| thread.pthid.clone())
            .unwrap_or_default();

        let invitation_key = self
            .get_ver_key(&invitation_id)
            .await
            .map_err(|err| err.extend("getting sender verkey"))?;

        let pub_key_bytes = pub_key_from_did_key(&invitation_key).map_err(|err| {
            err.extend(format!(
                "failed to extract pub key bytes from did:key [{invitation_key}]"
            ))
        })?;

        let signing_kid = self
            .kms
            .create_kid(&pub_key_bytes, KeyType::Ed25519)
            .map_err(|err| err.extend("failed to generate KID from public key"))?;

        let key_handle = self
            .kms
            .get(&signing_kid)
            .await
            .map_err(|err| err.extend("failed to get key handle"))?;

        self.sign_attachment(&mut doc_attach, &key_handle, &invitation_key)
            .await
            .map_err(|err| err.extend("signing did_doc~attach"))?;

        // the peer expects the naked method-specific identifier for sov DIDs
        response.did = response_did_doc
            .id
            .strip_prefix(DID_SOV_PREFIX)
            .unwrap_or(&response_did_doc.id)
            .to_string();
        response.did_doc_attach = Some(doc_attach);

        Ok(response)
    }

    async fn sign_attachment(
        &self,
        attachment: &mut Attachment,
        key_handle: &KeyHandle,
        did_key: &str,
    ) -> DidExchangeResult<()> {
        let content = attachment.data.fetch()?;

        let protected = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&json!({
            "alg": "EdDSA",
            "kid": did_key,
        }))?);
        let signing_input = signing_input(&protected, &content);

        let signature = self.crypto.sign(signing_input.as_bytes(), key_handle).await?;

        attachment.data.jws = Some(Jws {
            header: Some(JwsHeader {
                kid: did_key.to_string(),
            }),
            protected,
            signature: URL_SAFE_NO_PAD.encode(signature),
        });

        Ok(())
    }

    pub(crate) async fn verify_signed_attachment(
        &self,
        attachment: &Attachment,
    ) -> DidExchangeResult<()> {
        let jws = attachment.data.jws.as_ref().ok_or_else(|| {
            err_msg(
                DidExchangeErrorKind::InvalidInput,
                "attachment carries no signature",
            )
        })?;

        let kid = jws
            .header
            .as_ref()
            .map(|header| header.kid.clone())
            .ok_or_else(|| {
                err_msg(
                    DidExchangeErrorKind::InvalidInput,
                    "attachment signature has no kid",
                )
            })?;

        let pub_key_bytes = pub_key_from_did_key(&kid)?;

        let content = attachment.data.fetch()?;
        let signing_input = signing_input(&jws.protected, &content);

        let signature = URL_SAFE_NO_PAD.decode(&jws.signature).map_err(|err| {
            err_msg(
                DidExchangeErrorKind::InvalidInput,
                format!("attachment signature is not valid base64url: {err}"),
            )
        })?;

        self.crypto
            .verify(&signature, signing_input.as_bytes(), &pub_key_bytes)
            .await
            .map_err(|err| err.extend("attachment signature does not verify"))
    }
}

fn signing_input(protected: &str, content: &[u8]) -> String {
    format!("{protected}.{}", URL_SAFE_NO_PAD.encode(content))
}

/// Rewrites a freshly created peer DID document as a `sov` document, the
/// method the peer expects in the signed-attachment flow.
pub(crate) fn convert_peer_to_sov(mut did_doc: AriesDidDoc) -> DidExchangeResult<AriesDidDoc> {
    let Some(suffix) = did_doc.id.strip_prefix(DID_PEER_PREFIX) else {
        return Ok(did_doc);
    };
    let sov_did = format!("{DID_SOV_PREFIX}{suffix}");

    for method in &mut did_doc.verification_method {
        if method.controller == did_doc.id {
            method.controller = sov_did.clone();
        }
    }
    did_doc.id = sov_did;

    Ok(did_doc)
}

/// Legacy serialization of the DID document: keys under `publicKey`,
/// authentication entries typed, as the first generation of agents wrote it.
pub(crate) fn serialize_interop(did_doc: &AriesDidDoc) -> DidExchangeResult<Vec<u8>> {
    let public_key: Vec<Value> = did_doc
        .verification_method
        .iter()
        .map(|method| {
            json!({
                "id": method.id,
                "type": method.type_.to_string(),
                "controller": method.controller,
                "publicKeyBase58": method.public_key_base58,
            })
        })
        .collect();

    let authentication: Vec<Value> = did_doc
        .authentication
        .iter()
        .map(|entry| {
            let reference = match entry {
                VerificationMethodKind::Resolvable(reference) => reference.clone(),
                VerificationMethodKind::Resolved(method) => method.id.clone(),
            };
            json!({
                "type": "Ed25519SignatureAuthentication2018",
                "publicKey": reference,
            })
        })
        .collect();

    let doc = json!({
        "@context": CONTEXT,
        "id": did_doc.id,
        "publicKey": public_key,
        "authentication": authentication,
        "service": did_doc.service,
    });

    Ok(serde_json::to_vec(&doc)?)
}

#[cfg(test)]
mod unit_tests {
    use diddoc::aries::diddoc::{VerificationMethod, VerificationMethodType};
    use diddoc::aries::service::AriesService;

    use super::*;
    use crate::utils::test_utils::TestAgent;

    fn peer_doc() -> AriesDidDoc {
        let mut doc = AriesDidDoc::default();
        doc.set_id("did:peer:XYZ".to_string());
        doc.add_key_and_authentication(VerificationMethod {
            id: "#key-1".to_string(),
            type_: VerificationMethodType::Ed25519VerificationKey2018,
            controller: "did:peer:XYZ".to_string(),
            public_key_base58: bs58::encode([3u8; 32]).into_string(),
        });
        doc.service.push(
            AriesService::create().set_service_endpoint("https://inviter.example.com".to_string()),
        );
        doc
    }

    #[test]
    fn test_convert_peer_to_sov_rewrites_id_and_controller() {
        let doc = convert_peer_to_sov(peer_doc()).unwrap();
        assert_eq!(doc.id, "did:sov:XYZ");
        assert_eq!(doc.verification_method[0].controller, "did:sov:XYZ");
    }

    #[test]
    fn test_convert_leaves_non_peer_docs_alone() {
        let mut doc = peer_doc();
        doc.id = "did:sov:already".to_string();
        let converted = convert_peer_to_sov(doc.clone()).unwrap();
        assert_eq!(converted, doc);
    }

    #[test]
    fn test_interop_serialization_shape() {
        let doc = peer_doc();
        let bytes = serialize_interop(&doc).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["@context"], CONTEXT);
        assert_eq!(value["publicKey"][0]["type"], "Ed25519VerificationKey2018");
        assert_eq!(
            value["authentication"][0]["type"],
            "Ed25519SignatureAuthentication2018"
        );
        assert_eq!(value["authentication"][0]["publicKey"], "#key-1");
        assert!(value.get("verificationMethod").is_none());
    }

    #[tokio::test]
    async fn test_attachment_sign_verify_roundtrip() {
        let agent = TestAgent::new();
        let ctx = agent.context();
        let invitation_key = agent.new_invitation("inv-1").await;

        let doc_bytes = serialize_interop(&peer_doc()).unwrap();
        let mut attachment = Attachment::base64_encoded(&doc_bytes);

        let pub_key = pub_key_from_did_key(&invitation_key).unwrap();
        let kid = ctx.kms.create_kid(&pub_key, KeyType::Ed25519).unwrap();
        let key_handle = ctx.kms.get(&kid).await.unwrap();
        ctx.sign_attachment(&mut attachment, &key_handle, &invitation_key)
            .await
            .unwrap();

        ctx.verify_signed_attachment(&attachment).await.unwrap();
    }

    #[tokio::test]
    async fn test_unsigned_attachment_fails_verification() {
        let agent = TestAgent::new();
        let ctx = agent.context();

        let attachment = Attachment::base64_encoded(b"{}");
        let err = ctx.verify_signed_attachment(&attachment).await.unwrap_err();
        assert_eq!(err.kind(), DidExchangeErrorKind::InvalidInput);
    }
}
