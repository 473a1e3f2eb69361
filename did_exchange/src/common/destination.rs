use diddoc::aries::diddoc::AriesDidDoc;
use diddoc::aries::service::SERVICE_TYPE_DID_COMM;
use serde::{Deserialize, Serialize};

use crate::common::keys::did_key_from_pub_key;
use crate::errors::error::prelude::*;

/// Where an outbound message goes and through which keys: the remote's
/// `did-communication` service, with keys normalised to `did:key` form.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Destination {
    pub recipient_keys: Vec<String>,
    pub service_endpoint: String,
    pub routing_keys: Vec<String>,
    pub media_type_profiles: Vec<String>,
}

pub fn create_destination(did_doc: &AriesDidDoc) -> DidExchangeResult<Destination> {
    let service = did_doc.resolve_service(SERVICE_TYPE_DID_COMM).ok_or_else(|| {
        err_msg(
            DidExchangeErrorKind::InvalidDid,
            format!(
                "no {SERVICE_TYPE_DID_COMM} service found on did doc [{}]",
                did_doc.id
            ),
        )
    })?;

    let recipient_keys = service
        .recipient_keys
        .iter()
        .map(|key| normalize_key_ref(did_doc, key))
        .collect::<DidExchangeResult<Vec<_>>>()?;
    if recipient_keys.is_empty() {
        return Err(err_msg(
            DidExchangeErrorKind::InvalidDid,
            format!(
                "{SERVICE_TYPE_DID_COMM} service on did doc [{}] has no recipient keys",
                did_doc.id
            ),
        ));
    }

    let routing_keys = service
        .routing_keys
        .iter()
        .map(|key| normalize_key_ref(did_doc, key))
        .collect::<DidExchangeResult<Vec<_>>>()?;

    Ok(Destination {
        recipient_keys,
        service_endpoint: service.service_endpoint.clone(),
        routing_keys,
        media_type_profiles: service.accept.clone(),
    })
}

/// The `did:key` id of the first recipient key of the doc's destination.
pub fn recipient_key(did_doc: &AriesDidDoc) -> DidExchangeResult<String> {
    let destination = create_destination(did_doc)
        .map_err(|err| err.extend("failed to create destination"))?;
    Ok(destination.recipient_keys[0].clone())
}

/// Service blocks reference keys as `did:key` ids, as verification method
/// references, or as bare base58 verkeys; all are mapped to `did:key`.
fn normalize_key_ref(did_doc: &AriesDidDoc, key: &str) -> DidExchangeResult<String> {
    if key.starts_with("did:key:") {
        return Ok(key.to_string());
    }
    if key.contains('#') {
        let method = did_doc.resolve_verification_method(key).ok_or_else(|| {
            err_msg(
                DidExchangeErrorKind::InvalidDid,
                format!("service recipient key [{key}] not found among verification methods"),
            )
        })?;
        let pub_key_bytes = bs58::decode(&method.public_key_base58)
            .into_vec()
            .map_err(|err| {
                err_msg(
                    DidExchangeErrorKind::InvalidVerkey,
                    format!("verification method [{key}] is not valid base58: {err}"),
                )
            })?;
        return Ok(did_key_from_pub_key(&pub_key_bytes));
    }
    let pub_key_bytes = bs58::decode(key).into_vec().map_err(|err| {
        err_msg(
            DidExchangeErrorKind::InvalidVerkey,
            format!("recipient key [{key}] is not valid base58: {err}"),
        )
    })?;
    Ok(did_key_from_pub_key(&pub_key_bytes))
}
