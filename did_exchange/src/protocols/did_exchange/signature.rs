use base64::{engine::general_purpose::URL_SAFE, Engine};
use chrono::Utc;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use log::debug;
use messages::msg_types::CONNECTION_SIGNATURE_TYPE;
use messages::protocols::did_exchange::{Connection, ConnectionSignature};

use crate::common::keys::pub_key_from_did_key;
use crate::errors::error::prelude::*;
use crate::plugins::kms::KeyType;
use crate::protocols::did_exchange::context::Context;

pub(crate) const TIMESTAMP_LEN: usize = 8;

impl Context {
    /// Encodes and signs a connection as required by the exchange response:
    /// the signed payload is an 8-byte big-endian UNIX timestamp followed by
    /// the connection JSON, signed with the invitation recipient key.
    pub async fn prepare_connection_signature(
        &self,
        connection: &Connection,
        invitation_id: &str,
    ) -> DidExchangeResult<ConnectionSignature> {
        debug!(
            "preparing connection signature for connection [{}], invitation [{}]",
            connection.did, invitation_id
        );

        let payload = serde_json::to_vec(connection)
            .map_err(|err| DidExchangeError::from(err).extend("failed to marshal connection"))?;
        let sig_data = concat_sign_data(get_epoch_time(), &payload);

        let did_key = self
            .get_ver_key(invitation_id)
            .await
            .map_err(|err| err.extend("failed to get verkey"))?;

        let pub_key_bytes = pub_key_from_did_key(&did_key)
            .map_err(|err| err.extend(format!("failed to extract pub key from did:key [{did_key}]")))?;

        let signing_kid = self
            .kms
            .create_kid(&pub_key_bytes, KeyType::Ed25519)
            .map_err(|err| err.extend("failed to generate KID from public key"))?;

        let key_handle = self
            .kms
            .get(&signing_kid)
            .await
            .map_err(|err| err.extend("failed to get key handle"))?;

        let signature = self
            .crypto
            .sign(&sig_data, &key_handle)
            .await
            .map_err(|err| err.extend("sign response message"))?;

        Ok(ConnectionSignature {
            msg_type: CONNECTION_SIGNATURE_TYPE.to_string(),
            sig_data: URL_SAFE.encode(&sig_data),
            signer: did_key,
            signature: URL_SAFE.encode(signature),
        })
    }
}

/// Verifies a connection signature against the invitation recipient key and
/// extracts the signed connection. The key the signature itself declares is
/// deliberately ignored; trusting it would let a sender rebind the signature
/// to any key of its choosing.
pub fn verify_signature(
    connection_signature: &ConnectionSignature,
    recipient_key: &str,
) -> DidExchangeResult<Connection> {
    let sig_data = URL_SAFE.decode(&connection_signature.sig_data).map_err(|err| {
        err_msg(
            DidExchangeErrorKind::InvalidJson,
            format!("decode signature data: {err}"),
        )
    })?;

    if sig_data.is_empty() {
        return Err(err_msg(
            DidExchangeErrorKind::InvalidInput,
            "missing or invalid signature data",
        ));
    }

    let signature = URL_SAFE.decode(&connection_signature.signature).map_err(|err| {
        err_msg(
            DidExchangeErrorKind::InvalidJson,
            format!("decode signature: {err}"),
        )
    })?;

    let pub_key_bytes = pub_key_from_did_key(recipient_key).map_err(|err| {
        err.extend(format!(
            "failed to parse pub key from recipient key [{recipient_key}]"
        ))
    })?;

    let pub_key_bytes: [u8; 32] = pub_key_bytes.as_slice().try_into().map_err(|_| {
        err_msg(
            DidExchangeErrorKind::InvalidVerkey,
            format!("recipient key [{recipient_key}] is not a 32-byte ed25519 key"),
        )
    })?;

    let verifying_key = VerifyingKey::from_bytes(&pub_key_bytes).map_err(|err| {
        err_msg(
            DidExchangeErrorKind::InvalidVerkey,
            format!("recipient key [{recipient_key}] is not a valid ed25519 key: {err}"),
        )
    })?;

    let signature = Signature::from_slice(&signature).map_err(|err| {
        err_msg(
            DidExchangeErrorKind::CryptoError,
            format!("malformed signature: {err}"),
        )
    })?;

    verifying_key
        .verify(&sig_data, &signature)
        .map_err(|err| err_msg(DidExchangeErrorKind::CryptoError, format!("verify signature: {err}")))?;

    // trim the timestamp, only the remainder holds connection attributes
    if sig_data.len() <= TIMESTAMP_LEN {
        return Err(err_msg(
            DidExchangeErrorKind::InvalidInput,
            "missing connection attribute bytes",
        ));
    }

    let connection: Connection = serde_json::from_slice(&sig_data[TIMESTAMP_LEN..])
        .map_err(|err| DidExchangeError::from(err).extend("JSON unmarshalling of connection"))?;

    Ok(connection)
}

pub(crate) fn concat_sign_data(epoch_seconds: u64, payload: &[u8]) -> Vec<u8> {
    let mut sig_data = epoch_seconds.to_be_bytes().to_vec();
    sig_data.extend_from_slice(payload);
    sig_data
}

fn get_epoch_time() -> u64 {
    Utc::now().timestamp() as u64
}
