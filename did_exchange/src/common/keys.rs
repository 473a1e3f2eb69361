use diddoc::aries::diddoc::{AriesDidDoc, VerificationMethod, VerificationMethodType};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::DecodePublicKey;
use public_key::Key;

use crate::errors::error::prelude::*;
use crate::plugins::kms::{KeyManager, KeyType};

/// `did:key` form of raw Ed25519 public key bytes.
pub fn did_key_from_pub_key(pub_key_bytes: &[u8]) -> String {
    Key::new(pub_key_bytes.to_vec(), public_key::KeyType::Ed25519).did_key()
}

/// Raw public key bytes of a `did:key`.
pub fn pub_key_from_did_key(did_key: &str) -> DidExchangeResult<Vec<u8>> {
    let key = Key::from_did_key(did_key)
        .map_err(|err| DidExchangeError::from(err).extend("failed to parse did:key"))?;
    Ok(key.key().to_vec())
}

pub fn ver_method_type(key_type: KeyType) -> VerificationMethodType {
    match key_type {
        KeyType::Ed25519 => VerificationMethodType::Ed25519VerificationKey2018,
        KeyType::Bls12381G2 => VerificationMethodType::Bls12381G2Key2020,
        KeyType::EcdsaP256Der
        | KeyType::EcdsaP256Ieee1363
        | KeyType::EcdsaP384Der
        | KeyType::EcdsaP384Ieee1363
        | KeyType::EcdsaP521Der
        | KeyType::EcdsaP521Ieee1363 => VerificationMethodType::JsonWebKey2020,
    }
}

/// Converts exported public key bytes into the form `did:key` construction
/// expects. ECDSA exports carry either a compression marker (IEEE-P1363) or
/// a full PKIX DER wrapper; both are reduced to the bare curve point.
pub fn convert_pub_key_bytes(bytes: &[u8], key_type: KeyType) -> DidExchangeResult<Vec<u8>> {
    match key_type {
        KeyType::Ed25519 | KeyType::Bls12381G2 => Ok(bytes.to_vec()),
        KeyType::EcdsaP256Ieee1363 | KeyType::EcdsaP384Ieee1363 | KeyType::EcdsaP521Ieee1363 => {
            strip_compression_marker(bytes)
        }
        KeyType::EcdsaP256Der => {
            let key = p256::PublicKey::from_public_key_der(bytes).map_err(|err| {
                err_msg(
                    DidExchangeErrorKind::InvalidVerkey,
                    format!("invalid P-256 DER public key: {err}"),
                )
            })?;
            strip_compression_marker(key.to_encoded_point(false).as_bytes())
        }
        KeyType::EcdsaP384Der => {
            let key = p384::PublicKey::from_public_key_der(bytes).map_err(|err| {
                err_msg(
                    DidExchangeErrorKind::InvalidVerkey,
                    format!("invalid P-384 DER public key: {err}"),
                )
            })?;
            strip_compression_marker(key.to_encoded_point(false).as_bytes())
        }
        KeyType::EcdsaP521Der => {
            let key = p521::PublicKey::from_public_key_der(bytes).map_err(|err| {
                err_msg(
                    DidExchangeErrorKind::InvalidVerkey,
                    format!("invalid P-521 DER public key: {err}"),
                )
            })?;
            strip_compression_marker(key.to_encoded_point(false).as_bytes())
        }
    }
}

fn strip_compression_marker(bytes: &[u8]) -> DidExchangeResult<Vec<u8>> {
    if bytes.len() < 2 {
        return Err(err_msg(
            DidExchangeErrorKind::InvalidVerkey,
            "EC public key too short",
        ));
    }
    Ok(bytes[1..].to_vec())
}

/// Creates a fresh key in the key manager and wires it into the document as
/// a verification method referenced from `authentication`.
pub async fn create_new_key_and_verification_method(
    did_doc: &mut AriesDidDoc,
    key_type: KeyType,
    kms: &dyn KeyManager,
) -> DidExchangeResult<()> {
    let (kid, pub_key_bytes) = kms.create_and_export_pub_key_bytes(key_type).await?;
    let pub_key_bytes = convert_pub_key_bytes(&pub_key_bytes, key_type)?;

    did_doc.add_key_and_authentication(VerificationMethod {
        id: format!("#{kid}"),
        type_: ver_method_type(key_type),
        controller: String::new(),
        public_key_base58: bs58::encode(pub_key_bytes).into_string(),
    });

    Ok(())
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_did_key_roundtrip() {
        let pub_key = [7u8; 32];
        let did_key = did_key_from_pub_key(&pub_key);
        assert!(did_key.starts_with("did:key:z"));
        assert_eq!(pub_key_from_did_key(&did_key).unwrap(), pub_key.to_vec());
    }

    #[test]
    fn test_pub_key_from_invalid_did_key_fails() {
        let err = pub_key_from_did_key("did:peer:abc").unwrap_err();
        assert_eq!(err.kind(), DidExchangeErrorKind::InvalidVerkey);
    }

    #[test]
    fn test_ed25519_bytes_pass_through() {
        let bytes = vec![1u8; 32];
        assert_eq!(
            convert_pub_key_bytes(&bytes, KeyType::Ed25519).unwrap(),
            bytes
        );
    }

    #[test]
    fn test_ieee_p1363_strips_compression_marker() {
        let mut point = vec![0x04];
        point.extend_from_slice(&[9u8; 64]);
        let converted = convert_pub_key_bytes(&point, KeyType::EcdsaP256Ieee1363).unwrap();
        assert_eq!(converted.len(), 64);
        assert_eq!(converted, vec![9u8; 64]);
    }

    #[test]
    fn test_der_p256_reencodes_to_bare_point() {
        use p256::ecdsa::SigningKey;
        use p256::pkcs8::EncodePublicKey;

        let signing_key = SigningKey::from_bytes(&[11u8; 32].into()).unwrap();
        let der = signing_key
            .verifying_key()
            .to_public_key_der()
            .unwrap()
            .into_vec();
        let converted = convert_pub_key_bytes(&der, KeyType::EcdsaP256Der).unwrap();
        // bare uncompressed point: x || y
        assert_eq!(converted.len(), 64);
    }

    #[test]
    fn test_garbage_der_fails() {
        let err = convert_pub_key_bytes(&[1, 2, 3], KeyType::EcdsaP384Der).unwrap_err();
        assert_eq!(err.kind(), DidExchangeErrorKind::InvalidVerkey);
    }

    #[test]
    fn test_ver_method_type_mapping() {
        assert_eq!(
            ver_method_type(KeyType::Ed25519),
            VerificationMethodType::Ed25519VerificationKey2018
        );
        assert_eq!(
            ver_method_type(KeyType::Bls12381G2),
            VerificationMethodType::Bls12381G2Key2020
        );
        assert_eq!(
            ver_method_type(KeyType::EcdsaP521Der),
            VerificationMethodType::JsonWebKey2020
        );
    }
}
