use crate::errors::error::prelude::*;

pub const DID_PREFIX: &str = "did:";

pub fn is_did(value: &str) -> bool {
    value.starts_with(DID_PREFIX)
}

/// The method name of a DID, e.g. `peer` for `did:peer:abc`.
pub fn did_method(did: &str) -> DidExchangeResult<&str> {
    let rest = did.strip_prefix(DID_PREFIX).ok_or_else(|| {
        err_msg(
            DidExchangeErrorKind::InvalidDid,
            format!("failed to parse DID [{did}]: missing did: prefix"),
        )
    })?;
    let (method, id) = rest.split_once(':').ok_or_else(|| {
        err_msg(
            DidExchangeErrorKind::InvalidDid,
            format!("failed to parse DID [{did}]: missing method-specific id"),
        )
    })?;
    if method.is_empty() || id.is_empty() {
        return Err(err_msg(
            DidExchangeErrorKind::InvalidDid,
            format!("failed to parse DID [{did}]: empty method or id"),
        ));
    }
    Ok(method)
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_did_method_extraction() {
        assert_eq!(did_method("did:peer:GjwheH2TbTA").unwrap(), "peer");
        assert_eq!(did_method("did:sov:WRfXPg8dant").unwrap(), "sov");
        assert_eq!(did_method("did:key:z6MkexampleX").unwrap(), "key");
    }

    #[test]
    fn test_malformed_dids_are_rejected() {
        for bad in ["", "peer:abc", "did:", "did:peer", "did::abc", "did:peer:"] {
            assert!(did_method(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_is_did() {
        assert!(is_did("did:peer:abc"));
        assert!(!is_did("inv-1"));
    }
}
