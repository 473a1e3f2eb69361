use public_key::PublicKeyError;

use crate::errors::error::{DidExchangeError, DidExchangeErrorKind};

impl From<PublicKeyError> for DidExchangeError {
    fn from(err: PublicKeyError) -> Self {
        DidExchangeError::from_msg(DidExchangeErrorKind::InvalidVerkey, err)
    }
}
