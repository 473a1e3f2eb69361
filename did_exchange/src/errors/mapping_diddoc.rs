use diddoc::errors::error::DidDocumentError;

use crate::errors::error::{DidExchangeError, DidExchangeErrorKind};

impl From<DidDocumentError> for DidExchangeError {
    fn from(err: DidDocumentError) -> Self {
        DidExchangeError::from_msg(DidExchangeErrorKind::InvalidDid, err)
    }
}
