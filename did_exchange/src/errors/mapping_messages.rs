use messages::decorators::attachment::AttachmentError;

use crate::errors::error::{DidExchangeError, DidExchangeErrorKind};

impl From<AttachmentError> for DidExchangeError {
    fn from(err: AttachmentError) -> Self {
        DidExchangeError::from_msg(
            DidExchangeErrorKind::InvalidJson,
            format!("Invalid attachment: {err}"),
        )
    }
}
