use std::fmt;

pub mod prelude {
    pub use super::{err_msg, DidExchangeError, DidExchangeErrorKind, DidExchangeResult};
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, thiserror::Error)]
pub enum DidExchangeErrorKind {
    // Protocol
    #[error("Object is in invalid state for requested operation")]
    InvalidState,
    #[error("Unrecognized message type")]
    UnknownMessageType,

    // Decoding
    #[error("Invalid JSON string")]
    InvalidJson,
    #[error("Unable to serialize")]
    SerializationError,

    // Keys & crypto
    #[error("Invalid DID")]
    InvalidDid,
    #[error("Invalid VERKEY")]
    InvalidVerkey,
    #[error("Sign or verify operation failed")]
    CryptoError,

    // Collaborators
    #[error("DID registry operation failed")]
    DidRegistryError,
    #[error("Storage operation failed")]
    StorageError,
    #[error("Record not found")]
    NotFound,
    #[error("Mediator operation failed")]
    MediatorError,
    #[error("Message failed in post")]
    PostMessageFailed,

    // Common
    #[error("Invalid input parameter")]
    InvalidInput,
    #[error("Invalid Option")]
    InvalidOption,
    #[error("Unimplemented feature")]
    UnimplementedFeature,
}

#[derive(Clone, thiserror::Error)]
pub struct DidExchangeError {
    msg: String,
    kind: DidExchangeErrorKind,
}

impl fmt::Display for DidExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error: {}", self.msg)
    }
}

impl fmt::Debug for DidExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} [kind: {:?}]", self, self.kind)
    }
}

impl DidExchangeError {
    pub fn from_msg<D>(kind: DidExchangeErrorKind, msg: D) -> DidExchangeError
    where
        D: fmt::Display,
    {
        DidExchangeError {
            msg: msg.to_string(),
            kind,
        }
    }

    pub fn kind(&self) -> DidExchangeErrorKind {
        self.kind
    }

    pub fn msg(&self) -> &str {
        &self.msg
    }

    pub fn extend<D>(self, msg: D) -> DidExchangeError
    where
        D: fmt::Display,
    {
        DidExchangeError {
            msg: format!("{}: {}", msg, self.msg),
            kind: self.kind,
        }
    }
}

pub fn err_msg<D>(kind: DidExchangeErrorKind, msg: D) -> DidExchangeError
where
    D: fmt::Display,
{
    DidExchangeError::from_msg(kind, msg)
}

pub type DidExchangeResult<T> = Result<T, DidExchangeError>;
