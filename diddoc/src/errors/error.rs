use thiserror::Error;

#[derive(Debug, Error)]
pub enum DidDocumentError {
    #[error("No service of type `{0}` found on DID document `{1}`")]
    ServiceNotFound(String, String),
    #[error("Verification method `{0}` not found on DID document `{1}`")]
    VerificationMethodNotFound(String, String),
    #[error("Malformed DID `{0}`: {1}")]
    MalformedDid(String, String),
}
