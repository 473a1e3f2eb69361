use async_trait::async_trait;
use diddoc::aries::diddoc::AriesDidDoc;
use messages::protocols::did_exchange::{Invitation, OobInvitation};
use sha2::{Digest, Sha256};

use crate::errors::error::prelude::*;
use crate::storage::record::Record;

/// Namespace prefix for records indexed by the thread id of inbound
/// messages we initiated (our own requests).
pub const MY_NS_PREFIX: &str = "my";
/// Namespace prefix for records indexed by thread ids chosen by the remote.
pub const THEIR_NS_PREFIX: &str = "their";

/// Store of connection records and received invitations.
///
/// `get_oob_invitation` must return an error of kind
/// [`DidExchangeErrorKind::NotFound`] when no invitation is stored under the
/// id; the verification-key resolver relies on that sentinel to fall back to
/// the legacy invitation store.
#[async_trait]
pub trait ConnectionRecorder: Send + Sync {
    async fn get_invitation(&self, id: &str) -> DidExchangeResult<Invitation>;

    async fn get_oob_invitation(&self, id: &str) -> DidExchangeResult<OobInvitation>;

    async fn get_record_by_ns_thread_id(&self, ns_thread_id: &str) -> DidExchangeResult<Record>;

    async fn save_record(&self, record: &Record) -> DidExchangeResult<()>;

    /// Indexes the DIDs and keys of a document owned by this agent, so
    /// inbound envelopes can later be correlated with the connection.
    async fn save_did_from_doc(&self, did_doc: &AriesDidDoc) -> DidExchangeResult<()>;
}

/// Key under which a record is filed for lookup by thread id. The thread id
/// is hashed so remote-chosen ids of arbitrary length stay storage-safe.
pub fn create_namespace_key(prefix: &str, thread_id: &str) -> DidExchangeResult<String> {
    if thread_id.is_empty() {
        return Err(err_msg(
            DidExchangeErrorKind::InvalidInput,
            "cannot create namespace key from empty thread id",
        ));
    }
    let digest = Sha256::digest(thread_id.as_bytes());
    Ok(format!("{prefix}:{}", hex::encode(digest)))
}
