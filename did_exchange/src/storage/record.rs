use serde::{Deserialize, Serialize};

/// Persisted connection record, mutated by the state handlers as the
/// exchange progresses. The thread id is set once when the record is
/// created and never changes; the parent thread id carries the invitation
/// id (or the bare DID for implicit connections) across messages.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Record {
    pub connection_id: String,
    pub state: String,
    pub thread_id: String,
    pub parent_thread_id: String,
    pub their_label: String,
    pub their_did: String,
    pub my_did: String,
    pub service_endpoint: String,
    pub recipient_keys: Vec<String>,
    pub routing_keys: Vec<String>,
    pub invitation_id: String,
    /// True when the connection was bootstrapped from a bare public DID
    /// rather than an explicit invitation.
    pub implicit: bool,
    pub namespace: String,
    pub media_type_profiles: Vec<String>,
}
