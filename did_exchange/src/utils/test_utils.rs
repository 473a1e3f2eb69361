//! In-memory collaborator implementations used by the test suites.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use diddoc::aries::diddoc::AriesDidDoc;
use diddoc::aries::service::SERVICE_TYPE_DID_COMM;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use messages::a2a::A2AMessage;
use messages::msg_types::INVITATION_MSG_TYPE;
use messages::protocols::did_exchange::{Invitation, OobInvitation};
use rand::rngs::OsRng;
use serde::Serialize;
use serde_json::Value;

use crate::common::destination::Destination;
use crate::common::keys::{did_key_from_pub_key, pub_key_from_did_key};
use crate::errors::error::prelude::*;
use crate::plugins::crypto::Crypto;
use crate::plugins::dispatcher::OutboundDispatcher;
use crate::plugins::kms::{deterministic_kid, KeyHandle, KeyManager, KeyType};
use crate::plugins::mediator::MediatorService;
use crate::plugins::vdr::{DidCreateOpts, DidResolution, VdrRegistry};
use crate::protocols::did_exchange::context::Context;
use crate::storage::record::Record;
use crate::storage::recorder::{create_namespace_key, ConnectionRecorder, MY_NS_PREFIX};

pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Ed25519 key manager and crypto provider over one in-memory key store.
#[derive(Default)]
pub struct LocalKms {
    keys: Mutex<HashMap<String, SigningKey>>,
}

impl LocalKms {
    pub fn key_count(&self) -> usize {
        self.keys.lock().unwrap().len()
    }
}

#[async_trait]
impl KeyManager for LocalKms {
    async fn create_and_export_pub_key_bytes(
        &self,
        key_type: KeyType,
    ) -> DidExchangeResult<(String, Vec<u8>)> {
        if key_type != KeyType::Ed25519 {
            return Err(err_msg(
                DidExchangeErrorKind::InvalidInput,
                format!("test kms only holds ed25519 keys, got {key_type:?}"),
            ));
        }
        let signing_key = SigningKey::generate(&mut OsRng);
        let pub_key_bytes = signing_key.verifying_key().to_bytes().to_vec();
        let kid = deterministic_kid(&pub_key_bytes, key_type)?;
        self.keys
            .lock()
            .unwrap()
            .insert(kid.clone(), signing_key);
        Ok((kid, pub_key_bytes))
    }

    async fn get(&self, kid: &str) -> DidExchangeResult<KeyHandle> {
        if !self.keys.lock().unwrap().contains_key(kid) {
            return Err(err_msg(
                DidExchangeErrorKind::NotFound,
                format!("no key stored under kid [{kid}]"),
            ));
        }
        Ok(KeyHandle::new(kid))
    }
}

#[async_trait]
impl Crypto for LocalKms {
    async fn sign(&self, message: &[u8], key_handle: &KeyHandle) -> DidExchangeResult<Vec<u8>> {
        let keys = self.keys.lock().unwrap();
        let signing_key = keys.get(key_handle.kid()).ok_or_else(|| {
            err_msg(
                DidExchangeErrorKind::CryptoError,
                format!("unknown key handle [{}]", key_handle.kid()),
            )
        })?;
        Ok(signing_key.sign(message).to_bytes().to_vec())
    }

    async fn verify(
        &self,
        signature: &[u8],
        message: &[u8],
        pub_key_bytes: &[u8],
    ) -> DidExchangeResult<()> {
        let pub_key: [u8; 32] = pub_key_bytes.try_into().map_err(|_| {
            err_msg(
                DidExchangeErrorKind::InvalidVerkey,
                "public key is not 32 bytes",
            )
        })?;
        let verifying_key = VerifyingKey::from_bytes(&pub_key).map_err(|err| {
            err_msg(
                DidExchangeErrorKind::InvalidVerkey,
                format!("invalid ed25519 public key: {err}"),
            )
        })?;
        let signature = Signature::from_slice(signature).map_err(|err| {
            err_msg(
                DidExchangeErrorKind::CryptoError,
                format!("malformed signature: {err}"),
            )
        })?;
        verifying_key.verify(message, &signature).map_err(|err| {
            err_msg(
                DidExchangeErrorKind::CryptoError,
                format!("signature does not verify: {err}"),
            )
        })
    }
}

#[derive(Clone, Debug)]
pub struct CreateCall {
    pub method: String,
    pub store: bool,
    pub doc_id: String,
}

/// DID registry over a hash map. Created peer DIDs get an id derived from
/// their first verification method and a normalised did-communication
/// service block, the way a real peer method derives them.
#[derive(Default)]
pub struct InMemoryVdr {
    docs: Mutex<HashMap<String, AriesDidDoc>>,
    pub create_calls: Mutex<Vec<CreateCall>>,
}

impl InMemoryVdr {
    pub fn insert(&self, doc: AriesDidDoc) {
        self.docs.lock().unwrap().insert(doc.id.clone(), doc);
    }
}

#[async_trait]
impl VdrRegistry for InMemoryVdr {
    async fn resolve(&self, did: &str) -> DidExchangeResult<DidResolution> {
        let docs = self.docs.lock().unwrap();
        let did_document = docs.get(did).cloned().ok_or_else(|| {
            err_msg(
                DidExchangeErrorKind::DidRegistryError,
                format!("unable to resolve did [{did}]"),
            )
        })?;
        Ok(DidResolution { did_document })
    }

    async fn create(
        &self,
        method: &str,
        did_doc: &AriesDidDoc,
        opts: DidCreateOpts,
    ) -> DidExchangeResult<DidResolution> {
        self.create_calls.lock().unwrap().push(CreateCall {
            method: method.to_string(),
            store: opts.store,
            doc_id: did_doc.id.clone(),
        });

        let mut doc = did_doc.clone();

        if opts.store {
            // persisting a document provided by the remote: keep it as-is
            self.insert(doc.clone());
            return Ok(DidResolution { did_document: doc });
        }

        let first_method = doc.verification_method.first().cloned().ok_or_else(|| {
            err_msg(
                DidExchangeErrorKind::DidRegistryError,
                "cannot create a did from a document without keys",
            )
        })?;

        if doc.id.is_empty() {
            let suffix = &first_method.public_key_base58[..16.min(first_method.public_key_base58.len())];
            doc.id = format!("did:{method}:{suffix}");
        }

        for (index, service) in doc.service.iter_mut().enumerate() {
            if service.id.is_empty() {
                service.id = format!("#service-{index}");
            }
            if service.type_.is_empty() {
                service.type_ = SERVICE_TYPE_DID_COMM.to_string();
            }
            if service.recipient_keys.is_empty() {
                service.recipient_keys = vec![first_method.id.clone()];
            }
        }

        self.insert(doc.clone());
        Ok(DidResolution { did_document: doc })
    }
}

#[derive(Clone, Debug)]
pub struct SentMessage {
    pub message: A2AMessage,
    pub sender_verkey: String,
    pub destination: Destination,
}

/// Dispatcher that records what would have gone out on the wire.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub sent: Mutex<Vec<SentMessage>>,
}

impl RecordingDispatcher {
    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl OutboundDispatcher for RecordingDispatcher {
    async fn send(
        &self,
        msg: &A2AMessage,
        sender_verkey: &str,
        destination: &Destination,
    ) -> DidExchangeResult<()> {
        self.sent.lock().unwrap().push(SentMessage {
            message: msg.clone(),
            sender_verkey: sender_verkey.to_string(),
            destination: destination.clone(),
        });
        Ok(())
    }
}

/// Mediator answering every router connection with one configured endpoint.
pub struct StubMediator {
    pub endpoint: String,
    pub routing_keys: Vec<String>,
    pub registered_keys: Mutex<Vec<(String, String)>>,
}

impl Default for StubMediator {
    fn default() -> Self {
        Self {
            endpoint: "https://mediator.example.com/msg".to_string(),
            routing_keys: vec![did_key_from_pub_key(&[42u8; 32])],
            registered_keys: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MediatorService for StubMediator {
    async fn get_router_config(
        &self,
        _conn_id: &str,
        _default_endpoint: &str,
    ) -> DidExchangeResult<(String, Vec<String>)> {
        Ok((self.endpoint.clone(), self.routing_keys.clone()))
    }

    async fn add_key_to_router(
        &self,
        conn_id: &str,
        recipient_key: &str,
    ) -> DidExchangeResult<()> {
        self.registered_keys
            .lock()
            .unwrap()
            .push((conn_id.to_string(), recipient_key.to_string()));
        Ok(())
    }
}

/// Recorder over hash maps, with invitations stored as raw JSON the way a
/// shared invitation store would hold them.
#[derive(Default)]
pub struct InMemoryRecorder {
    invitations: Mutex<HashMap<String, Value>>,
    records: Mutex<HashMap<String, Record>>,
    ns_index: Mutex<HashMap<String, String>>,
    pub saved_dids: Mutex<Vec<String>>,
}

impl InMemoryRecorder {
    pub fn save_invitation<T: Serialize>(&self, id: &str, invitation: &T) {
        let value = serde_json::to_value(invitation).expect("invitation serializes");
        self.invitations
            .lock()
            .unwrap()
            .insert(id.to_string(), value);
    }

    pub fn get_record(&self, key: &str) -> Option<Record> {
        self.records.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl ConnectionRecorder for InMemoryRecorder {
    async fn get_invitation(&self, id: &str) -> DidExchangeResult<Invitation> {
        let invitations = self.invitations.lock().unwrap();
        let value = invitations.get(id).ok_or_else(|| {
            err_msg(
                DidExchangeErrorKind::NotFound,
                format!("no invitation stored under id [{id}]"),
            )
        })?;
        serde_json::from_value(value.clone()).map_err(DidExchangeError::from)
    }

    async fn get_oob_invitation(&self, id: &str) -> DidExchangeResult<OobInvitation> {
        let invitations = self.invitations.lock().unwrap();
        let value = invitations.get(id).ok_or_else(|| {
            err_msg(
                DidExchangeErrorKind::NotFound,
                format!("no invitation stored under id [{id}]"),
            )
        })?;
        serde_json::from_value(value.clone()).map_err(DidExchangeError::from)
    }

    async fn get_record_by_ns_thread_id(&self, ns_thread_id: &str) -> DidExchangeResult<Record> {
        let ns_index = self.ns_index.lock().unwrap();
        let key = ns_index.get(ns_thread_id).ok_or_else(|| {
            err_msg(
                DidExchangeErrorKind::NotFound,
                format!("no connection record indexed under [{ns_thread_id}]"),
            )
        })?;
        self.get_record(key).ok_or_else(|| {
            err_msg(
                DidExchangeErrorKind::StorageError,
                format!("connection record [{key}] vanished"),
            )
        })
    }

    async fn save_record(&self, record: &Record) -> DidExchangeResult<()> {
        let key = if record.connection_id.is_empty() {
            record.thread_id.clone()
        } else {
            record.connection_id.clone()
        };
        if !record.thread_id.is_empty() {
            let ns_key = create_namespace_key(MY_NS_PREFIX, &record.thread_id)?;
            self.ns_index.lock().unwrap().insert(ns_key, key.clone());
        }
        self.records.lock().unwrap().insert(key, record.clone());
        Ok(())
    }

    async fn save_did_from_doc(&self, did_doc: &AriesDidDoc) -> DidExchangeResult<()> {
        self.saved_dids.lock().unwrap().push(did_doc.id.clone());
        Ok(())
    }
}

/// One agent's worth of in-memory collaborators.
pub struct TestAgent {
    pub kms: Arc<LocalKms>,
    pub vdr: Arc<InMemoryVdr>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub mediator: Arc<StubMediator>,
    pub recorder: Arc<InMemoryRecorder>,
}

impl Default for TestAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAgent {
    pub fn new() -> Self {
        init_test_logging();
        Self {
            kms: Arc::new(LocalKms::default()),
            vdr: Arc::new(InMemoryVdr::default()),
            dispatcher: Arc::new(RecordingDispatcher::default()),
            mediator: Arc::new(StubMediator::default()),
            recorder: Arc::new(InMemoryRecorder::default()),
        }
    }

    pub fn context(&self) -> Context {
        self.build_context(false)
    }

    pub fn interop_context(&self) -> Context {
        self.build_context(true)
    }

    fn build_context(&self, aca_py_interop: bool) -> Context {
        Context {
            kms: self.kms.clone(),
            crypto: self.kms.clone(),
            vdr_registry: self.vdr.clone(),
            outbound_dispatcher: self.dispatcher.clone(),
            route_service: self.mediator.clone(),
            connection_recorder: self.recorder.clone(),
            aca_py_interop,
        }
    }

    /// Creates an invitation key, stores a legacy invitation under `id` and
    /// returns the `did:key` of its recipient key.
    pub async fn new_invitation(&self, id: &str) -> String {
        let (_kid, pub_key_bytes) = self
            .kms
            .create_and_export_pub_key_bytes(KeyType::Ed25519)
            .await
            .expect("key creation");
        let did_key = did_key_from_pub_key(&pub_key_bytes);

        let invitation = Invitation {
            msg_type: INVITATION_MSG_TYPE.to_string(),
            id: id.to_string(),
            label: "test-inviter".to_string(),
            recipient_keys: vec![did_key.clone()],
            service_endpoint: "http://inviter.example.com".to_string(),
            ..Invitation::default()
        };
        self.recorder.save_invitation(id, &invitation);

        did_key
    }

    /// Signs raw bytes with the recipient key of a stored invitation.
    pub async fn raw_sign(&self, invitation_id: &str, message: &[u8]) -> Vec<u8> {
        let invitation = self
            .recorder
            .get_invitation(invitation_id)
            .await
            .expect("invitation exists");
        let pub_key_bytes =
            pub_key_from_did_key(&invitation.recipient_keys[0]).expect("valid did:key");
        let kid = deterministic_kid(&pub_key_bytes, KeyType::Ed25519).expect("kid");
        let key_handle = self.kms.get(&kid).await.expect("key handle");
        self.kms
            .sign(message, &key_handle)
            .await
            .expect("signing works")
    }
}

pub fn test_context() -> Context {
    TestAgent::new().context()
}
