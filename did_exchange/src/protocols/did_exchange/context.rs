use std::sync::Arc;

use diddoc::aries::diddoc::AriesDidDoc;
use diddoc::aries::service::{AriesService, SERVICE_TYPE_DID_COMM};
use log::debug;
use messages::decorators::thread::Thread;
use messages::msg_types::{
    ACK_MSG_TYPE, OOB_INVITATION_MSG_TYPE, REQUEST_MSG_TYPE, RESPONSE_MSG_TYPE,
};
use messages::protocols::did_exchange::ack::ACK_STATUS_OK;
use messages::protocols::did_exchange::{
    Ack, Connection, Invitation, OobInvitation, OobTarget, Request, Response,
};
use uuid::Uuid;

use crate::common::destination::{create_destination, recipient_key, Destination};
use crate::common::did::{did_method, is_did};
use crate::common::keys::create_new_key_and_verification_method;
use crate::errors::error::prelude::*;
use crate::plugins::crypto::Crypto;
use crate::plugins::dispatcher::OutboundDispatcher;
use crate::plugins::kms::{KeyManager, KeyType};
use crate::plugins::mediator::MediatorService;
use crate::plugins::vdr::{DidCreateOpts, VdrRegistry};
use crate::protocols::did_exchange::signature::verify_signature;
use crate::protocols::did_exchange::states::{OutboundAction, StateMachineMsg};
use crate::storage::record::Record;
use crate::storage::recorder::{create_namespace_key, ConnectionRecorder, MY_NS_PREFIX};

/// DID method used for pairwise DIDs created on the fly.
pub const DID_METHOD: &str = "peer";

/// Per-connection caller options.
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Reuse this already-published DID instead of creating a fresh pairwise
    /// one.
    pub public_did: Option<String>,
    /// Label to present to the remote party.
    pub label: Option<String>,
    /// Router connections whose mediators must be wired into the new DID
    /// document and notified of its recipient keys.
    pub router_connections: Vec<String>,
}

/// Bundle of collaborators the state handlers run against. All collaborators
/// are shared and must be safe for concurrent use.
#[derive(Clone)]
pub struct Context {
    pub kms: Arc<dyn KeyManager>,
    pub crypto: Arc<dyn Crypto>,
    pub vdr_registry: Arc<dyn VdrRegistry>,
    pub outbound_dispatcher: Arc<dyn OutboundDispatcher>,
    pub route_service: Arc<dyn MediatorService>,
    pub connection_recorder: Arc<dyn ConnectionRecorder>,
    /// Enables the signed-attachment response path spoken by ACA-Py peers.
    pub aca_py_interop: bool,
}

impl Context {
    pub(crate) async fn handle_inbound_oob_invitation(
        &self,
        msg: &StateMachineMsg,
        thid: &str,
        options: &Options,
    ) -> DidExchangeResult<(OutboundAction, Record)> {
        let (my_did_doc, conn) = self
            .get_did_doc_and_connection(options.public_did.as_deref(), &options.router_connections)
            .await
            .map_err(|err| err.extend("failed to get diddoc and connection"))?;

        let mut conn_record = msg.conn_record.clone().ok_or_else(|| {
            err_msg(
                DidExchangeErrorKind::InvalidState,
                "oob invitation has no connection record attached",
            )
        })?;
        conn_record.my_did = my_did_doc.id.clone();
        conn_record.thread_id = thid.to_string();

        let oob_invitation: OobInvitation = msg
            .decode()
            .map_err(|err| err.extend("failed to decode oob invitation"))?;

        let request = Request {
            msg_type: REQUEST_MSG_TYPE.to_string(),
            id: thid.to_string(),
            label: oob_invitation.my_label.clone(),
            connection: Some(conn),
            thread: Some(Thread {
                thid: Some(thid.to_string()),
                pthid: non_empty(&conn_record.parent_thread_id),
            }),
            ..Request::default()
        };

        let service = self
            .get_service_block(&oob_invitation)
            .await
            .map_err(|err| err.extend("failed to get service block"))?;

        let destination = Destination {
            recipient_keys: service.recipient_keys,
            service_endpoint: service.service_endpoint,
            routing_keys: service.routing_keys,
            media_type_profiles: service.accept,
        };

        let sender_verkey = recipient_key(&my_did_doc)
            .map_err(|err| err.extend("handle inbound oob invitation"))?;

        debug!("dispatching outbound request on thread: {:?}", request.thread);

        Ok((
            OutboundAction::Send {
                message: request.into(),
                sender_verkey,
                destination,
            },
            conn_record,
        ))
    }

    pub(crate) async fn handle_inbound_invitation(
        &self,
        invitation: &Invitation,
        thid: &str,
        options: &Options,
        mut conn_record: Record,
    ) -> DidExchangeResult<(OutboundAction, Record)> {
        // destination the request will be sent to
        let destination = self.get_destination(invitation).await?;

        // did document that will be used in the exchange request
        let (did_doc, conn) = self
            .get_did_doc_and_connection(options.public_did.as_deref(), &options.router_connections)
            .await?;

        let pid = if conn_record.implicit {
            invitation.did.clone()
        } else {
            invitation.id.clone()
        };

        let request = Request {
            msg_type: REQUEST_MSG_TYPE.to_string(),
            id: thid.to_string(),
            label: options.label.clone().unwrap_or_default(),
            connection: Some(conn),
            thread: Some(Thread {
                thid: None,
                pthid: non_empty(&pid),
            }),
            ..Request::default()
        };
        conn_record.my_did = request
            .connection
            .as_ref()
            .map(|conn| conn.did.clone())
            .unwrap_or_default();

        let sender_verkey =
            recipient_key(&did_doc).map_err(|err| err.extend("handle inbound invitation"))?;

        Ok((
            OutboundAction::Send {
                message: request.into(),
                sender_verkey,
                destination,
            },
            conn_record,
        ))
    }

    pub(crate) async fn handle_inbound_request(
        &self,
        request: &Request,
        options: &Options,
        mut conn_record: Record,
    ) -> DidExchangeResult<(OutboundAction, Record)> {
        debug!("handling request: {:?}", request);

        let request_connection = get_request_connection(request)
            .map_err(|err| err.extend("extracting connection data from request"))?;

        let request_did_doc = self
            .resolve_did_doc_from_connection(&request_connection)
            .await
            .map_err(|err| err.extend("resolve did doc from exchange request connection"))?;

        // did document that will be used in the exchange response
        let (mut response_did_doc, response_connection) = self
            .get_did_doc_and_connection(options.public_did.as_deref(), &options.router_connections)
            .await
            .map_err(|err| err.extend("get response did doc and connection"))?;

        let sender_verkey = recipient_key(&response_did_doc)
            .map_err(|err| err.extend("handle inbound request"))?;

        if self.aca_py_interop {
            response_did_doc = super::interop::convert_peer_to_sov(response_did_doc)
                .map_err(|err| err.extend("converting my did doc to a 'sov' doc for response message"))?;
        }

        let response = self
            .prepare_response(request, &response_did_doc, &response_connection)
            .await
            .map_err(|err| err.extend("preparing response"))?;

        conn_record.their_did = request_connection.did.clone();
        conn_record.my_did = response_connection.did.clone();
        conn_record.their_label = request.label.clone();

        let destination = create_destination(&request_did_doc)?;
        if !destination.media_type_profiles.is_empty() {
            conn_record.media_type_profiles = destination.media_type_profiles.clone();
        }

        Ok((
            OutboundAction::Send {
                message: response.into(),
                sender_verkey,
                destination,
            },
            conn_record,
        ))
    }

    async fn prepare_response(
        &self,
        request: &Request,
        response_did_doc: &AriesDidDoc,
        response_connection: &Connection,
    ) -> DidExchangeResult<Response> {
        let response = Response {
            msg_type: RESPONSE_MSG_TYPE.to_string(),
            id: Uuid::new_v4().to_string(),
            thread: Thread {
                thid: Some(request.id.clone()),
                pthid: request.thread.as_ref().and_then(|thread| thread.pthid.clone()),
            },
            ..Response::default()
        };

        if self.aca_py_interop {
            return self
                .prepare_response_with_signed_attachment(request, response, response_did_doc)
                .await;
        }

        let invitation_id = request
            .thread
            .as_ref()
            .and_then(|thread| thread.pthid.clone())
            .unwrap_or_default();

        let connection_signature = self
            .prepare_connection_signature(response_connection, &invitation_id)
            .await
            .map_err(|err| err.extend("connection signature"))?;

        let mut response = response;
        response.connection_signature = Some(connection_signature);

        Ok(response)
    }

    pub(crate) async fn handle_inbound_response(
        &self,
        response: &Response,
    ) -> DidExchangeResult<(OutboundAction, Record)> {
        let ack = Ack {
            msg_type: ACK_MSG_TYPE.to_string(),
            id: Uuid::new_v4().to_string(),
            status: ACK_STATUS_OK.to_string(),
            thread: Some(Thread {
                thid: response.thread.thid.clone(),
                pthid: None,
            }),
        };

        let thread_id = response.thread.thid.clone().unwrap_or_default();
        let ns_thread_id = create_namespace_key(MY_NS_PREFIX, &thread_id)?;

        let mut conn_record = self
            .connection_recorder
            .get_record_by_ns_thread_id(&ns_thread_id)
            .await
            .map_err(|err| err.extend("get connection record"))?;

        let connection_signature = response.connection_signature.as_ref().ok_or_else(|| {
            err_msg(
                DidExchangeErrorKind::InvalidJson,
                "response is missing connection signature",
            )
        })?;

        // the signature must verify against the invitation's recipient key
        // for continuity, never against the key the response declares
        let invitation_key = conn_record.recipient_keys.first().ok_or_else(|| {
            err_msg(
                DidExchangeErrorKind::InvalidVerkey,
                "connection record has no invitation recipient key",
            )
        })?;

        let conn = verify_signature(connection_signature, invitation_key)?;

        conn_record.their_did = conn.did.clone();

        let response_did_doc = self
            .resolve_did_doc_from_connection(&conn)
            .await
            .map_err(|err| err.extend("resolve did doc from exchange response connection"))?;

        let destination = create_destination(&response_did_doc)
            .map_err(|err| err.extend("prepare destination from response did doc"))?;

        let resolution = self
            .vdr_registry
            .resolve(&conn_record.my_did)
            .await
            .map_err(|err| err.extend("fetching did document"))?;

        let sender_verkey = recipient_key(&resolution.did_document)
            .map_err(|err| err.extend("handle inbound response"))?;

        Ok((
            OutboundAction::Send {
                message: ack.into(),
                sender_verkey,
                destination,
            },
            conn_record,
        ))
    }

    pub(crate) async fn get_destination(
        &self,
        invitation: &Invitation,
    ) -> DidExchangeResult<Destination> {
        if !invitation.did.is_empty() {
            let resolution = self
                .vdr_registry
                .resolve(&invitation.did)
                .await
                .map_err(|err| err.extend("failed to resolve invitation DID"))?;
            return create_destination(&resolution.did_document);
        }

        Ok(Destination {
            recipient_keys: invitation.recipient_keys.clone(),
            service_endpoint: invitation.service_endpoint.clone(),
            routing_keys: invitation.routing_keys.clone(),
            media_type_profiles: Vec::new(),
        })
    }

    pub(crate) async fn get_did_doc_and_connection(
        &self,
        public_did: Option<&str>,
        router_connections: &[String],
    ) -> DidExchangeResult<(AriesDidDoc, Connection)> {
        if let Some(public_did) = public_did.filter(|did| !did.is_empty()) {
            debug!("using public did [{}] for connection", public_did);

            let resolution = self
                .vdr_registry
                .resolve(public_did)
                .await
                .map_err(|err| err.extend(format!("resolve public did [{public_did}]")))?;

            self.connection_recorder
                .save_did_from_doc(&resolution.did_document)
                .await?;

            let connection = Connection {
                did: resolution.did_document.id.clone(),
                did_doc: None,
            };
            return Ok((resolution.did_document, connection));
        }

        debug!("creating new '{}' did for connection", DID_METHOD);

        let mut services = Vec::new();
        for conn_id in router_connections {
            // empty default endpoint: the registry fills one in on create
            let (service_endpoint, routing_keys) = self
                .route_service
                .get_router_config(conn_id, "")
                .await
                .map_err(|err| err.extend("did doc - fetch router config"))?;

            services.push(
                AriesService::create()
                    .set_service_endpoint(service_endpoint)
                    .set_routing_keys(routing_keys),
            );
        }
        if services.is_empty() {
            services.push(AriesService::create());
        }

        let mut new_did_doc = AriesDidDoc {
            service: services,
            ..AriesDidDoc::default()
        };
        create_new_key_and_verification_method(&mut new_did_doc, KeyType::Ed25519, self.kms.as_ref())
            .await
            .map_err(|err| err.extend("failed to create and export public key"))?;

        let resolution = self
            .vdr_registry
            .create(DID_METHOD, &new_did_doc, DidCreateOpts::default())
            .await
            .map_err(|err| err.extend(format!("create {DID_METHOD} did")))?;
        let did_doc = resolution.did_document;

        if !router_connections.is_empty() {
            if let Some(service) = did_doc.resolve_service(SERVICE_TYPE_DID_COMM) {
                for recipient_key in &service.recipient_keys {
                    for conn_id in router_connections {
                        self.route_service
                            .add_key_to_router(conn_id, recipient_key)
                            .await
                            .map_err(|err| err.extend("did doc - add key to the router"))?;
                    }
                }
            }
        }

        self.connection_recorder.save_did_from_doc(&did_doc).await?;

        let connection = Connection {
            did: did_doc.id.clone(),
            did_doc: Some(did_doc.clone()),
        };

        Ok((did_doc, connection))
    }

    pub(crate) async fn resolve_did_doc_from_connection(
        &self,
        conn: &Connection,
    ) -> DidExchangeResult<AriesDidDoc> {
        let Some(did_doc) = &conn.did_doc else {
            // did content was not provided; resolve
            let resolution = self.vdr_registry.resolve(&conn.did).await?;
            return Ok(resolution.did_document);
        };

        let method = did_method(&did_doc.id)
            .map_err(|err| err.extend(format!("failed to parse DID [{}]", did_doc.id)))?;

        // peers publishing `sov` documents expect them stored as peer docs
        let method = if method == "sov" { DID_METHOD } else { method };

        self.vdr_registry
            .create(method, did_doc, DidCreateOpts { store: true })
            .await
            .map_err(|err| err.extend("failed to store provided did document"))?;

        Ok(did_doc.clone())
    }

    /// Recovers the `did:key` of the invitation recipient key for the given
    /// invitation id, consulting the out-of-band store first, then the
    /// legacy invitation store, treating the id itself as a DID last.
    pub(crate) async fn get_ver_key(&self, invitation_id: &str) -> DidExchangeResult<String> {
        match self.get_ver_key_from_oob_invitation(invitation_id).await {
            Ok(ver_key) => return Ok(ver_key),
            Err(err) if err.kind() != DidExchangeErrorKind::NotFound => {
                return Err(err.extend("failed to get my verkey from oob invitation"));
            }
            Err(_) => {}
        }

        let invitation = if is_did(invitation_id) {
            Invitation {
                id: invitation_id.to_string(),
                did: invitation_id.to_string(),
                ..Invitation::default()
            }
        } else {
            self.connection_recorder
                .get_invitation(invitation_id)
                .await
                .map_err(|err| {
                    err.extend(format!(
                        "get invitation for signature [invitation_id={invitation_id}]"
                    ))
                })?
        };

        self.get_invitation_recipient_key(&invitation)
            .await
            .map_err(|err| err.extend("get invitation recipient key"))
    }

    async fn get_invitation_recipient_key(
        &self,
        invitation: &Invitation,
    ) -> DidExchangeResult<String> {
        if !invitation.did.is_empty() {
            let resolution = self.vdr_registry.resolve(&invitation.did).await?;
            return recipient_key(&resolution.did_document);
        }

        invitation.recipient_keys.first().cloned().ok_or_else(|| {
            err_msg(
                DidExchangeErrorKind::InvalidVerkey,
                "invitation has no recipient keys",
            )
        })
    }

    async fn get_ver_key_from_oob_invitation(
        &self,
        invitation_id: &str,
    ) -> DidExchangeResult<String> {
        debug!("looking up oob invitation [{}]", invitation_id);

        let invitation = match self.connection_recorder.get_oob_invitation(invitation_id).await {
            Err(err) if err.kind() == DidExchangeErrorKind::NotFound => {
                return Err(err_msg(DidExchangeErrorKind::NotFound, "verkey not found"));
            }
            Err(err) => return Err(err.extend("failed to load oob invitation")),
            Ok(invitation) => invitation,
        };

        if invitation.msg_type != OOB_INVITATION_MSG_TYPE {
            return Err(err_msg(DidExchangeErrorKind::NotFound, "verkey not found"));
        }

        let service = self
            .get_service_block(&invitation)
            .await
            .map_err(|err| err.extend("failed to get my verkey"))?;

        service.recipient_keys.first().cloned().ok_or_else(|| {
            err_msg(
                DidExchangeErrorKind::InvalidVerkey,
                "oob invitation service has no recipient keys",
            )
        })
    }

    /// Resolves the polymorphic out-of-band target into a service block.
    /// Media type profiles on the invitation take precedence over the
    /// `accept` property of the resolved service.
    pub(crate) async fn get_service_block(
        &self,
        invitation: &OobInvitation,
    ) -> DidExchangeResult<AriesService> {
        let mut block = match &invitation.target {
            Some(OobTarget::DidRef(did)) => {
                let resolution = self
                    .vdr_registry
                    .resolve(did)
                    .await
                    .map_err(|err| err.extend(format!("failed to resolve target DID [{did}]")))?;

                resolution
                    .did_document
                    .resolve_service(SERVICE_TYPE_DID_COMM)
                    .cloned()
                    .ok_or_else(|| {
                        err_msg(
                            DidExchangeErrorKind::InvalidDid,
                            format!(
                                "no valid service block found on [{did}] with service type {SERVICE_TYPE_DID_COMM}"
                            ),
                        )
                    })?
            }
            Some(OobTarget::Service(service)) => service.clone(),
            Some(OobTarget::Raw(value)) => serde_json::from_value::<AriesService>(value.clone())
                .map_err(|err| {
                    err_msg(
                        DidExchangeErrorKind::InvalidJson,
                        format!("failed to decode service block: {err}"),
                    )
                })?,
            None => {
                return Err(err_msg(
                    DidExchangeErrorKind::InvalidInput,
                    "unsupported oob invitation target",
                ));
            }
        };

        if !invitation.media_type_profiles.is_empty() {
            // the accept property of the out-of-band message overrides the
            // one in the DID service block
            block.accept = invitation.media_type_profiles.clone();
        }

        Ok(block)
    }
}

/// Accepts both the standard connection block and the legacy did plus
/// signed-attachment form.
pub(crate) fn get_request_connection(request: &Request) -> DidExchangeResult<Connection> {
    if let Some(conn) = &request.connection {
        return Ok(conn.clone());
    }

    let attachment = request.did_doc_attach.as_ref().ok_or_else(|| {
        err_msg(
            DidExchangeErrorKind::InvalidJson,
            "missing connection data in request",
        )
    })?;

    let doc_bytes = attachment.data.fetch()?;
    let did_doc: AriesDidDoc = serde_json::from_slice(&doc_bytes)
        .map_err(|err| DidExchangeError::from(err).extend("parsing attached did doc"))?;

    Ok(Connection {
        did: request.did.clone(),
        did_doc: Some(did_doc),
    })
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod unit_tests {
    use diddoc::aries::diddoc::{VerificationMethod, VerificationMethodType};
    use messages::a2a::{A2AMessage, DidCommMsg};
    use messages::msg_types::{INVITATION_MSG_TYPE, OOB_INVITATION_MSG_TYPE};
    use messages::protocols::did_exchange::Complete;

    use super::*;
    use crate::common::keys::did_key_from_pub_key;
    use crate::protocols::did_exchange::signature::verify_signature;
    use crate::utils::test_utils::TestAgent;

    fn inline_invitation(id: &str, recipient_key: &str) -> Invitation {
        Invitation {
            msg_type: INVITATION_MSG_TYPE.to_string(),
            id: id.to_string(),
            label: "Alice".to_string(),
            recipient_keys: vec![recipient_key.to_string()],
            service_endpoint: "http://x".to_string(),
            ..Invitation::default()
        }
    }

    fn remote_doc(accept: Vec<String>) -> AriesDidDoc {
        let mut doc = AriesDidDoc::default();
        doc.set_id("did:peer:remote".to_string());
        doc.add_key_and_authentication(VerificationMethod {
            id: "#key-1".to_string(),
            type_: VerificationMethodType::Ed25519VerificationKey2018,
            controller: doc.id.clone(),
            public_key_base58: bs58::encode([5u8; 32]).into_string(),
        });
        doc.service.push(
            AriesService::create()
                .set_id("#didcomm".to_string())
                .set_service_endpoint("https://invitee.example.com/msg".to_string())
                .set_recipient_keys(vec!["#key-1".to_string()])
                .set_accept(accept),
        );
        doc
    }

    #[tokio::test]
    async fn test_handle_inbound_invitation_builds_request() {
        let agent = TestAgent::new();
        let ctx = agent.context();
        let invitation_key = agent.new_invitation("inv-1").await;

        let options = Options {
            label: Some("Bob".to_string()),
            ..Options::default()
        };

        let (action, record) = ctx
            .handle_inbound_invitation(
                &inline_invitation("inv-1", &invitation_key),
                "t-1",
                &options,
                Record::default(),
            )
            .await
            .unwrap();

        assert!(!record.my_did.is_empty());

        let OutboundAction::Send {
            message: A2AMessage::Request(request),
            sender_verkey,
            destination,
        } = action
        else {
            panic!("expected an outbound request");
        };

        assert_eq!(request.id, "t-1");
        assert_eq!(request.label, "Bob");
        assert_eq!(request.thread.unwrap().pthid.as_deref(), Some("inv-1"));
        assert_eq!(request.connection.unwrap().did, record.my_did);
        assert!(sender_verkey.starts_with("did:key:"));
        assert_eq!(destination.service_endpoint, "http://x");
        assert_eq!(destination.recipient_keys, vec![invitation_key]);
    }

    #[tokio::test]
    async fn test_implicit_invitation_uses_did_as_parent_thread() {
        let agent = TestAgent::new();
        let ctx = agent.context();
        agent.vdr.insert(remote_doc(Vec::new()));

        let invitation = Invitation {
            msg_type: INVITATION_MSG_TYPE.to_string(),
            id: "did:peer:remote".to_string(),
            did: "did:peer:remote".to_string(),
            ..Invitation::default()
        };
        let record = Record {
            implicit: true,
            ..Record::default()
        };

        let (action, _record) = ctx
            .handle_inbound_invitation(&invitation, "t-1", &Options::default(), record)
            .await
            .unwrap();

        let OutboundAction::Send {
            message: A2AMessage::Request(request),
            ..
        } = action
        else {
            panic!("expected an outbound request");
        };
        assert_eq!(
            request.thread.unwrap().pthid.as_deref(),
            Some("did:peer:remote")
        );
    }

    #[tokio::test]
    async fn test_handle_inbound_request_prepares_signed_response() {
        let agent = TestAgent::new();
        let ctx = agent.context();
        let invitation_key = agent.new_invitation("inv-1").await;

        let doc = remote_doc(vec!["didcomm/v2".to_string()]);
        let request = Request {
            msg_type: REQUEST_MSG_TYPE.to_string(),
            id: "t-1".to_string(),
            label: "Bob".to_string(),
            connection: Some(Connection {
                did: doc.id.clone(),
                did_doc: Some(doc),
            }),
            thread: Some(Thread {
                thid: Some("t-1".to_string()),
                pthid: Some("inv-1".to_string()),
            }),
            ..Request::default()
        };

        let (action, record) = ctx
            .handle_inbound_request(&request, &Options::default(), Record::default())
            .await
            .unwrap();

        assert_eq!(record.their_did, "did:peer:remote");
        assert_eq!(record.their_label, "Bob");
        assert!(!record.my_did.is_empty());
        assert_eq!(record.media_type_profiles, vec!["didcomm/v2"]);

        let OutboundAction::Send {
            message: A2AMessage::Response(response),
            destination,
            ..
        } = action
        else {
            panic!("expected an outbound response");
        };

        assert_eq!(response.thread.thid.as_deref(), Some("t-1"));
        assert_eq!(response.thread.pthid.as_deref(), Some("inv-1"));
        assert!(response.did.is_empty());
        assert!(response.did_doc_attach.is_none());
        assert_eq!(
            destination.service_endpoint,
            "https://invitee.example.com/msg"
        );

        let connection = verify_signature(
            &response.connection_signature.unwrap(),
            &invitation_key,
        )
        .unwrap();
        assert_eq!(connection.did, record.my_did);
    }

    #[tokio::test]
    async fn test_interop_request_gets_attachment_response() {
        let agent = TestAgent::new();
        let ctx = agent.interop_context();
        agent.new_invitation("inv-1").await;

        let doc = remote_doc(Vec::new());
        let request = Request {
            msg_type: REQUEST_MSG_TYPE.to_string(),
            id: "t-1".to_string(),
            label: "Bob".to_string(),
            connection: Some(Connection {
                did: doc.id.clone(),
                did_doc: Some(doc),
            }),
            thread: Some(Thread {
                thid: Some("t-1".to_string()),
                pthid: Some("inv-1".to_string()),
            }),
            ..Request::default()
        };

        let (action, _record) = ctx
            .handle_inbound_request(&request, &Options::default(), Record::default())
            .await
            .unwrap();

        let OutboundAction::Send {
            message: A2AMessage::Response(response),
            ..
        } = action
        else {
            panic!("expected an outbound response");
        };

        assert!(response.connection_signature.is_none());
        assert!(!response.did.is_empty());
        assert!(!response.did.starts_with("did:sov:"));
        let attachment = response.did_doc_attach.unwrap();
        assert!(attachment.data.jws.is_some());
        ctx.verify_signed_attachment(&attachment).await.unwrap();
    }

    #[tokio::test]
    async fn test_resolve_did_doc_from_connection_stores_sov_as_peer() {
        let agent = TestAgent::new();
        let ctx = agent.context();

        let mut doc = AriesDidDoc::default();
        doc.set_id("did:sov:XYZ".to_string());
        let conn = Connection {
            did: doc.id.clone(),
            did_doc: Some(doc),
        };

        let resolved = ctx.resolve_did_doc_from_connection(&conn).await.unwrap();
        assert_eq!(resolved.id, "did:sov:XYZ");

        let calls = agent.vdr.create_calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "peer");
        assert!(calls[0].store);
        assert_eq!(calls[0].doc_id, "did:sov:XYZ");
    }

    #[tokio::test]
    async fn test_resolve_did_doc_without_embedded_doc_resolves() {
        let agent = TestAgent::new();
        let ctx = agent.context();
        agent.vdr.insert(remote_doc(Vec::new()));

        let conn = Connection {
            did: "did:peer:remote".to_string(),
            did_doc: None,
        };
        let resolved = ctx.resolve_did_doc_from_connection(&conn).await.unwrap();
        assert_eq!(resolved.id, "did:peer:remote");
        assert!(agent.vdr.create_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oob_media_type_profiles_take_precedence() {
        let agent = TestAgent::new();
        let ctx = agent.context();

        let service = AriesService::create()
            .set_service_endpoint("https://inviter.example.com/msg".to_string())
            .set_recipient_keys(vec![did_key_from_pub_key(&[9u8; 32])])
            .set_accept(vec!["didcomm/aip2;env=rfc19".to_string()]);

        let invitation = OobInvitation {
            msg_type: OOB_INVITATION_MSG_TYPE.to_string(),
            id: "oob-1".to_string(),
            target: Some(OobTarget::Service(service)),
            media_type_profiles: vec!["didcomm/v2".to_string()],
            ..OobInvitation::default()
        };

        let block = ctx.get_service_block(&invitation).await.unwrap();
        assert_eq!(block.accept, vec!["didcomm/v2"]);
    }

    #[tokio::test]
    async fn test_service_accept_survives_without_oob_override() {
        let agent = TestAgent::new();
        let ctx = agent.context();

        let service = AriesService::create()
            .set_recipient_keys(vec![did_key_from_pub_key(&[9u8; 32])])
            .set_accept(vec!["didcomm/aip2;env=rfc19".to_string()]);

        let invitation = OobInvitation {
            id: "oob-1".to_string(),
            target: Some(OobTarget::Service(service)),
            ..OobInvitation::default()
        };

        let block = ctx.get_service_block(&invitation).await.unwrap();
        assert_eq!(block.accept, vec!["didcomm/aip2;env=rfc19"]);
    }

    #[tokio::test]
    async fn test_service_block_from_raw_map() {
        let agent = TestAgent::new();
        let ctx = agent.context();

        let invitation = OobInvitation {
            id: "oob-1".to_string(),
            target: Some(OobTarget::Raw(serde_json::json!({
                "serviceEndpoint": "https://inviter.example.com/msg",
                "recipientKeys": ["did:key:z6MkexampleX"],
                "priority": "not-a-number"
            }))),
            ..OobInvitation::default()
        };

        let err = ctx.get_service_block(&invitation).await.unwrap_err();
        assert_eq!(err.kind(), DidExchangeErrorKind::InvalidJson);
    }

    #[tokio::test]
    async fn test_service_block_from_did_target() {
        let agent = TestAgent::new();
        let ctx = agent.context();
        agent.vdr.insert(remote_doc(Vec::new()));

        let invitation = OobInvitation {
            id: "oob-1".to_string(),
            target: Some(OobTarget::DidRef("did:peer:remote".to_string())),
            ..OobInvitation::default()
        };

        let block = ctx.get_service_block(&invitation).await.unwrap();
        assert_eq!(block.service_endpoint, "https://invitee.example.com/msg");
    }

    #[tokio::test]
    async fn test_missing_target_is_rejected() {
        let agent = TestAgent::new();
        let ctx = agent.context();

        let invitation = OobInvitation {
            id: "oob-1".to_string(),
            ..OobInvitation::default()
        };
        let err = ctx.get_service_block(&invitation).await.unwrap_err();
        assert_eq!(err.kind(), DidExchangeErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_public_did_is_reused_without_new_keys() {
        let agent = TestAgent::new();
        let ctx = agent.context();

        let mut public_doc = remote_doc(Vec::new());
        public_doc.set_id("did:peer:pub".to_string());
        agent.vdr.insert(public_doc);

        let (doc, connection) = ctx
            .get_did_doc_and_connection(Some("did:peer:pub"), &[])
            .await
            .unwrap();

        assert_eq!(doc.id, "did:peer:pub");
        assert_eq!(connection.did, "did:peer:pub");
        assert!(connection.did_doc.is_none());
        assert_eq!(agent.kms.key_count(), 0);
        assert!(agent.vdr.create_calls.lock().unwrap().is_empty());
        assert_eq!(
            agent.recorder.saved_dids.lock().unwrap().clone(),
            vec!["did:peer:pub".to_string()]
        );
    }

    #[tokio::test]
    async fn test_router_connections_are_wired_into_new_doc() {
        let agent = TestAgent::new();
        let ctx = agent.context();

        let (doc, connection) = ctx
            .get_did_doc_and_connection(None, &["router-conn-1".to_string()])
            .await
            .unwrap();

        let service = doc.resolve_service(SERVICE_TYPE_DID_COMM).unwrap();
        assert_eq!(service.service_endpoint, agent.mediator.endpoint);
        assert_eq!(service.routing_keys, agent.mediator.routing_keys);
        assert!(connection.did_doc.is_some());

        let registered = agent.mediator.registered_keys.lock().unwrap().clone();
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].0, "router-conn-1");
    }

    #[tokio::test]
    async fn test_get_ver_key_prefers_oob_store() {
        let agent = TestAgent::new();
        let ctx = agent.context();

        let recipient = did_key_from_pub_key(&[9u8; 32]);
        let oob = OobInvitation {
            msg_type: OOB_INVITATION_MSG_TYPE.to_string(),
            id: "shared-id".to_string(),
            target: Some(OobTarget::Service(
                AriesService::create().set_recipient_keys(vec![recipient.clone()]),
            )),
            ..OobInvitation::default()
        };
        agent.recorder.save_invitation("shared-id", &oob);

        assert_eq!(ctx.get_ver_key("shared-id").await.unwrap(), recipient);
    }

    #[tokio::test]
    async fn test_get_ver_key_falls_back_to_legacy_store() {
        let agent = TestAgent::new();
        let ctx = agent.context();
        let invitation_key = agent.new_invitation("inv-legacy").await;

        assert_eq!(ctx.get_ver_key("inv-legacy").await.unwrap(), invitation_key);
    }

    #[tokio::test]
    async fn test_get_ver_key_treats_did_ids_as_implicit_invitations() {
        let agent = TestAgent::new();
        let ctx = agent.context();
        agent.vdr.insert(remote_doc(Vec::new()));

        let ver_key = ctx.get_ver_key("did:peer:remote").await.unwrap();
        assert_eq!(
            ver_key,
            did_key_from_pub_key(&[5u8; 32]),
        );
    }

    #[tokio::test]
    async fn test_get_request_connection_from_attachment() {
        let doc = remote_doc(Vec::new());
        let doc_bytes = serde_json::to_vec(&doc).unwrap();

        let request = Request {
            did: "remote".to_string(),
            did_doc_attach: Some(messages::decorators::attachment::Attachment::base64_encoded(
                &doc_bytes,
            )),
            ..Request::default()
        };

        let connection = get_request_connection(&request).unwrap();
        assert_eq!(connection.did, "remote");
        assert_eq!(connection.did_doc.unwrap().id, "did:peer:remote");
    }

    #[tokio::test]
    async fn test_request_without_connection_data_is_rejected() {
        let request = Request::default();
        let err = get_request_connection(&request).unwrap_err();
        assert_eq!(err.kind(), DidExchangeErrorKind::InvalidJson);
    }

    #[tokio::test]
    async fn test_handle_inbound_oob_invitation_sets_thread_ids() {
        let agent = TestAgent::new();
        let ctx = agent.context();

        let oob = OobInvitation {
            msg_type: OOB_INVITATION_MSG_TYPE.to_string(),
            id: "oob-1".to_string(),
            my_label: "Bob".to_string(),
            target: Some(OobTarget::Service(
                AriesService::create()
                    .set_service_endpoint("https://inviter.example.com/msg".to_string())
                    .set_recipient_keys(vec![did_key_from_pub_key(&[9u8; 32])])
                    .set_accept(vec!["didcomm/v2".to_string()]),
            )),
            ..OobInvitation::default()
        };

        let msg = StateMachineMsg {
            msg: DidCommMsg::from_msg(&oob).unwrap(),
            conn_record: Some(Record {
                parent_thread_id: "oob-1".to_string(),
                ..Record::default()
            }),
            options: None,
        };

        let (action, record) = ctx
            .handle_inbound_oob_invitation(&msg, "t-9", &Options::default())
            .await
            .unwrap();

        assert_eq!(record.thread_id, "t-9");
        assert!(!record.my_did.is_empty());

        let OutboundAction::Send {
            message: A2AMessage::Request(request),
            destination,
            ..
        } = action
        else {
            panic!("expected an outbound request");
        };
        assert_eq!(request.id, "t-9");
        assert_eq!(request.label, "Bob");
        let thread = request.thread.unwrap();
        assert_eq!(thread.thid.as_deref(), Some("t-9"));
        assert_eq!(thread.pthid.as_deref(), Some("oob-1"));
        assert_eq!(destination.media_type_profiles, vec!["didcomm/v2"]);
    }

    #[tokio::test]
    async fn test_complete_decoding_is_strict() {
        // Complete bodies are still decoded so malformed payloads surface
        let msg = DidCommMsg::new(serde_json::json!({
            "@type": messages::msg_types::COMPLETE_MSG_TYPE,
            "~thread": "not-an-object"
        }));
        assert!(msg.decode::<Complete>().is_err());
    }
}
