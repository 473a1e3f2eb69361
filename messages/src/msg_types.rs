//! Message type URIs observed on the wire (PIURI + message name).

pub const DID_EXCHANGE_SPEC_V1: &str = "https://didcomm.org/didexchange/1.0/";

pub const INVITATION_MSG_TYPE: &str = "https://didcomm.org/didexchange/1.0/invitation";
pub const REQUEST_MSG_TYPE: &str = "https://didcomm.org/didexchange/1.0/request";
pub const RESPONSE_MSG_TYPE: &str = "https://didcomm.org/didexchange/1.0/response";
pub const ACK_MSG_TYPE: &str = "https://didcomm.org/didexchange/1.0/ack";
pub const COMPLETE_MSG_TYPE: &str = "https://didcomm.org/didexchange/1.0/complete";

pub const OOB_INVITATION_MSG_TYPE: &str = "https://didcomm.org/out-of-band/1.0/invitation";

pub const CONNECTION_SIGNATURE_TYPE: &str =
    "https://didcomm.org/signature/1.0/ed25519Sha512_single";

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_protocol_message_types_share_piuri() {
        for msg_type in [
            INVITATION_MSG_TYPE,
            REQUEST_MSG_TYPE,
            RESPONSE_MSG_TYPE,
            ACK_MSG_TYPE,
            COMPLETE_MSG_TYPE,
        ] {
            assert!(msg_type.starts_with(DID_EXCHANGE_SPEC_V1));
        }
    }
}
