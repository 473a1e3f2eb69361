//! Messages of the did-exchange protocol, flat structs carrying their
//! `@type` and `@id` the way v1 agents put them on the wire.

pub mod ack;
pub mod complete;
pub mod connection;
pub mod invitation;
pub mod oob_invitation;
pub mod request;
pub mod response;

pub use ack::Ack;
pub use complete::Complete;
pub use connection::{Connection, ConnectionSignature};
pub use invitation::Invitation;
pub use oob_invitation::{OobInvitation, OobTarget};
pub use request::Request;
pub use response::Response;
