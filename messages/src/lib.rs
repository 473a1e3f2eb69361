pub mod a2a;
pub mod decorators;
pub mod msg_types;
pub mod protocols;
