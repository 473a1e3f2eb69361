pub mod context;
pub mod interop;
pub mod service;
pub mod signature;
pub mod states;
