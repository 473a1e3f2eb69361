pub mod error;
mod mapping_diddoc;
mod mapping_messages;
mod mapping_others;
mod mapping_public_key;
