//! WhatsApp messaging provider usage: the client port and the
//! duplicate-delivery guard built on its history API.

pub mod client;
pub mod dedup;
