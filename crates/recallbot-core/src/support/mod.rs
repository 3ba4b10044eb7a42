//! WhatsApp customer-support bot.

pub mod handler;
