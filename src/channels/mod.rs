//! Messaging channels for inbound webhooks and outbound replies.

pub mod whatsapp;

pub use whatsapp::{SendOutcome, WebhookEvent, ZapiClient, extract_event};
