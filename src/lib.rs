//! Funnel agent: rule-based lead qualification for sales conversations.

pub mod analysis;
pub mod api;
pub mod channels;
pub mod config;
pub mod crm;
pub mod error;
pub mod llm;
pub mod store;
