//! Persistence for collaborator logs: append-only JSONL files.
//!
//! Nothing here is read back by the analysis engine.

pub mod jsonl;

pub use jsonl::JsonlLog;
