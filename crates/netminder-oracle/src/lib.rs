//! # netminder-oracle
//!
//! Natural-language oracle for the netminder assistant.
//!
//! The assistant treats classification and text generation as a black
//! box behind the [`Oracle`] trait. [`ModelClient`] implements it over a
//! hosted model API with a JSON response envelope; [`ScriptedOracle`]
//! replays canned answers for tests.

mod client;
mod envelope;
mod oracle;
mod types;

pub use client::ModelClient;
pub use envelope::{extract_field, extract_field_or_raw, trim_history, HISTORY_CHAR_LIMIT};
pub use oracle::{Oracle, ScriptedOracle, ScriptedReply};
pub use types::{ApiContent, ApiMessage, ApiRequest, ApiResponse, Model};
