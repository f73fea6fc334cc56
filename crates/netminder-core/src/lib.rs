//! # netminder-core
//!
//! Core types for the netminder substitute-goalie coordinator.
//!
//! Netminder keeps track of which games still need a goalie, runs text
//! conversations with candidate substitutes one at a time, and reports
//! the outcome to team captains. This crate holds the value types, the
//! unified error type, configuration, and the time formatting shared by
//! the collaborator crates and the assistant core.

mod config;
mod error;
pub mod timefmt;
mod types;

pub use config::{AssistantConfig, ModelConfig, SmsConfig};
pub use error::{NetminderError, Result};
pub use types::*;
