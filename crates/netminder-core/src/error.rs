//! Unified error types for netminder

use thiserror::Error;

use crate::types::{ContactAddress, GameId, TeamId};

/// Unified error type for all netminder operations
#[derive(Error, Debug)]
pub enum NetminderError {
    // Roster/data errors
    #[error("Team not found: {0}")]
    TeamNotFound(TeamId),

    #[error("Game not found: {0}")]
    GameNotFound(GameId),

    #[error("No registered participant for contact {0}")]
    UnknownContact(ContactAddress),

    // Search errors
    #[error("A search is already running for team {team_id} (game {game_id}); one search per team at a time")]
    ConflictingSearch { team_id: TeamId, game_id: GameId },

    // Oracle errors
    #[error("Could not classify message: {0}")]
    Classification(String),

    #[error("Oracle error: {0}")]
    Oracle(String),

    // Collaborator errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("State store error: {0}")]
    Store(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

/// Result type alias using NetminderError
pub type Result<T> = std::result::Result<T, NetminderError>;
