//! Roster data-provider abstraction
//!
//! The assistant never talks to the relational store directly; everything
//! it needs about teams, games, and people comes through this trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use netminder_core::{ContactAddress, Decision, GameId, PersonReference, Result, TeamId};
use serde::{Deserialize, Serialize};

/// A team as the assistant sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
}

/// A scheduled game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub team_id: TeamId,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub completed: bool,
}

/// Read/write access to roster data (teams, games, people, game replies)
#[async_trait]
pub trait RosterProvider: Send + Sync {
    /// Look up a team by id
    async fn team_by_id(&self, team_id: TeamId) -> Result<Team>;

    /// Look up a game by id
    async fn game_by_id(&self, game_id: GameId) -> Result<Game>;

    /// The team's substitute-goalie pool, in contact order
    async fn substitute_pool(&self, team_id: TeamId) -> Result<Vec<PersonReference>>;

    /// The team's captains
    async fn captains(&self, team_id: TeamId) -> Result<Vec<PersonReference>>;

    /// The team a captain belongs to, if the person captains one
    async fn team_for_captain(&self, person: &PersonReference) -> Result<Option<TeamId>>;

    /// The team's next upcoming game with no confirmed goalie
    async fn next_game_without_goalie(&self, team_id: TeamId) -> Result<Option<Game>>;

    /// Record an official yes/no reply for a person and game
    async fn record_response(
        &self,
        game_id: GameId,
        team_id: TeamId,
        person: &PersonReference,
        decision: Decision,
    ) -> Result<()>;

    /// Resolve a contact address to a known participant, if any
    async fn resolve_person_by_contact(
        &self,
        contact: &ContactAddress,
    ) -> Result<Option<PersonReference>>;
}
