//! In-memory roster backed by a JSON fixture
//!
//! Stands in for the relational store: the CLI loads one from a JSON
//! file, and tests build one directly. Recorded replies are kept in
//! memory and inspectable.

use async_trait::async_trait;
use chrono::Utc;
use netminder_core::{
    ContactAddress, Decision, GameId, NetminderError, PersonReference, Result, TeamId,
    ANON_SUB_USER_ID,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::provider::{Game, RosterProvider, Team};

/// One team with its people, as stored in a fixture file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamEntry {
    pub team: Team,
    #[serde(default)]
    pub captains: Vec<PersonReference>,
    #[serde(default)]
    pub goalies: Vec<PersonReference>,
    #[serde(default)]
    pub players: Vec<PersonReference>,
}

/// Fixture file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterFixture {
    #[serde(default)]
    pub teams: Vec<TeamEntry>,
    #[serde(default)]
    pub games: Vec<Game>,
}

/// An official game reply recorded through the fixture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRecord {
    pub game_id: GameId,
    pub team_id: TeamId,
    pub user_id: netminder_core::UserId,
    pub decision: Decision,
    pub note: String,
}

/// In-memory `RosterProvider` implementation
#[derive(Clone)]
pub struct FixtureRoster {
    fixture: Arc<RosterFixture>,
    replies: Arc<Mutex<Vec<ReplyRecord>>>,
}

impl FixtureRoster {
    pub fn new(fixture: RosterFixture) -> Self {
        Self {
            fixture: Arc::new(fixture),
            replies: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Load a fixture from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let fixture: RosterFixture = serde_json::from_str(&content)?;
        debug!(
            "Loaded roster fixture: {} teams, {} games",
            fixture.teams.len(),
            fixture.games.len()
        );
        Ok(Self::new(fixture))
    }

    /// All replies recorded so far (newest last)
    pub fn recorded_replies(&self) -> Vec<ReplyRecord> {
        self.replies.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn entry(&self, team_id: TeamId) -> Result<&TeamEntry> {
        self.fixture
            .teams
            .iter()
            .find(|e| e.team.id == team_id)
            .ok_or(NetminderError::TeamNotFound(team_id))
    }
}

/// Builder-style construction for tests and small setups
#[derive(Debug, Default)]
pub struct FixtureBuilder {
    fixture: RosterFixture,
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn team(
        mut self,
        team: Team,
        captains: Vec<PersonReference>,
        goalies: Vec<PersonReference>,
    ) -> Self {
        self.fixture.teams.push(TeamEntry {
            team,
            captains,
            goalies,
            players: Vec::new(),
        });
        self
    }

    pub fn game(mut self, game: Game) -> Self {
        self.fixture.games.push(game);
        self
    }

    pub fn build(self) -> FixtureRoster {
        FixtureRoster::new(self.fixture)
    }
}

#[async_trait]
impl RosterProvider for FixtureRoster {
    async fn team_by_id(&self, team_id: TeamId) -> Result<Team> {
        Ok(self.entry(team_id)?.team.clone())
    }

    async fn game_by_id(&self, game_id: GameId) -> Result<Game> {
        self.fixture
            .games
            .iter()
            .find(|g| g.id == game_id)
            .cloned()
            .ok_or(NetminderError::GameNotFound(game_id))
    }

    async fn substitute_pool(&self, team_id: TeamId) -> Result<Vec<PersonReference>> {
        Ok(self.entry(team_id)?.goalies.clone())
    }

    async fn captains(&self, team_id: TeamId) -> Result<Vec<PersonReference>> {
        Ok(self.entry(team_id)?.captains.clone())
    }

    async fn team_for_captain(&self, person: &PersonReference) -> Result<Option<TeamId>> {
        for entry in &self.fixture.teams {
            if entry.captains.iter().any(|c| c.contact == person.contact) {
                return Ok(Some(entry.team.id));
            }
        }
        Ok(None)
    }

    async fn next_game_without_goalie(&self, team_id: TeamId) -> Result<Option<Game>> {
        let now = Utc::now();
        let replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());

        let mut upcoming: Vec<&Game> = self
            .fixture
            .games
            .iter()
            .filter(|g| g.team_id == team_id && !g.completed && g.scheduled_at > now)
            .collect();
        upcoming.sort_by_key(|g| g.scheduled_at);

        for game in upcoming {
            let confirmed = replies
                .iter()
                .any(|r| r.game_id == game.id && r.decision == Decision::Yes);
            if !confirmed {
                return Ok(Some(game.clone()));
            }
        }

        Ok(None)
    }

    async fn record_response(
        &self,
        game_id: GameId,
        team_id: TeamId,
        person: &PersonReference,
        decision: Decision,
    ) -> Result<()> {
        let user_id = person.user_id.unwrap_or(ANON_SUB_USER_ID);
        debug!(
            "Recording game reply: game {} team {} user {} -> {}",
            game_id, team_id, user_id, decision
        );

        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ReplyRecord {
                game_id,
                team_id,
                user_id,
                decision,
                note: "set by the assistant captain".to_string(),
            });
        Ok(())
    }

    async fn resolve_person_by_contact(
        &self,
        contact: &ContactAddress,
    ) -> Result<Option<PersonReference>> {
        for entry in &self.fixture.teams {
            for person in entry
                .captains
                .iter()
                .chain(entry.goalies.iter())
                .chain(entry.players.iter())
            {
                if &person.contact == contact {
                    return Ok(Some(person.clone()));
                }
            }
        }
        Ok(None)
    }
}
