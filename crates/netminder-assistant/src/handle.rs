//! Shared assistant handle
//!
//! The assistant's maps are mutated under a single lock: every public
//! operation acquires it for the full call, so no two inbound messages
//! interleave their updates and reads observe state only between
//! messages.

use netminder_core::{ContactAddress, GameId, Result, TeamId};
use netminder_oracle::Oracle;
use netminder_roster::RosterProvider;
use netminder_transport::Transport;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::assistant::{Assistant, SearchStart};
use crate::report::TeamSearchReport;
use crate::store::StateStore;

/// Cloneable handle serializing all access to one [`Assistant`]
pub struct SharedAssistant<R, O, T, S> {
    inner: Arc<Mutex<Assistant<R, O, T, S>>>,
}

impl<R, O, T, S> Clone for SharedAssistant<R, O, T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R, O, T, S> SharedAssistant<R, O, T, S>
where
    R: RosterProvider,
    O: Oracle,
    T: Transport,
    S: StateStore,
{
    pub fn new(assistant: Assistant<R, O, T, S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(assistant)),
        }
    }

    /// Process one inbound message start-to-finish
    pub async fn receive(&self, raw_address: &str, text: &str) -> Result<()> {
        self.inner.lock().await.receive(raw_address, text).await
    }

    /// Start a goalie search for a game
    pub async fn initiate_search(&self, team_id: TeamId, game_id: GameId) -> Result<SearchStart> {
        self.inner.lock().await.initiate_search(team_id, game_id).await
    }

    /// Render search progress for a team
    pub async fn describe_searches(&self, team_id: TeamId) -> Result<TeamSearchReport> {
        self.inner.lock().await.describe_searches(team_id).await
    }

    /// Whether a conversation exists for this contact
    pub async fn has_conversation(&self, contact: &ContactAddress) -> bool {
        self.inner.lock().await.conversation(contact).is_some()
    }
}
