//! Search-progress projection rendered to captains

use chrono::{DateTime, Utc};
use netminder_core::{CandidateStatus, ChatMessage, ContactAddress, GameId, TeamId};
use serde::Serialize;

/// Every search for one team, with per-candidate progress
#[derive(Debug, Clone, Serialize)]
pub struct TeamSearchReport {
    pub team_name: String,
    pub team_id: TeamId,
    pub searches: Vec<SearchReport>,
}

/// One search's progress
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub game_id: GameId,
    pub scheduled_at: DateTime<Utc>,
    pub candidates: Vec<CandidateReport>,
}

/// One candidate's status and transcript (priming entry excluded)
#[derive(Debug, Clone, Serialize)]
pub struct CandidateReport {
    pub name: String,
    pub contact: ContactAddress,
    pub status: CandidateStatus,
    pub messages: Vec<ChatMessage>,
}
