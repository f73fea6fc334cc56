//! Goalie-search state machine
//!
//! Tracks one effort to find a substitute goalie for one game. Candidate
//! order is fixed at creation and drives outreach sequencing; the status
//! map is keyed by canonical contact address. All transitions are pure;
//! roster side effects happen at the assistant boundary.

use chrono::{DateTime, Utc};
use netminder_core::{
    CandidateStatus, ContactAddress, GameId, PersonReference, SearchState, TeamId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// State of one substitute-goalie search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalieSearch {
    pub team_id: TeamId,
    pub game_id: GameId,
    pub scheduled_at: DateTime<Utc>,
    /// Candidates in contact order; never reordered
    candidates: Vec<PersonReference>,
    /// Candidate status, keyed by canonical contact
    status: HashMap<ContactAddress, CandidateStatus>,
    /// Captains to notify as the search progresses
    pub captains: Vec<PersonReference>,
    state: SearchState,
}

impl GoalieSearch {
    /// Build a search over the given candidate pool. An empty pool is
    /// immediately resolved with no goalie available.
    pub fn new(
        team_id: TeamId,
        game_id: GameId,
        scheduled_at: DateTime<Utc>,
        candidates: Vec<PersonReference>,
        captains: Vec<PersonReference>,
    ) -> Self {
        let status = candidates
            .iter()
            .map(|c| (c.contact.clone(), CandidateStatus::Unknown))
            .collect();

        let state = if candidates.is_empty() {
            SearchState::NoGoalieAvailable
        } else {
            SearchState::Unresolved
        };

        Self {
            team_id,
            game_id,
            scheduled_at,
            candidates,
            status,
            captains,
            state,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn candidates(&self) -> &[PersonReference] {
        &self.candidates
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn status_of(&self, person: &PersonReference) -> CandidateStatus {
        self.status
            .get(&person.contact)
            .copied()
            .unwrap_or_default()
    }

    pub fn contains_contact(&self, contact: &ContactAddress) -> bool {
        self.status.contains_key(contact)
    }

    /// First candidate, in fixed order, who has neither confirmed nor
    /// declined. Pure query.
    pub fn next_candidate(&self) -> Option<&PersonReference> {
        self.candidates.iter().find(|c| {
            !matches!(
                self.status_of(c),
                CandidateStatus::Confirmed | CandidateStatus::Declined
            )
        })
    }

    /// Mark a candidate confirmed and resolve the search. Idempotent;
    /// once a goalie is locked in no further status changes happen here.
    pub fn mark_confirmed(&mut self, person: &PersonReference) {
        if self.state == SearchState::GoalieFound {
            return;
        }

        self.status
            .insert(person.contact.clone(), CandidateStatus::Confirmed);
        self.state = SearchState::GoalieFound;
    }

    /// Mark a candidate declined; resolves the search as goalie-less
    /// when nobody contactable remains.
    pub fn mark_declined(&mut self, person: &PersonReference) {
        if self.state == SearchState::GoalieFound {
            return;
        }

        self.status
            .insert(person.contact.clone(), CandidateStatus::Declined);

        if self.next_candidate().is_none() {
            self.state = SearchState::NoGoalieAvailable;
        }
    }

    /// A search expires once its game time has passed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.scheduled_at
    }
}
