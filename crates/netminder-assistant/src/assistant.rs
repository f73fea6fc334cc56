//! The assistant: coordination across searches and conversations
//!
//! Owns the search and conversation maps exclusively. Every inbound
//! message runs start-to-finish through `receive`: purge expired
//! searches, locate or create the conversation, classify, dispatch, and
//! persist. Collaborators are injected at construction and the whole
//! state is saved through the store before `receive` returns.

use chrono::{DateTime, Duration, Utc};
use netminder_core::{
    timefmt, AssistantConfig, ContactAddress, Decision, GameId, Goal, NetminderError,
    PersonReference, Result, SearchState, TeamId,
};
use netminder_oracle::Oracle;
use netminder_roster::RosterProvider;
use netminder_transport::Transport;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::conversation::{Conversation, MessageKind};
use crate::report::{CandidateReport, SearchReport, TeamSearchReport};
use crate::search::GoalieSearch;
use crate::store::StateStore;

/// Total classification attempts per inbound message before giving up
const CLASSIFY_ATTEMPTS: u32 = 2;

/// The persisted unit: all active searches and conversations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantState {
    pub searches: HashMap<GameId, GoalieSearch>,
    pub conversations: HashMap<ContactAddress, Conversation>,
}

/// Outcome of initiating a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStart {
    /// A new search was created and outreach has begun
    Started,
    /// A search already exists for this game; nothing to do
    AlreadyInProgress,
}

/// The coordination engine. Generic over its four collaborators so tests
/// can inject doubles for all of them.
pub struct Assistant<R, O, T, S> {
    config: AssistantConfig,
    roster: R,
    oracle: O,
    transport: T,
    store: S,
    state: AssistantState,
}

impl<R, O, T, S> Assistant<R, O, T, S>
where
    R: RosterProvider,
    O: Oracle,
    T: Transport,
    S: StateStore,
{
    /// Construct with fresh state
    pub fn new(config: AssistantConfig, roster: R, oracle: O, transport: T, store: S) -> Self {
        Self {
            config,
            roster,
            oracle,
            transport,
            store,
            state: AssistantState::default(),
        }
    }

    /// Construct from the durable store, or fresh if nothing was saved
    pub async fn load_or_new(
        config: AssistantConfig,
        roster: R,
        oracle: O,
        transport: T,
        store: S,
    ) -> Result<Self> {
        let state = store.load().await?.unwrap_or_default();
        info!(
            "Assistant starting with {} searches, {} conversations",
            state.searches.len(),
            state.conversations.len()
        );

        Ok(Self {
            config,
            roster,
            oracle,
            transport,
            store,
            state,
        })
    }

    pub fn search(&self, game_id: GameId) -> Option<&GoalieSearch> {
        self.state.searches.get(&game_id)
    }

    pub fn search_count(&self) -> usize {
        self.state.searches.len()
    }

    pub fn conversation(&self, contact: &ContactAddress) -> Option<&Conversation> {
        self.state.conversations.get(contact)
    }

    /// Entry point for all inbound messages.
    ///
    /// State is persisted whether or not the message could be handled; a
    /// failing save is an error of the whole call.
    pub async fn receive(&mut self, raw_address: &str, text: &str) -> Result<()> {
        self.cleanup(Utc::now());

        let contact = ContactAddress::new(raw_address);
        let outcome = self.handle_inbound(&contact, text).await;

        self.persist().await?;
        outcome
    }

    /// Start a goalie search for a specific game.
    ///
    /// A search already running for this game is a no-op; another
    /// unresolved search for the same team is a conflict.
    pub async fn initiate_search(
        &mut self,
        team_id: TeamId,
        game_id: GameId,
    ) -> Result<SearchStart> {
        if self.state.searches.contains_key(&game_id) {
            warn!("Goalie search already in progress for game {}", game_id);
            return Ok(SearchStart::AlreadyInProgress);
        }

        if let Some(existing) = self
            .state
            .searches
            .values()
            .find(|s| s.team_id == team_id && s.state() == SearchState::Unresolved)
        {
            return Err(NetminderError::ConflictingSearch {
                team_id,
                game_id: existing.game_id,
            });
        }

        let game = self.roster.game_by_id(game_id).await?;
        let search = self.build_search(team_id, game_id, game.scheduled_at).await?;
        self.state.searches.insert(game_id, search);
        info!("Initiated goalie search for team {} game {}", team_id, game_id);

        self.continue_search(game_id).await?;
        self.persist().await?;
        Ok(SearchStart::Started)
    }

    /// Read-only projection of a team's searches for captains
    pub async fn describe_searches(&self, team_id: TeamId) -> Result<TeamSearchReport> {
        let team_name = match self.roster.team_by_id(team_id).await {
            Ok(team) => team.name,
            Err(NetminderError::TeamNotFound(_)) => "Unknown".to_string(),
            Err(e) => return Err(e),
        };

        let mut searches = Vec::new();
        for (game_id, search) in &self.state.searches {
            if search.team_id != team_id {
                continue;
            }

            let candidates = search
                .candidates()
                .iter()
                .map(|person| CandidateReport {
                    name: person.name.clone(),
                    contact: person.contact.clone(),
                    status: search.status_of(person),
                    messages: self
                        .state
                        .conversations
                        .get(&person.contact)
                        .map(|c| c.transcript().to_vec())
                        .unwrap_or_default(),
                })
                .collect();

            searches.push(SearchReport {
                game_id: *game_id,
                scheduled_at: search.scheduled_at,
                candidates,
            });
        }
        searches.sort_by_key(|s| s.game_id);

        Ok(TeamSearchReport {
            team_name,
            team_id,
            searches,
        })
    }

    // --- inbound handling ---

    async fn handle_inbound(&mut self, contact: &ContactAddress, text: &str) -> Result<()> {
        if !self.ensure_conversation(contact).await? {
            // unregistered senders are not engaged
            debug!("Dropping message from unknown contact {}", contact);
            return Ok(());
        }

        let Some(conv) = self.state.conversations.get_mut(contact) else {
            return Ok(());
        };
        info!("Message from {}: {}", conv.person.name, text);
        conv.append_inbound(text);

        // The oracle sometimes ignores the classification directive, so
        // each message gets a bounded number of attempts before we give
        // up on it.
        for attempt in 1..=CLASSIFY_ATTEMPTS {
            let kind = match self.classify(contact).await {
                Ok(kind) => kind,
                Err(NetminderError::Classification(reason)) => {
                    warn!(
                        "Classification attempt {}/{} failed for {}: {}",
                        attempt, CLASSIFY_ATTEMPTS, contact, reason
                    );
                    continue;
                }
                Err(other) => return Err(other),
            };

            debug!("Message from {} classified as {:?}", contact, kind);
            return self.dispatch(contact, kind).await;
        }

        warn!(
            "Giving up on message from {} after {} attempts",
            contact, CLASSIFY_ATTEMPTS
        );
        Ok(())
    }

    async fn classify(&self, contact: &ContactAddress) -> Result<MessageKind> {
        let conv = self
            .state
            .conversations
            .get(contact)
            .ok_or_else(|| NetminderError::UnknownContact(contact.clone()))?;
        conv.classify(&self.oracle).await
    }

    async fn dispatch(&mut self, contact: &ContactAddress, kind: MessageKind) -> Result<()> {
        match kind {
            MessageKind::Chat => self.handle_chat(contact).await,
            MessageKind::SubGoalieRequest => self.handle_sub_request(contact).await,
            MessageKind::SearchAuthorized => self.handle_search_authorized(contact).await,
            MessageKind::GoalieConfirmed => self.handle_goalie_reply(contact, Decision::Yes).await,
            MessageKind::GoalieDeclined => self.handle_goalie_reply(contact, Decision::No).await,
        }
    }

    async fn handle_chat(&mut self, contact: &ContactAddress) -> Result<()> {
        let Some(conv) = self.state.conversations.get_mut(contact) else {
            return Ok(());
        };
        conv.chat_reply(&self.oracle, &self.transport).await
    }

    /// A captain asked for a substitute: propose the next goalie-less
    /// game and ask for authorization before contacting anyone.
    async fn handle_sub_request(&mut self, contact: &ContactAddress) -> Result<()> {
        let Some(conv) = self.state.conversations.get(contact) else {
            return Ok(());
        };
        let person = conv.person.clone();

        let Some(team_id) = self.roster.team_for_captain(&person).await? else {
            let Some(conv) = self.state.conversations.get_mut(contact) else {
                return Ok(());
            };
            return conv
                .respond_via_oracle(
                    &self.oracle,
                    &self.transport,
                    "Tell the user you could not find a team they captain, so you cannot \
                     start a goalie search for them.",
                )
                .await;
        };

        let game = self.roster.next_game_without_goalie(team_id).await?;
        let Some(conv) = self.state.conversations.get_mut(contact) else {
            return Ok(());
        };

        match game {
            None => {
                conv.respond_via_oracle(
                    &self.oracle,
                    &self.transport,
                    "Tell the user that there are no upcoming games that need a goalie.",
                )
                .await
            }
            Some(game) => {
                let now = Utc::now();
                let directive = format!(
                    "Tell the user that the game on {} ({}) needs a goalie, and ask the user \
                     to authorize a substitute goalie search for that game.",
                    timefmt::game_day_time(&game.scheduled_at),
                    timefmt::time_until(&now, &game.scheduled_at),
                );

                conv.set_goal(Goal::AssistCaptain);
                conv.set_pending(game.id);
                conv.respond_via_oracle(&self.oracle, &self.transport, &directive)
                    .await
            }
        }
    }

    /// The captain authorized the proposed search: consume the pending
    /// target, acknowledge, and start contacting candidates.
    async fn handle_search_authorized(&mut self, contact: &ContactAddress) -> Result<()> {
        let Some(conv) = self.state.conversations.get_mut(contact) else {
            return Ok(());
        };
        let Some(game_id) = conv.take_pending() else {
            warn!("Search authorization from {} with nothing pending", contact);
            return Ok(());
        };
        conv.set_goal(Goal::Chat);

        let game = self.roster.game_by_id(game_id).await?;
        if !self.state.searches.contains_key(&game_id) {
            let search = self.build_search(game.team_id, game_id, game.scheduled_at).await?;
            self.state.searches.insert(game_id, search);
        }

        let directive = format!(
            "Tell the user that we will find a goalie for the game on {}.",
            timefmt::game_time(&game.scheduled_at),
        );
        let Some(conv) = self.state.conversations.get_mut(contact) else {
            return Ok(());
        };
        conv.respond_via_oracle(&self.oracle, &self.transport, &directive)
            .await?;

        self.continue_search(game_id).await
    }

    /// A contacted candidate gave a clear answer
    async fn handle_goalie_reply(
        &mut self,
        contact: &ContactAddress,
        decision: Decision,
    ) -> Result<()> {
        let Some(conv) = self.state.conversations.get(contact) else {
            return Ok(());
        };
        let person = conv.person.clone();

        let Some(game_id) = self.search_for_contact(contact) else {
            warn!("No goalie search found for replying contact {}", contact);
            return Ok(());
        };
        let Some(search) = self.state.searches.get_mut(&game_id) else {
            return Ok(());
        };

        match decision {
            Decision::Yes => search.mark_confirmed(&person),
            Decision::No => search.mark_declined(&person),
        }
        let team_id = search.team_id;
        let scheduled_at = search.scheduled_at;
        let captains = search.captains.clone();

        self.record_reply(game_id, team_id, &person, decision).await?;

        let directive = match decision {
            Decision::Yes => {
                "Tell them they are confirmed, thank them, and tell them to let the captain \
                 know if anything changes."
            }
            Decision::No => {
                "Tell them thanks, we'll keep looking, and we'll keep them in mind for \
                 future games."
            }
        };
        let Some(conv) = self.state.conversations.get_mut(contact) else {
            return Ok(());
        };
        conv.set_goal(Goal::Chat);
        conv.respond_via_oracle(&self.oracle, &self.transport, directive)
            .await?;

        let when = timefmt::game_time(&scheduled_at);
        match decision {
            Decision::Yes => {
                self.notify_captains(
                    &captains,
                    &format!(
                        "(system) Goalie {} is confirmed for the game on {}",
                        person.name, when
                    ),
                )
                .await
            }
            Decision::No => {
                self.notify_captains(
                    &captains,
                    &format!(
                        "(system) Goalie {} has declined for the game on {}",
                        person.name, when
                    ),
                )
                .await?;

                // move on to the next candidate
                self.continue_search(game_id).await
            }
        }
    }

    // --- outreach ---

    async fn build_search(
        &self,
        team_id: TeamId,
        game_id: GameId,
        scheduled_at: DateTime<Utc>,
    ) -> Result<GoalieSearch> {
        let pool = self.roster.substitute_pool(team_id).await?;
        let captains = self.roster.captains(team_id).await?;
        Ok(GoalieSearch::new(
            team_id,
            game_id,
            scheduled_at,
            pool,
            captains,
        ))
    }

    /// Contact the next candidate in line, or tell the captains the pool
    /// is exhausted. Outreach is strictly sequential: one candidate at a
    /// time, advanced only by a decline.
    async fn continue_search(&mut self, game_id: GameId) -> Result<()> {
        let Some(search) = self.state.searches.get(&game_id) else {
            return Ok(());
        };
        let team_id = search.team_id;
        let scheduled_at = search.scheduled_at;
        let captains = search.captains.clone();
        let considered = search.candidate_count();
        let next = search.next_candidate().cloned();

        match next {
            Some(candidate) => {
                let team = self.roster.team_by_id(team_id).await?;
                let now = Utc::now();
                let captain_names = captains
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");

                let instruction = format!(
                    "You need to reach out to {} to see if they are available to play goalie. \
                     Make sure your message includes the following: \
                     1. You are the team's assistant captain. \
                     2. The team name is {}. \
                     3. The game is on {} ({}). \
                     4. The captain(s) are {} and they can be contacted for more information. \
                     You may chat, but remember to insist on a response indicating whether \
                     the goalie is available or not.",
                    candidate.name,
                    team.name,
                    timefmt::game_time(&scheduled_at),
                    timefmt::time_until(&now, &scheduled_at),
                    captain_names,
                );

                info!(
                    "Reaching out to goalie {} for game {}",
                    candidate.name, game_id
                );
                let conv = Self::conversation_entry(&mut self.state.conversations, &candidate);
                conv.set_goal(Goal::SecureGoalie);
                conv.respond_via_oracle(&self.oracle, &self.transport, &instruction)
                    .await?;

                self.notify_captains(
                    &captains,
                    &format!("(system) Goalie {} has been contacted", candidate.name),
                )
                .await
            }
            None => {
                info!("No candidates remain for game {}", game_id);
                self.notify_captains(
                    &captains,
                    &format!(
                        "(system) Heads up! There are no goalies available for the game on {}. \
                         {} goalies were considered. You can add more goalies to the list on \
                         the team page.",
                        timefmt::game_time(&scheduled_at),
                        considered,
                    ),
                )
                .await
            }
        }
    }

    /// Deliver a status text to every captain with a usable contact. A
    /// conversation is ensured for each so they can reply afterwards;
    /// the notification itself is not part of any transcript.
    async fn notify_captains(
        &mut self,
        captains: &[PersonReference],
        text: &str,
    ) -> Result<()> {
        for captain in captains {
            if captain.contact.is_empty() {
                continue;
            }
            Self::conversation_entry(&mut self.state.conversations, captain);
            self.transport.deliver(&captain.contact, text).await?;
        }
        Ok(())
    }

    // --- plumbing ---

    async fn ensure_conversation(&mut self, contact: &ContactAddress) -> Result<bool> {
        if self.state.conversations.contains_key(contact) {
            return Ok(true);
        }

        match self.roster.resolve_person_by_contact(contact).await? {
            Some(person) => {
                self.state
                    .conversations
                    .insert(contact.clone(), Conversation::new(person));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn conversation_entry<'a>(
        conversations: &'a mut HashMap<ContactAddress, Conversation>,
        person: &PersonReference,
    ) -> &'a mut Conversation {
        conversations
            .entry(person.contact.clone())
            .or_insert_with(|| Conversation::new(person.clone()))
    }

    /// The unresolved search this contact is a candidate in, falling
    /// back to any search containing them.
    fn search_for_contact(&self, contact: &ContactAddress) -> Option<GameId> {
        let mut fallback = None;
        for (game_id, search) in &self.state.searches {
            if search.contains_contact(contact) {
                if search.state() == SearchState::Unresolved {
                    return Some(*game_id);
                }
                fallback = Some(*game_id);
            }
        }
        fallback
    }

    async fn record_reply(
        &self,
        game_id: GameId,
        team_id: TeamId,
        person: &PersonReference,
        decision: Decision,
    ) -> Result<()> {
        if !self.config.live_replies {
            return Ok(());
        }
        if person.user_id.is_none() && decision == Decision::No {
            // anonymous subs only need their acceptances on record
            return Ok(());
        }
        self.roster
            .record_response(game_id, team_id, person, decision)
            .await
    }

    /// Drop expired searches and stale resting conversations
    fn cleanup(&mut self, now: DateTime<Utc>) {
        self.state.searches.retain(|game_id, search| {
            let expired = search.is_expired(now);
            if expired {
                info!("Removing expired goalie search for game {}", game_id);
            }
            !expired
        });

        let ttl = Duration::days(self.config.conversation_ttl_days);
        self.state.conversations.retain(|contact, conv| {
            let stale = conv.goal() == Goal::Chat
                && conv.pending_game().is_none()
                && now - conv.last_activity > ttl;
            if stale {
                debug!("Evicting stale conversation with {}", contact);
            }
            !stale
        });
    }

    async fn persist(&self) -> Result<()> {
        self.store.save(&self.state).await
    }
}
