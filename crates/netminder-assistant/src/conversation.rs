//! Conversation state machine
//!
//! One `Conversation` per contact address. The goal governs how inbound
//! messages are classified; the history is the context handed to the
//! oracle. Oracle and transport handles are passed in per call so the
//! conversation itself stays a plain serializable value.

use chrono::{DateTime, Utc};
use netminder_core::{
    CaptainIntent, ChatMessage, ContactAddress, GameId, Goal, NetminderError, PersonReference,
    Result,
};
use netminder_oracle::Oracle;
use netminder_transport::Transport;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Priming entry for ordinary chat and captain assistance
const GENERAL_PRIMER: &str = "You are the assistant captain of a recreational hockey team. \
You keep a list of substitute goalies and are responsible for making sure the team has a \
goalie for each game. Be informal and brief; abbreviations are ok. You enjoy joking around \
and chatting about hockey, but are not very talkative.";

/// Priming entry for reaching out to a candidate substitute
const RECRUIT_PRIMER: &str = "You are the assistant captain of a recreational hockey team, \
and your job is to make sure there is a goalie for each game. Assume the player is familiar \
with the team and the people on it.";

/// What an inbound message turned out to be, given the current goal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Ordinary chat; reply freely
    Chat,
    /// A captain asked for a substitute goalie
    SubGoalieRequest,
    /// A captain authorized the proposed search
    SearchAuthorized,
    /// A candidate accepted the game
    GoalieConfirmed,
    /// A candidate is unavailable
    GoalieDeclined,
}

/// An ongoing dialogue with one participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub person: PersonReference,
    goal: Goal,
    history: Vec<ChatMessage>,
    pending_game: Option<GameId>,
    pub last_activity: DateTime<Utc>,
}

impl Conversation {
    pub fn new(person: PersonReference) -> Self {
        Self {
            person,
            goal: Goal::Chat,
            history: vec![ChatMessage::system(GENERAL_PRIMER)],
            pending_game: None,
            last_activity: Utc::now(),
        }
    }

    pub fn contact(&self) -> &ContactAddress {
        &self.person.contact
    }

    pub fn goal(&self) -> Goal {
        self.goal
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// History without the leading priming entry
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.history[1..]
    }

    pub fn pending_game(&self) -> Option<GameId> {
        self.pending_game
    }

    pub fn set_pending(&mut self, game_id: GameId) {
        self.pending_game = Some(game_id);
    }

    /// Consume the pending search target, if any
    pub fn take_pending(&mut self) -> Option<GameId> {
        self.pending_game.take()
    }

    /// Record an inbound participant message
    pub fn append_inbound(&mut self, text: &str) {
        self.history.push(ChatMessage::participant(text));
        self.last_activity = Utc::now();
    }

    /// Switch conversational mode. No-op when unchanged. Entering the
    /// recruitment mode discards prior history and re-primes, so the
    /// outreach never inherits unrelated context.
    pub fn set_goal(&mut self, goal: Goal) {
        if goal == self.goal {
            return;
        }

        debug!("Conversation with {} now {}", self.person.name, goal);
        self.goal = goal;

        if goal == Goal::SecureGoalie {
            self.history.clear();
            self.history.push(ChatMessage::system(RECRUIT_PRIMER));
        }
    }

    /// Classify the latest inbound message against the current goal.
    ///
    /// Out-of-set oracle output surfaces as a classification error for
    /// the caller's bounded retry; it never becomes a catch-all label.
    pub async fn classify<O: Oracle + ?Sized>(&self, oracle: &O) -> Result<MessageKind> {
        match self.goal {
            Goal::SecureGoalie => {
                if oracle
                    .analyze(&self.history, "Did this user agree to play goalie in the game?")
                    .await?
                {
                    return Ok(MessageKind::GoalieConfirmed);
                }
                if oracle
                    .analyze(
                        &self.history,
                        "Do you think the user is unavailable to play goalie in the game?",
                    )
                    .await?
                {
                    return Ok(MessageKind::GoalieDeclined);
                }
                // no decision yet; keep the chat going
                Ok(MessageKind::Chat)
            }
            Goal::AssistCaptain if self.pending_game.is_some() => {
                if oracle
                    .analyze(
                        &self.history,
                        "Did the user authorize starting the goalie search?",
                    )
                    .await?
                {
                    Ok(MessageKind::SearchAuthorized)
                } else {
                    Ok(MessageKind::Chat)
                }
            }
            _ => {
                let label = oracle.classify(&self.history, &CaptainIntent::LABELS).await?;
                let intent: CaptainIntent = label
                    .parse()
                    .map_err(NetminderError::Classification)?;

                Ok(match intent {
                    CaptainIntent::Chat => MessageKind::Chat,
                    CaptainIntent::SubGoalieRequest => MessageKind::SubGoalieRequest,
                })
            }
        }
    }

    /// Append an assistant entry and deliver it to the participant
    pub async fn reply<T: Transport + ?Sized>(&mut self, transport: &T, text: &str) -> Result<()> {
        self.history.push(ChatMessage::assistant(text));
        self.last_activity = Utc::now();
        transport.deliver(&self.person.contact, text).await
    }

    /// Ask the oracle for participant-facing text steered by `directive`,
    /// record the directive, and deliver the produced reply.
    pub async fn respond_via_oracle<O, T>(
        &mut self,
        oracle: &O,
        transport: &T,
        directive: &str,
    ) -> Result<()>
    where
        O: Oracle + ?Sized,
        T: Transport + ?Sized,
    {
        let text = oracle.generate(&self.history, directive).await?;
        self.history.push(ChatMessage::system(directive));
        self.reply(transport, &text).await
    }

    /// Free-form chat reply with no extra steering
    pub async fn chat_reply<O, T>(&mut self, oracle: &O, transport: &T) -> Result<()>
    where
        O: Oracle + ?Sized,
        T: Transport + ?Sized,
    {
        let text = oracle.generate(&self.history, "").await?;
        self.reply(transport, &text).await
    }
}
