//! Core type definitions for substitute-goalie coordination

use serde::{Deserialize, Serialize};

/// Reserved user id recorded when an anonymous substitute accepts a game.
pub const ANON_SUB_USER_ID: UserId = UserId(-100);

/// Placeholder display name for participants with no stored name.
pub const PLACEHOLDER_NAME: &str = "teammate";

/// Team identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TeamId(pub i64);

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TeamId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(TeamId)
            .map_err(|_| format!("Invalid team id: {}", s))
    }
}

/// Game identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GameId(pub i64);

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for GameId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(GameId)
            .map_err(|_| format!("Invalid game id: {}", s))
    }
}

/// Registered-user identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A phone address in canonical form, usable as a map key.
///
/// Canonicalization keeps digits only and prefixes a country code:
/// ten-digit numbers are assumed US (`+1`), eleven digits starting with 1
/// gain a `+`, anything else keeps its digits behind a `+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactAddress(String);

impl ContactAddress {
    pub fn new(raw: &str) -> Self {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

        let canonical = if digits.is_empty() {
            String::new()
        } else if digits.len() == 10 {
            format!("+1{}", digits)
        } else if digits.len() == 11 && digits.starts_with('1') {
            format!("+{}", digits)
        } else {
            format!("+{}", digits)
        };

        Self(canonical)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ContactAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a conversation participant: a registered user or an
/// anonymous substitute from a team's goalie list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonReference {
    /// Registered-user id, if the person is a known user
    pub user_id: Option<UserId>,
    /// Display name; never empty
    pub name: String,
    /// Canonical contact address
    pub contact: ContactAddress,
}

impl PersonReference {
    pub fn new(
        user_id: Option<UserId>,
        name: impl Into<String>,
        contact: ContactAddress,
    ) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            PLACEHOLDER_NAME.to_string()
        } else {
            name
        };

        Self {
            user_id,
            name,
            contact,
        }
    }
}

/// Who authored a conversation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    System,
    Participant,
    Assistant,
}

/// One entry in a conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub speaker: Speaker,
    pub text: String,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::System,
            text: text.into(),
        }
    }

    pub fn participant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Participant,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

/// Status of one candidate inside a goalie search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    #[default]
    Unknown,
    Confirmed,
    Declined,
    NeedsMoreTime,
}

impl std::fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Declined => write!(f, "declined"),
            Self::NeedsMoreTime => write!(f, "needs_more_time"),
        }
    }
}

/// Resolution state of a goalie search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    #[default]
    Unresolved,
    GoalieFound,
    NoGoalieAvailable,
}

impl std::fmt::Display for SearchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unresolved => write!(f, "unresolved"),
            Self::GoalieFound => write!(f, "goalie_found"),
            Self::NoGoalieAvailable => write!(f, "no_goalie_available"),
        }
    }
}

/// Conversational mode governing classification and replies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    #[default]
    Chat,
    AssistCaptain,
    SecureGoalie,
}

impl std::fmt::Display for Goal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chat => write!(f, "chat"),
            Self::AssistCaptain => write!(f, "assist_captain"),
            Self::SecureGoalie => write!(f, "secure_goalie"),
        }
    }
}

/// A recorded yes/no game reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Yes,
    No,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yes => write!(f, "yes"),
            Self::No => write!(f, "no"),
        }
    }
}

/// Intent labels for messages from captains and teammates.
///
/// The oracle is asked to pick exactly one of these label names; anything
/// outside the set fails to parse and feeds the caller's bounded retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptainIntent {
    Chat,
    SubGoalieRequest,
}

impl CaptainIntent {
    /// Label names offered to the oracle, in declaration order.
    pub const LABELS: [&'static str; 2] = ["chat", "sub_goalie_request"];
}

impl std::fmt::Display for CaptainIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chat => write!(f, "chat"),
            Self::SubGoalieRequest => write!(f, "sub_goalie_request"),
        }
    }
}

impl std::str::FromStr for CaptainIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chat" => Ok(Self::Chat),
            "sub_goalie_request" => Ok(Self::SubGoalieRequest),
            _ => Err(format!("Unrecognized intent label: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_normalization() {
        let a = ContactAddress::new("(408) 555-1234");
        let b = ContactAddress::new("408.555.1234");
        let c = ContactAddress::new("+1 408 555 1234");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "+14085551234");
    }

    #[test]
    fn test_contact_non_us_length_kept() {
        let intl = ContactAddress::new("+44 20 7946 0958");
        assert_eq!(intl.as_str(), "+442079460958");
    }

    #[test]
    fn test_person_name_placeholder() {
        let person = PersonReference::new(None, "  ", ContactAddress::new("4085551234"));
        assert_eq!(person.name, PLACEHOLDER_NAME);
    }

    #[test]
    fn test_person_equality_includes_all_fields() {
        let contact = ContactAddress::new("4085551234");
        let a = PersonReference::new(Some(UserId(7)), "Shoresy", contact.clone());
        let b = PersonReference::new(Some(UserId(7)), "Shoresy", contact.clone());
        let c = PersonReference::new(Some(UserId(8)), "Shoresy", contact);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_intent_label_parsing() {
        assert_eq!("chat".parse::<CaptainIntent>().unwrap(), CaptainIntent::Chat);
        assert_eq!(
            " Sub_Goalie_Request ".parse::<CaptainIntent>().unwrap(),
            CaptainIntent::SubGoalieRequest
        );
        assert!("shrug".parse::<CaptainIntent>().is_err());
    }

    #[test]
    fn test_id_parsing() {
        let id: GameId = "42".parse().unwrap();
        assert_eq!(id, GameId(42));
        assert!("forty-two".parse::<TeamId>().is_err());
    }
}
