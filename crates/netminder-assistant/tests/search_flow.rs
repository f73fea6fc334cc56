//! End-to-end scenarios for the coordination engine, run against
//! scripted collaborators.

use chrono::{Duration, Utc};
use netminder_assistant::{Assistant, MemoryStore, SearchStart, SharedAssistant};
use netminder_core::{
    AssistantConfig, CandidateStatus, ContactAddress, Decision, GameId, Goal, NetminderError,
    PersonReference, SearchState, TeamId, UserId,
};
use netminder_oracle::ScriptedOracle;
use netminder_roster::{FixtureBuilder, FixtureRoster, Game, Team};
use netminder_transport::RecordingTransport;

const CAPTAIN: &str = "4085550099";
const GOALIE_A: &str = "4085550001";
const GOALIE_B: &str = "4085550002";
const GOALIE_C: &str = "4085550003";

fn captain() -> PersonReference {
    PersonReference::new(Some(UserId(99)), "Wayne", ContactAddress::new(CAPTAIN))
}

fn goalie(id: i64, name: &str, digits: &str) -> PersonReference {
    PersonReference::new(Some(UserId(id)), name, ContactAddress::new(digits))
}

fn roster_with_goalies(goalies: Vec<PersonReference>) -> FixtureRoster {
    FixtureBuilder::new()
        .team(
            Team {
                id: TeamId(1),
                name: "Irish".to_string(),
            },
            vec![captain()],
            goalies,
        )
        .game(Game {
            id: GameId(10),
            team_id: TeamId(1),
            scheduled_at: Utc::now() + Duration::hours(18),
            completed: false,
        })
        .build()
}

fn three_goalie_roster() -> FixtureRoster {
    roster_with_goalies(vec![
        goalie(1, "Daryl", GOALIE_A),
        goalie(2, "Glen", GOALIE_B),
        goalie(3, "Stretch", GOALIE_C),
    ])
}

struct Harness {
    assistant: Assistant<FixtureRoster, ScriptedOracle, RecordingTransport, MemoryStore>,
    roster: FixtureRoster,
    oracle: ScriptedOracle,
    transport: RecordingTransport,
    store: MemoryStore,
}

fn harness(roster: FixtureRoster, config: AssistantConfig) -> Harness {
    let oracle = ScriptedOracle::new();
    let transport = RecordingTransport::new();
    let store = MemoryStore::new();

    let assistant = Assistant::new(
        config,
        roster.clone(),
        oracle.clone(),
        transport.clone(),
        store.clone(),
    );

    Harness {
        assistant,
        roster,
        oracle,
        transport,
        store,
    }
}

fn default_harness() -> Harness {
    harness(three_goalie_roster(), AssistantConfig::default())
}

#[tokio::test]
async fn decline_advances_then_confirm_resolves() {
    let mut h = default_harness();

    // outreach to Daryl
    h.oracle.push(netminder_oracle::ScriptedReply::Text(
        "Hey Daryl, any chance you can play net?".to_string(),
    ));
    let started = h
        .assistant
        .initiate_search(TeamId(1), GameId(10))
        .await
        .unwrap();
    assert_eq!(started, SearchStart::Started);

    let a = ContactAddress::new(GOALIE_A);
    assert_eq!(h.transport.sent_to(&a).len(), 1);
    assert!(h.transport.sent_to(&ContactAddress::new(CAPTAIN))[0].contains("Daryl has been contacted"));

    // Daryl declines: not agreeing, unavailable, thanks reply, outreach to Glen
    let script = h.oracle.clone();
    script.push(netminder_oracle::ScriptedReply::Verdict(false));
    script.push(netminder_oracle::ScriptedReply::Verdict(true));
    script.push(netminder_oracle::ScriptedReply::Text(
        "No worries, we'll keep looking.".to_string(),
    ));
    script.push(netminder_oracle::ScriptedReply::Text(
        "Glen! Net's open Friday, you in?".to_string(),
    ));
    h.assistant
        .receive(GOALIE_A, "sorry bud, out of town")
        .await
        .unwrap();

    let search = h.assistant.search(GameId(10)).expect("search active");
    assert_eq!(search.state(), SearchState::Unresolved);
    assert_eq!(
        search.status_of(&goalie(1, "Daryl", GOALIE_A)),
        CandidateStatus::Declined
    );
    assert_eq!(h.transport.sent_to(&ContactAddress::new(GOALIE_B)).len(), 1);

    // Glen confirms
    script.push(netminder_oracle::ScriptedReply::Verdict(true));
    script.push(netminder_oracle::ScriptedReply::Text(
        "Beauty. You're locked in.".to_string(),
    ));
    h.assistant.receive(GOALIE_B, "yeah I'm in").await.unwrap();

    let search = h.assistant.search(GameId(10)).expect("search active");
    assert_eq!(search.state(), SearchState::GoalieFound);
    assert_eq!(
        search.status_of(&goalie(2, "Glen", GOALIE_B)),
        CandidateStatus::Confirmed
    );

    // Stretch was never contacted
    assert!(h.transport.sent_to(&ContactAddress::new(GOALIE_C)).is_empty());

    // captains heard: contacted A, declined A, contacted B, confirmed B
    let captain_msgs = h.transport.sent_to(&ContactAddress::new(CAPTAIN));
    assert_eq!(captain_msgs.len(), 4);
    assert!(captain_msgs[1].contains("Daryl has declined"));
    assert!(captain_msgs[3].contains("Glen is confirmed"));

    // no scripted replies left over means no stray oracle calls
    assert_eq!(h.oracle.remaining(), 0);
}

#[tokio::test]
async fn lone_candidate_declining_exhausts_search() {
    let mut h = harness(
        roster_with_goalies(vec![goalie(1, "Daryl", GOALIE_A)]),
        AssistantConfig::default(),
    );

    h.oracle.push(netminder_oracle::ScriptedReply::Text(
        "Daryl, net's open. You in?".to_string(),
    ));
    h.assistant
        .initiate_search(TeamId(1), GameId(10))
        .await
        .unwrap();

    let script = h.oracle.clone();
    script.push(netminder_oracle::ScriptedReply::Verdict(false));
    script.push(netminder_oracle::ScriptedReply::Verdict(true));
    script.push(netminder_oracle::ScriptedReply::Text(
        "All good, thanks anyway.".to_string(),
    ));
    h.assistant.receive(GOALIE_A, "can't make it").await.unwrap();

    let search = h.assistant.search(GameId(10)).expect("search retained");
    assert_eq!(search.state(), SearchState::NoGoalieAvailable);

    let captain_msgs = h.transport.sent_to(&ContactAddress::new(CAPTAIN));
    let exhausted = captain_msgs.last().unwrap();
    assert!(exhausted.contains("no goalies available"));
    assert!(exhausted.contains("1 goalies were considered"));
}

#[tokio::test]
async fn unknown_sender_is_dropped_silently() {
    let mut h = default_harness();

    h.assistant
        .receive("4085559999", "hello? anyone there?")
        .await
        .unwrap();

    assert!(h.transport.sent().is_empty());
    assert!(h
        .assistant
        .conversation(&ContactAddress::new("4085559999"))
        .is_none());
    assert_eq!(h.oracle.remaining(), 0);
}

#[tokio::test]
async fn one_search_per_team_at_a_time() {
    let roster = FixtureBuilder::new()
        .team(
            Team {
                id: TeamId(1),
                name: "Irish".to_string(),
            },
            vec![captain()],
            vec![goalie(1, "Daryl", GOALIE_A)],
        )
        .game(Game {
            id: GameId(10),
            team_id: TeamId(1),
            scheduled_at: Utc::now() + Duration::hours(18),
            completed: false,
        })
        .game(Game {
            id: GameId(11),
            team_id: TeamId(1),
            scheduled_at: Utc::now() + Duration::hours(40),
            completed: false,
        })
        .build();
    let mut h = harness(roster, AssistantConfig::default());

    h.oracle.push(netminder_oracle::ScriptedReply::Text(
        "You around Friday?".to_string(),
    ));
    assert_eq!(
        h.assistant
            .initiate_search(TeamId(1), GameId(10))
            .await
            .unwrap(),
        SearchStart::Started
    );

    // another game, same team, first search still unresolved
    let err = h
        .assistant
        .initiate_search(TeamId(1), GameId(11))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NetminderError::ConflictingSearch {
            team_id: TeamId(1),
            ..
        }
    ));

    // same game again is a quiet no-op
    assert_eq!(
        h.assistant
            .initiate_search(TeamId(1), GameId(10))
            .await
            .unwrap(),
        SearchStart::AlreadyInProgress
    );

    // unknown game propagates as not-found (different team, so the
    // per-team conflict check does not fire first)
    let err = h
        .assistant
        .initiate_search(TeamId(2), GameId(77))
        .await
        .unwrap_err();
    assert!(matches!(err, NetminderError::GameNotFound(GameId(77))));
}

#[tokio::test]
async fn expired_searches_are_purged_on_receive() {
    let roster = FixtureBuilder::new()
        .team(
            Team {
                id: TeamId(1),
                name: "Irish".to_string(),
            },
            vec![captain()],
            vec![goalie(1, "Daryl", GOALIE_A)],
        )
        .game(Game {
            id: GameId(10),
            team_id: TeamId(1),
            scheduled_at: Utc::now() - Duration::hours(1),
            completed: false,
        })
        .build();
    let mut h = harness(roster, AssistantConfig::default());

    h.oracle.push(netminder_oracle::ScriptedReply::Text(
        "Short notice, but can you play tonight?".to_string(),
    ));
    h.assistant
        .initiate_search(TeamId(1), GameId(10))
        .await
        .unwrap();
    assert_eq!(h.assistant.search_count(), 1);

    // any inbound message purges first, even one that gets dropped
    h.assistant.receive("4085559999", "wrong number").await.unwrap();
    assert_eq!(h.assistant.search_count(), 0);
}

#[tokio::test]
async fn captain_requests_search_over_text() {
    let mut h = default_harness();
    let script = h.oracle.clone();

    // "find me a goalie" -> propose the goalie-less game
    script.push(netminder_oracle::ScriptedReply::Label(
        "sub_goalie_request".to_string(),
    ));
    script.push(netminder_oracle::ScriptedReply::Text(
        "Friday's game has no goalie. Want me to start the search?".to_string(),
    ));
    h.assistant
        .receive(CAPTAIN, "we need a goalie for friday")
        .await
        .unwrap();

    let conv = h
        .assistant
        .conversation(&ContactAddress::new(CAPTAIN))
        .expect("captain conversation");
    assert_eq!(conv.goal(), Goal::AssistCaptain);
    assert_eq!(conv.pending_game(), Some(GameId(10)));

    // "yes" -> acknowledge, create the search, reach out to Daryl
    script.push(netminder_oracle::ScriptedReply::Verdict(true));
    script.push(netminder_oracle::ScriptedReply::Text(
        "On it. I'll line someone up.".to_string(),
    ));
    script.push(netminder_oracle::ScriptedReply::Text(
        "Daryl, you free Friday night?".to_string(),
    ));
    h.assistant.receive(CAPTAIN, "yes please").await.unwrap();

    let conv = h
        .assistant
        .conversation(&ContactAddress::new(CAPTAIN))
        .expect("captain conversation");
    assert_eq!(conv.goal(), Goal::Chat);
    assert_eq!(conv.pending_game(), None);

    let search = h.assistant.search(GameId(10)).expect("search created");
    assert_eq!(search.state(), SearchState::Unresolved);
    assert_eq!(h.transport.sent_to(&ContactAddress::new(GOALIE_A)).len(), 1);
}

#[tokio::test]
async fn ambiguous_classification_retries_once_then_drops() {
    let mut h = default_harness();
    let script = h.oracle.clone();

    // first attempt off-script, second lands
    script.push(netminder_oracle::ScriptedReply::Label("hmmm".to_string()));
    script.push(netminder_oracle::ScriptedReply::Label("chat".to_string()));
    script.push(netminder_oracle::ScriptedReply::Text(
        "Ha, good one.".to_string(),
    ));
    h.assistant.receive(CAPTAIN, "nice pass eh").await.unwrap();
    assert_eq!(h.transport.sent_to(&ContactAddress::new(CAPTAIN)).len(), 1);

    // both attempts off-script: the message is dropped without a reply
    script.push(netminder_oracle::ScriptedReply::Label("???".to_string()));
    script.push(netminder_oracle::ScriptedReply::Label("nope".to_string()));
    h.assistant.receive(CAPTAIN, "so anyway").await.unwrap();
    assert_eq!(h.transport.sent_to(&ContactAddress::new(CAPTAIN)).len(), 1);
    assert_eq!(h.oracle.remaining(), 0);
}

#[tokio::test]
async fn live_replies_record_official_responses() {
    let mut config = AssistantConfig::default();
    config.live_replies = true;

    let roster = roster_with_goalies(vec![
        goalie(1, "Daryl", GOALIE_A),
        PersonReference::new(None, "Stretch", ContactAddress::new(GOALIE_B)),
    ]);
    let mut h = harness(roster, config);
    let script = h.oracle.clone();

    script.push(netminder_oracle::ScriptedReply::Text("You in?".to_string()));
    h.assistant
        .initiate_search(TeamId(1), GameId(10))
        .await
        .unwrap();

    // registered goalie declines: recorded as a "no"
    script.push(netminder_oracle::ScriptedReply::Verdict(false));
    script.push(netminder_oracle::ScriptedReply::Verdict(true));
    script.push(netminder_oracle::ScriptedReply::Text("All good.".to_string()));
    script.push(netminder_oracle::ScriptedReply::Text(
        "Stretch, net's open Friday.".to_string(),
    ));
    h.assistant.receive(GOALIE_A, "can't do it").await.unwrap();

    // anonymous sub confirms: recorded under the sentinel id
    script.push(netminder_oracle::ScriptedReply::Verdict(true));
    script.push(netminder_oracle::ScriptedReply::Text(
        "Locked in, thanks!".to_string(),
    ));
    h.assistant.receive(GOALIE_B, "sure thing").await.unwrap();

    let replies = h.roster.recorded_replies();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].user_id, UserId(1));
    assert_eq!(replies[0].decision, Decision::No);
    assert_eq!(replies[1].user_id, netminder_core::ANON_SUB_USER_ID);
    assert_eq!(replies[1].decision, Decision::Yes);
}

#[tokio::test]
async fn state_survives_restart() {
    let mut h = default_harness();
    let script = h.oracle.clone();

    script.push(netminder_oracle::ScriptedReply::Text(
        "Daryl, you in for Friday?".to_string(),
    ));
    h.assistant
        .initiate_search(TeamId(1), GameId(10))
        .await
        .unwrap();

    script.push(netminder_oracle::ScriptedReply::Verdict(false));
    script.push(netminder_oracle::ScriptedReply::Verdict(true));
    script.push(netminder_oracle::ScriptedReply::Text("Thanks anyway.".to_string()));
    script.push(netminder_oracle::ScriptedReply::Text(
        "Glen, how about you?".to_string(),
    ));
    h.assistant.receive(GOALIE_A, "nope").await.unwrap();

    // reload from the same store, as a restarted process would
    let restarted = Assistant::load_or_new(
        AssistantConfig::default(),
        h.roster.clone(),
        ScriptedOracle::new(),
        RecordingTransport::new(),
        h.store.clone(),
    )
    .await
    .unwrap();

    let search = restarted.search(GameId(10)).expect("search restored");
    assert_eq!(search.state(), SearchState::Unresolved);
    assert_eq!(
        search.status_of(&goalie(1, "Daryl", GOALIE_A)),
        CandidateStatus::Declined
    );
    let names: Vec<&str> = search
        .candidates()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["Daryl", "Glen", "Stretch"]);

    let conv = restarted
        .conversation(&ContactAddress::new(GOALIE_A))
        .expect("conversation restored");
    let original = h
        .assistant
        .conversation(&ContactAddress::new(GOALIE_A))
        .unwrap();
    assert_eq!(conv.history(), original.history());
}

#[tokio::test]
async fn report_covers_candidates_and_transcripts() {
    let mut h = default_harness();
    let script = h.oracle.clone();

    script.push(netminder_oracle::ScriptedReply::Text(
        "Daryl, net's open Friday.".to_string(),
    ));
    h.assistant
        .initiate_search(TeamId(1), GameId(10))
        .await
        .unwrap();

    let report = h.assistant.describe_searches(TeamId(1)).await.unwrap();
    assert_eq!(report.team_name, "Irish");
    assert_eq!(report.searches.len(), 1);

    let search_report = &report.searches[0];
    assert_eq!(search_report.game_id, GameId(10));
    assert_eq!(search_report.candidates.len(), 3);

    // the contacted candidate has the outreach in their transcript,
    // without the priming entry
    let daryl = &search_report.candidates[0];
    assert_eq!(daryl.name, "Daryl");
    assert_eq!(daryl.status, CandidateStatus::Unknown);
    assert!(daryl
        .messages
        .iter()
        .any(|m| m.text.contains("net's open")));
    assert!(!daryl.messages.iter().any(|m| m.text.contains("assistant captain of")));

    // untouched candidates appear with empty transcripts
    assert!(search_report.candidates[2].messages.is_empty());

    // other teams report empty
    let other = h.assistant.describe_searches(TeamId(9)).await.unwrap();
    assert_eq!(other.team_name, "Unknown");
    assert!(other.searches.is_empty());
}

#[tokio::test]
async fn shared_handle_serializes_access() {
    let h = default_harness();
    h.oracle.push(netminder_oracle::ScriptedReply::Text(
        "You in Friday?".to_string(),
    ));

    let shared = SharedAssistant::new(h.assistant);
    let clone = shared.clone();

    clone
        .initiate_search(TeamId(1), GameId(10))
        .await
        .unwrap();

    let report = shared.describe_searches(TeamId(1)).await.unwrap();
    assert_eq!(report.searches.len(), 1);
    assert!(shared.has_conversation(&ContactAddress::new(GOALIE_A)).await);
}

#[tokio::test]
async fn resting_conversations_expire_but_recruitment_does_not() {
    let mut config = AssistantConfig::default();
    config.conversation_ttl_days = 0; // evict resting chats on the next message

    let mut h = harness(three_goalie_roster(), config);
    let script = h.oracle.clone();

    script.push(netminder_oracle::ScriptedReply::Label("chat".to_string()));
    script.push(netminder_oracle::ScriptedReply::Text("Not bad, eh?".to_string()));
    h.assistant.receive(CAPTAIN, "how's the team lookin").await.unwrap();
    assert!(h
        .assistant
        .conversation(&ContactAddress::new(CAPTAIN))
        .is_some());

    // an active recruitment conversation survives the same purge
    script.push(netminder_oracle::ScriptedReply::Text("Daryl, you in?".to_string()));
    h.assistant
        .initiate_search(TeamId(1), GameId(10))
        .await
        .unwrap();

    script.push(netminder_oracle::ScriptedReply::Label("chat".to_string()));
    script.push(netminder_oracle::ScriptedReply::Text("Ha, for sure.".to_string()));
    h.assistant.receive(CAPTAIN, "lol").await.unwrap();

    // the captain's earlier exchange was evicted and re-created fresh
    let conv = h
        .assistant
        .conversation(&ContactAddress::new(CAPTAIN))
        .expect("captain conversation recreated");
    assert!(!conv
        .transcript()
        .iter()
        .any(|m| m.text.contains("how's the team lookin")));

    // the candidate's recruitment conversation is untouched
    let daryl = h
        .assistant
        .conversation(&ContactAddress::new(GOALIE_A))
        .expect("recruitment conversation kept");
    assert_eq!(daryl.goal(), Goal::SecureGoalie);
}
