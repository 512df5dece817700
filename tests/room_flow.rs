use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use axum::extract::ws::Message;
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use uuid::Uuid;

use trivia_rooms_back::{
    config::AppConfig,
    dao::room_store::memory::MemoryRoomStore,
    dto::{
        match_result::{SubmitResultRequest, SubmitResultResponse},
        questions::GenerateQuestionsRequest,
        room::{ConfigurePlayerRequest, CreateRoomRequest, PlayerInput},
    },
    error::{AppError, ServiceError},
    question_supply::{Question, QuestionSupply, QuestionSupplyError},
    services::{match_service, question_service, room_service},
    state::{
        AppState, SharedState,
        channels::RoomMember,
        room::{Difficulty, RoomError},
    },
};

/// Answers every topic with numbered questions, or fails when asked to.
struct CannedSupply {
    fail: bool,
    calls: AtomicUsize,
}

impl QuestionSupply for CannedSupply {
    fn generate(
        &self,
        topic: String,
        _difficulty: Difficulty,
        count: usize,
    ) -> BoxFuture<'static, Result<Vec<Question>, QuestionSupplyError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fail = self.fail;
        Box::pin(async move {
            if fail {
                return Err(QuestionSupplyError::Malformed("no questions".into()));
            }
            Ok((0..count)
                .map(|index| Question {
                    text: format!("{topic} #{index}"),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_index: 1,
                })
                .collect())
        })
    }
}

fn state_with(fail: bool) -> (SharedState, Arc<CannedSupply>) {
    let supply = Arc::new(CannedSupply {
        fail,
        calls: AtomicUsize::new(0),
    });
    let state = AppState::with_store(
        AppConfig::default(),
        supply.clone(),
        Arc::new(MemoryRoomStore::new()),
    );
    (state, supply)
}

fn player(id: &str, name: &str) -> PlayerInput {
    PlayerInput {
        id: id.into(),
        name: name.into(),
        topic: None,
        difficulty: None,
    }
}

async fn open_room(state: &SharedState, members: &[(&str, &str)]) -> String {
    let (host_id, host_name) = members[0];
    let created = room_service::create_room(
        state,
        CreateRoomRequest {
            name: "Friday quiz".into(),
            max_players: 4,
            host: player(host_id, host_name),
        },
    )
    .await
    .unwrap();
    for (id, name) in &members[1..] {
        room_service::join_room(state, &created.room_code, player(id, name))
            .await
            .unwrap();
    }
    created.room_code
}

fn subscribe(state: &SharedState, code: &str, user: &str) -> mpsc::UnboundedReceiver<Message> {
    let (tx, rx) = mpsc::unbounded_channel();
    state.channels().join(
        code,
        RoomMember {
            user_id: user.into(),
            connection_id: Uuid::new_v4(),
            tx,
        },
    );
    rx
}

fn events(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<serde_json::Value> {
    let mut received = Vec::new();
    while let Ok(Message::Text(text)) = rx.try_recv() {
        received.push(serde_json::from_str(text.as_str()).unwrap());
    }
    received
}

fn submission(code: &str, user: &str, score: u32, elapsed: u32) -> SubmitResultRequest {
    SubmitResultRequest {
        room_code: code.into(),
        user_id: user.into(),
        username: user.to_uppercase(),
        score,
        elapsed_seconds: elapsed,
        topic: Some("space".into()),
        difficulty: Some(Difficulty::Medium),
    }
}

#[tokio::test]
async fn last_submission_completes_round_and_notifies_room_once() {
    let (state, _) = state_with(false);
    let code = open_room(&state, &[("a", "Ada"), ("b", "Bob"), ("c", "Cy")]).await;
    room_service::start_match(&state, &code, "a").await.unwrap();
    let mut bob = subscribe(&state, &code, "b");

    let first = match_service::submit_result(&state, submission(&code, "a", 3, 40))
        .await
        .unwrap();
    let SubmitResultResponse::Waiting(waiting) = first else {
        panic!("first submission should wait");
    };
    assert_eq!((waiting.players_finished, waiting.total_players), (1, 3));

    match_service::submit_result(&state, submission(&code, "b", 3, 20))
        .await
        .unwrap();
    let last = match_service::submit_result(&state, submission(&code, "c", 5, 100))
        .await
        .unwrap();
    let SubmitResultResponse::Finished(finished) = last else {
        panic!("last submission should complete the round");
    };
    let order: Vec<(&str, u32)> = finished
        .ranking
        .iter()
        .map(|entry| (entry.user_id.as_str(), entry.rank))
        .collect();
    assert_eq!(order, vec![("c", 1), ("b", 2), ("a", 3)]);
    assert_eq!(finished.winner.user_id, "c");
    assert_eq!(finished.winner.percentage, 100);

    let retry = match_service::submit_result(&state, submission(&code, "a", 0, 1))
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_string(&retry).unwrap(),
        serde_json::to_string(&SubmitResultResponse::Finished(finished.clone())).unwrap()
    );

    let results: Vec<_> = events(&mut bob)
        .into_iter()
        .filter(|event| event["event"] == "game-results")
        .collect();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["data"], serde_json::to_value(&finished).unwrap());
}

#[tokio::test]
async fn finished_body_describes_the_room_not_the_submitter() {
    let (state, _) = state_with(false);
    let code = open_room(&state, &[("a", "Ada"), ("b", "Bob")]).await;
    room_service::configure_player(
        &state,
        &code,
        ConfigurePlayerRequest {
            user_id: "a".into(),
            topic: Some("history".into()),
            difficulty: Some(Difficulty::Hard),
        },
    )
    .await
    .unwrap();
    room_service::start_match(&state, &code, "a").await.unwrap();

    match_service::submit_result(&state, submission(&code, "a", 2, 30))
        .await
        .unwrap();
    let mut late = submission(&code, "b", 4, 30);
    late.topic = Some("cooking".into());
    late.difficulty = Some(Difficulty::Easy);
    let SubmitResultResponse::Finished(finished) =
        match_service::submit_result(&state, late).await.unwrap()
    else {
        panic!("last submission should complete the round");
    };

    assert_eq!(finished.topics, vec!["history"]);
    assert_eq!(finished.difficulty, Difficulty::Hard);
}

#[tokio::test]
async fn reported_players_who_left_still_count_in_the_total() {
    let (state, _) = state_with(false);
    let code = open_room(&state, &[("a", "Ada"), ("b", "Bob"), ("c", "Cy")]).await;
    room_service::start_match(&state, &code, "a").await.unwrap();

    match_service::submit_result(&state, submission(&code, "a", 1, 10))
        .await
        .unwrap();
    room_service::leave_room(&state, &code, "a").await.unwrap();
    match_service::submit_result(&state, submission(&code, "b", 2, 10))
        .await
        .unwrap();
    let SubmitResultResponse::Finished(finished) =
        match_service::submit_result(&state, submission(&code, "c", 3, 10))
            .await
            .unwrap()
    else {
        panic!("remaining members reported; the round should be complete");
    };

    assert_eq!(finished.ranking.len(), 3);
    assert_eq!(finished.total_players, 3);
}

#[tokio::test]
async fn room_events_reach_other_members() {
    let (state, _) = state_with(false);
    let code = open_room(&state, &[("a", "Ada")]).await;
    let mut ada = subscribe(&state, &code, "a");

    room_service::join_room(&state, &code, player("b", "Bob"))
        .await
        .unwrap();
    room_service::configure_player(
        &state,
        &code,
        ConfigurePlayerRequest {
            user_id: "b".into(),
            topic: Some("jazz".into()),
            difficulty: Some(Difficulty::Hard),
        },
    )
    .await
    .unwrap();
    let left = room_service::leave_room(&state, &code, "a").await.unwrap();
    assert_eq!(left.room.unwrap().players[0].id, "b");

    let names: Vec<String> = events(&mut ada)
        .into_iter()
        .map(|event| event["event"].as_str().unwrap_or_default().to_owned())
        .collect();
    assert_eq!(names, vec!["user-joined", "user-configured"]);
}

#[tokio::test]
async fn only_the_host_starts_a_match() {
    let (state, _) = state_with(false);
    let code = open_room(&state, &[("a", "Ada"), ("b", "Bob")]).await;

    let err = room_service::start_match(&state, &code, "b").await.unwrap_err();
    assert_eq!(AppError::from(err).code(), "NOT_HOST");

    let started = room_service::start_match(&state, &code, "a").await.unwrap();
    assert_eq!(started.round, 1);
    assert_eq!(started.difficulty, Difficulty::Medium);
}

#[tokio::test]
async fn questions_cover_every_topic_and_credit_contributors() {
    let (state, supply) = state_with(false);
    let code = open_room(&state, &[("a", "Ada"), ("b", "Bob")]).await;
    room_service::configure_player(
        &state,
        &code,
        ConfigurePlayerRequest {
            user_id: "b".into(),
            topic: Some("space".into()),
            difficulty: Some(Difficulty::Easy),
        },
    )
    .await
    .unwrap();

    let response = question_service::generate_questions(
        &state,
        GenerateQuestionsRequest {
            room_code: code.clone(),
            topics: "space, rock music, Space".into(),
            difficulty: Difficulty::Easy,
        },
    )
    .await
    .unwrap();

    assert_eq!(response.topics, vec!["space", "rock music"]);
    assert_eq!(response.questions_per_topic, 3);
    assert_eq!(response.questions.len(), 5);
    assert_eq!(supply.calls.load(Ordering::SeqCst), 2);
    assert!(response.session_id.starts_with(&format!("game_{code}_")));
    for question in &response.questions {
        let expected = if question.topic == "space" { "Bob" } else { "Player 2" };
        assert_eq!(question.contributed_by, expected);
        assert_eq!(question.options.len(), 4);
    }
}

#[tokio::test]
async fn supply_failures_surface_as_bad_gateway() {
    let (state, _) = state_with(true);
    let code = open_room(&state, &[("a", "Ada")]).await;

    let err = question_service::generate_questions(
        &state,
        GenerateQuestionsRequest {
            room_code: code,
            topics: "space".into(),
            difficulty: Difficulty::Hard,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Upstream(_)));
    assert_eq!(AppError::from(err).code(), "QUESTION_SUPPLY_FAILED");
}

#[tokio::test]
async fn degraded_state_rejects_room_operations() {
    let supply = Arc::new(CannedSupply {
        fail: false,
        calls: AtomicUsize::new(0),
    });
    let state = AppState::new(AppConfig::default(), supply);

    let err = room_service::get_room(&state, "ABC123").await.unwrap_err();
    assert!(matches!(err, ServiceError::Degraded));
}

#[tokio::test]
async fn unknown_rooms_are_not_found() {
    let (state, _) = state_with(false);
    let err = room_service::join_room(&state, "zzz999", player("a", "Ada"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Room(RoomError::RoomNotFound(_))));
}
