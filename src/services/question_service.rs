use std::time::{SystemTime, UNIX_EPOCH};

use futures::future::try_join_all;
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::{
    dto::questions::{GenerateQuestionsRequest, GenerateQuestionsResponse, QuestionView},
    error::ServiceError,
    question_supply::Question,
    services::room_service::normalize_room_code,
    state::{
        SharedState,
        room::{Difficulty, Room, RoomError},
    },
};

/// Build the shared question set of a match from every topic proposed by the room.
///
/// Topics are requested concurrently; any upstream failure fails the whole set.
pub async fn generate_questions(
    state: &SharedState,
    request: GenerateQuestionsRequest,
) -> Result<GenerateQuestionsResponse, ServiceError> {
    let room_code = normalize_room_code(&request.room_code)?;
    let topics = split_topics(&request.topics)?;
    let total = state.config().questions_per_match as usize;
    let per_topic = questions_per_topic(total, topics.len());

    let room = state
        .rooms()
        .await?
        .get_room(&room_code)
        .await?
        .ok_or_else(|| RoomError::RoomNotFound(room_code.clone()))?;

    let supply = state.question_supply();
    let batches = try_join_all(
        topics
            .iter()
            .map(|topic| supply.generate(topic.clone(), request.difficulty, per_topic)),
    )
    .await
    .inspect_err(|err| warn!(room = %room_code, error = %err, "question generation failed"))?;

    let mut questions = assemble_questions(&room, &topics, request.difficulty, batches);
    questions.truncate(total);
    questions.shuffle(&mut rand::rng());

    info!(
        room = %room_code,
        topics = topics.len(),
        questions = questions.len(),
        "generated match questions"
    );

    Ok(GenerateQuestionsResponse {
        success: true,
        questions,
        session_id: session_id(&room_code, SystemTime::now()),
        topics,
        questions_per_topic: per_topic,
    })
}

/// Split a comma separated list, trimming blanks and case-insensitive duplicates.
fn split_topics(raw: &str) -> Result<Vec<String>, ServiceError> {
    let mut topics: Vec<String> = Vec::new();
    for topic in raw.split(',') {
        let topic = topic.split_whitespace().collect::<Vec<_>>().join(" ");
        if topic.is_empty() || topics.iter().any(|known| known.eq_ignore_ascii_case(&topic)) {
            continue;
        }
        topics.push(topic);
    }
    if topics.is_empty() {
        return Err(ServiceError::InvalidInput("at least one topic is required".into()));
    }
    Ok(topics)
}

fn questions_per_topic(total: usize, topic_count: usize) -> usize {
    total.div_ceil(topic_count.max(1))
}

fn assemble_questions(
    room: &Room,
    topics: &[String],
    difficulty: Difficulty,
    batches: Vec<Vec<Question>>,
) -> Vec<QuestionView> {
    topics
        .iter()
        .zip(batches)
        .enumerate()
        .flat_map(|(index, (topic, batch))| {
            let contributed_by = contributor(room, topic, index);
            let id_prefix = topic.split_whitespace().collect::<Vec<_>>().join("_");
            batch
                .into_iter()
                .enumerate()
                .map(move |(position, question)| QuestionView {
                    id: format!("{id_prefix}_{position}"),
                    text: question.text,
                    options: question.options,
                    correct_index: question.correct_index,
                    topic: topic.clone(),
                    difficulty,
                    contributed_by: contributed_by.clone(),
                })
        })
        .collect()
}

/// Name of the member who configured `topic`, else a positional placeholder.
fn contributor(room: &Room, topic: &str, index: usize) -> String {
    room.players
        .iter()
        .find(|player| {
            player
                .topic
                .as_deref()
                .is_some_and(|own| own.eq_ignore_ascii_case(topic))
        })
        .map(|player| player.name.clone())
        .unwrap_or_else(|| format!("Player {}", index + 1))
}

fn session_id(room_code: &str, now: SystemTime) -> String {
    let millis = now
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    format!("game_{room_code}_{millis}")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::state::room::Player;

    fn question(text: &str) -> Question {
        Question {
            text: text.into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: 2,
        }
    }

    #[test]
    fn topics_are_trimmed_and_deduplicated() {
        let topics = split_topics(" space ,Rock   music,, SPACE ,history").unwrap();
        assert_eq!(topics, vec!["space", "Rock music", "history"]);
        assert!(matches!(
            split_topics(" , ,"),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn questions_are_spread_across_topics_rounding_up() {
        assert_eq!(questions_per_topic(5, 2), 3);
        assert_eq!(questions_per_topic(5, 5), 1);
        assert_eq!(questions_per_topic(5, 1), 5);
        assert_eq!(questions_per_topic(5, 0), 5);
    }

    #[test]
    fn questions_carry_topic_ids_and_contributors() {
        let mut room = Room::new(
            "ABC123",
            "Quiz",
            4,
            Player::new("u1", "Ada", Some("rock music".into()), None),
            SystemTime::UNIX_EPOCH,
        );
        room.add_player(Player::new("u2", "Bob", None, None)).unwrap();

        let topics = vec!["Rock music".to_owned(), "space".to_owned()];
        let views = assemble_questions(
            &room,
            &topics,
            Difficulty::Hard,
            vec![vec![question("q1"), question("q2")], vec![question("q3")]],
        );

        let summary: Vec<(&str, &str)> = views
            .iter()
            .map(|view| (view.id.as_str(), view.contributed_by.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Rock_music_0", "Ada"),
                ("Rock_music_1", "Ada"),
                ("space_0", "Player 2"),
            ]
        );
        assert!(views.iter().all(|view| view.difficulty == Difficulty::Hard));
    }

    #[test]
    fn session_ids_embed_room_and_millis() {
        let now = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        assert_eq!(session_id("ABC123", now), "game_ABC123_1700000000123");
    }
}
