//! Room aggregate: players, host succession and match bookkeeping.
//!
//! Every mutation here is pure so the repository can re-run it after losing a
//! compare-and-swap race without side effects leaking from the first attempt.

use std::{
    fmt,
    str::FromStr,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::dao::storage::StorageError;

/// Lowest capacity accepted for a room.
pub const MIN_PLAYERS: u32 = 2;
/// Highest capacity accepted for a room.
pub const MAX_PLAYERS: u32 = 12;
/// Length of generated room codes.
pub const ROOM_CODE_LENGTH: usize = 6;

/// Question difficulty chosen by a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Beginner level questions.
    #[serde(alias = "baby")]
    Easy,
    /// Intermediate questions.
    #[serde(alias = "conocedor")]
    Medium,
    /// Expert level questions.
    #[serde(alias = "killer")]
    Hard,
}

impl Difficulty {
    /// Stable lowercase tag used in prompts, ids and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" | "baby" => Ok(Difficulty::Easy),
            "medium" | "conocedor" => Ok(Difficulty::Medium),
            "hard" | "killer" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty `{other}`")),
        }
    }
}

/// Lifecycle of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RoomStatus {
    /// Filling up and configuring.
    Waiting,
    /// A match has been started by the host.
    InProgress,
    /// Every participant of the current round reported a result.
    Finished,
}

/// Member of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Identity from the authentication provider.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Exactly one member of a non-empty room hosts it.
    pub is_host: bool,
    /// Topic the player contributes to the match.
    pub topic: Option<String>,
    /// Preferred difficulty.
    pub difficulty: Option<Difficulty>,
}

impl Player {
    /// Build a non-host player, dropping blank topics.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        topic: Option<String>,
        difficulty: Option<Difficulty>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_host: false,
            topic: normalize_topic(topic),
            difficulty,
        }
    }

    /// A player is configured once both a topic and a difficulty are set.
    pub fn configured(&self) -> bool {
        self.topic.is_some() && self.difficulty.is_some()
    }
}

/// Joinable match lobby identified by a short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Six uppercase alphanumerics.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Capacity fixed at creation.
    pub max_players: u32,
    /// Lifecycle status.
    pub status: RoomStatus,
    /// Creation time, millisecond precision.
    pub created_at: SystemTime,
    /// Members in join order; index 0 inherits host status.
    pub players: Vec<Player>,
    /// Bumped on every persisted write; compare-and-swap token.
    pub version: u64,
    /// Match counter; results are scoped to `(code, round)`.
    pub round: u32,
    /// Whether the ranking of `round` has already been fanned out.
    pub ranking_published: bool,
}

/// Domain failures raised by room and match operations.
#[derive(Debug, Error)]
pub enum RoomError {
    /// No room is stored under the code.
    #[error("room `{0}` not found")]
    RoomNotFound(String),
    /// The room reached its capacity.
    #[error("room `{code}` is full ({max_players} players)")]
    RoomFull {
        /// Room that rejected the join.
        code: String,
        /// Its capacity.
        max_players: u32,
    },
    /// The player is already a member.
    #[error("player `{0}` is already in the room")]
    PlayerAlreadyInRoom(String),
    /// The player is not a member.
    #[error("player `{0}` is not in the room")]
    PlayerNotInRoom(String),
    /// Only the host may perform the operation.
    #[error("player `{0}` is not the host of the room")]
    NotHost(String),
    /// Compare-and-swap kept failing.
    #[error("room `{0}` was modified concurrently; retry the request")]
    ConcurrentModification(String),
    /// Every generated code collided with an existing room.
    #[error("could not allocate a free room code after {0} attempt(s)")]
    CodeSpaceExhausted(u32),
    /// Underlying store failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl RoomError {
    /// Stable identifier surfaced to clients so they can branch on the failure.
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            RoomError::RoomFull { .. } => "ROOM_FULL",
            RoomError::PlayerAlreadyInRoom(_) => "ALREADY_IN_ROOM",
            RoomError::PlayerNotInRoom(_) => "PLAYER_NOT_IN_ROOM",
            RoomError::NotHost(_) => "NOT_HOST",
            RoomError::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            RoomError::CodeSpaceExhausted(_) => "ROOM_CODE_EXHAUSTED",
            RoomError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

/// What remains after a player left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// Other players remain; `new_host` is set when host status moved.
    Remaining {
        /// Id of the promoted player.
        new_host: Option<String>,
    },
    /// The last player left; the room must be deleted.
    Emptied,
}

impl Room {
    /// Create a waiting room whose single member is the host.
    ///
    /// `created_at` is cut to millisecond precision, the finest every store keeps.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        max_players: u32,
        mut host: Player,
        created_at: SystemTime,
    ) -> Self {
        host.is_host = true;
        Self {
            code: code.into(),
            name: name.into(),
            max_players,
            status: RoomStatus::Waiting,
            created_at: millis_precision(created_at),
            players: vec![host],
            version: 0,
            round: 0,
            ranking_published: false,
        }
    }

    /// Look up a member by id.
    pub fn player(&self, user_id: &str) -> Option<&Player> {
        self.players.iter().find(|player| player.id == user_id)
    }

    /// Current host, if the room is non-empty.
    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|player| player.is_host)
    }

    /// Append a player after checking capacity and uniqueness.
    pub fn add_player(&mut self, mut player: Player) -> Result<(), RoomError> {
        if self.player(&player.id).is_some() {
            return Err(RoomError::PlayerAlreadyInRoom(player.id));
        }
        if self.players.len() >= self.max_players as usize {
            return Err(RoomError::RoomFull {
                code: self.code.clone(),
                max_players: self.max_players,
            });
        }
        player.is_host = false;
        self.players.push(player);
        Ok(())
    }

    /// Remove a player, handing host status to the player now at index 0.
    pub fn remove_player(&mut self, user_id: &str) -> Result<Departure, RoomError> {
        let index = self
            .players
            .iter()
            .position(|player| player.id == user_id)
            .ok_or_else(|| RoomError::PlayerNotInRoom(user_id.to_owned()))?;

        let removed = self.players.remove(index);
        let Some(first) = self.players.first_mut() else {
            return Ok(Departure::Emptied);
        };

        if removed.is_host {
            first.is_host = true;
            return Ok(Departure::Remaining {
                new_host: Some(first.id.clone()),
            });
        }
        Ok(Departure::Remaining { new_host: None })
    }

    /// Store a player's topic and difficulty.
    pub fn configure_player(
        &mut self,
        user_id: &str,
        topic: Option<String>,
        difficulty: Option<Difficulty>,
    ) -> Result<&Player, RoomError> {
        let player = self
            .players
            .iter_mut()
            .find(|player| player.id == user_id)
            .ok_or_else(|| RoomError::PlayerNotInRoom(user_id.to_owned()))?;
        player.topic = normalize_topic(topic);
        player.difficulty = difficulty;
        Ok(player)
    }

    /// Open a new round on behalf of the host.
    pub fn start_match(&mut self, user_id: &str) -> Result<(), RoomError> {
        let player = self
            .player(user_id)
            .ok_or_else(|| RoomError::PlayerNotInRoom(user_id.to_owned()))?;
        if !player.is_host {
            return Err(RoomError::NotHost(user_id.to_owned()));
        }
        self.status = RoomStatus::InProgress;
        self.round += 1;
        self.ranking_published = false;
        Ok(())
    }

    /// Flag the ranking of `round` as published and finish the room.
    ///
    /// Returns `false` when it was already published or another round started since.
    pub fn claim_ranking(&mut self, round: u32) -> bool {
        if self.round != round || self.ranking_published {
            return false;
        }
        self.ranking_published = true;
        self.status = RoomStatus::Finished;
        true
    }

    /// Union of configured topics in join order, deduplicated case-insensitively.
    pub fn match_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = Vec::new();
        for topic in self.players.iter().filter_map(|player| player.topic.as_ref()) {
            if !topics.iter().any(|known| known.eq_ignore_ascii_case(topic)) {
                topics.push(topic.clone());
            }
        }
        topics
    }

    /// Host's difficulty, else the most common configured one, else medium.
    pub fn match_difficulty(&self) -> Difficulty {
        if let Some(difficulty) = self.host().and_then(|host| host.difficulty) {
            return difficulty;
        }
        [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
            .into_iter()
            .map(|candidate| {
                let votes = self
                    .players
                    .iter()
                    .filter(|player| player.difficulty == Some(candidate))
                    .count();
                (candidate, votes)
            })
            .filter(|(_, votes)| *votes > 0)
            .max_by_key(|(_, votes)| *votes)
            .map(|(difficulty, _)| difficulty)
            .unwrap_or(Difficulty::Medium)
    }

    /// Number of results required before the ranking can be computed.
    pub fn expected_players(&self) -> usize {
        self.players.len().max(1)
    }
}

/// Drop sub-millisecond digits so a timestamp survives every store unchanged.
pub fn millis_precision(at: SystemTime) -> SystemTime {
    match at.duration_since(UNIX_EPOCH) {
        Ok(since) => UNIX_EPOCH + Duration::from_millis(since.as_millis() as u64),
        Err(before) => UNIX_EPOCH - Duration::from_millis(before.duration().as_millis() as u64),
    }
}

fn normalize_topic(topic: Option<String>) -> Option<String> {
    topic
        .map(|value| value.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> Player {
        Player::new("u1", "Ana", Some("space".into()), Some(Difficulty::Easy))
    }

    fn room(max_players: u32) -> Room {
        Room::new("ABC123", "Friday quiz", max_players, host(), SystemTime::now())
    }

    fn hosts(room: &Room) -> usize {
        room.players.iter().filter(|player| player.is_host).count()
    }

    #[test]
    fn new_room_has_single_host() {
        let room = room(4);
        assert_eq!(room.players.len(), 1);
        assert!(room.players[0].is_host);
        assert!(room.players[0].configured());
        assert_eq!(room.status, RoomStatus::Waiting);
    }

    #[test]
    fn sequential_joins_never_exceed_capacity() {
        for capacity in MIN_PLAYERS..=MAX_PLAYERS {
            let mut room = room(capacity);
            for index in 0..(capacity * 2) {
                let _ = room.add_player(Player::new(format!("p{index}"), "x", None, None));
                assert!(room.players.len() <= capacity as usize);
                assert_eq!(hosts(&room), 1);
            }
            assert_eq!(room.players.len(), capacity as usize);
        }
    }

    #[test]
    fn joining_full_room_is_rejected() {
        let mut room = room(2);
        room.add_player(Player::new("u2", "Bo", None, None)).unwrap();
        let err = room
            .add_player(Player::new("u3", "Cy", None, None))
            .unwrap_err();
        assert!(matches!(err, RoomError::RoomFull { max_players: 2, .. }));
    }

    #[test]
    fn duplicate_join_leaves_room_unchanged() {
        let mut room = room(4);
        let before = room.clone();
        let err = room
            .add_player(Player::new("u1", "Impostor", None, None))
            .unwrap_err();
        assert!(matches!(err, RoomError::PlayerAlreadyInRoom(id) if id == "u1"));
        assert_eq!(room, before);
    }

    #[test]
    fn joining_player_never_becomes_host() {
        let mut room = room(4);
        let mut sneaky = Player::new("u2", "Bo", None, None);
        sneaky.is_host = true;
        room.add_player(sneaky).unwrap();
        assert_eq!(hosts(&room), 1);
        assert!(!room.players[1].is_host);
    }

    #[test]
    fn host_departure_promotes_index_zero() {
        let mut room = room(4);
        room.add_player(Player::new("u2", "Bo", None, None)).unwrap();
        room.add_player(Player::new("u3", "Cy", None, None)).unwrap();

        let departure = room.remove_player("u1").unwrap();

        assert_eq!(
            departure,
            Departure::Remaining {
                new_host: Some("u2".into())
            }
        );
        assert!(room.players[0].is_host);
        assert_eq!(room.players[0].id, "u2");
        assert_eq!(hosts(&room), 1);
    }

    #[test]
    fn guest_departure_keeps_host() {
        let mut room = room(4);
        room.add_player(Player::new("u2", "Bo", None, None)).unwrap();
        let departure = room.remove_player("u2").unwrap();
        assert_eq!(departure, Departure::Remaining { new_host: None });
        assert_eq!(room.host().map(|host| host.id.as_str()), Some("u1"));
    }

    #[test]
    fn last_departure_empties_room() {
        let mut room = room(4);
        assert_eq!(room.remove_player("u1").unwrap(), Departure::Emptied);
        assert!(room.players.is_empty());
    }

    #[test]
    fn leaving_unknown_player_fails() {
        let mut room = room(4);
        assert!(matches!(
            room.remove_player("ghost"),
            Err(RoomError::PlayerNotInRoom(_))
        ));
    }

    #[test]
    fn configured_requires_topic_and_difficulty() {
        let mut room = room(4);
        room.add_player(Player::new("u2", "Bo", None, None)).unwrap();

        let player = room
            .configure_player("u2", Some("rock music".into()), None)
            .unwrap();
        assert!(!player.configured());

        let player = room
            .configure_player("u2", Some("   ".into()), Some(Difficulty::Hard))
            .unwrap();
        assert!(!player.configured());

        let player = room
            .configure_player("u2", Some(" rock   music ".into()), Some(Difficulty::Hard))
            .unwrap();
        assert!(player.configured());
        assert_eq!(player.topic.as_deref(), Some("rock music"));
    }

    #[test]
    fn only_host_starts_match() {
        let mut room = room(4);
        room.add_player(Player::new("u2", "Bo", None, None)).unwrap();

        assert!(matches!(room.start_match("u2"), Err(RoomError::NotHost(_))));
        room.ranking_published = true;
        room.start_match("u1").unwrap();
        assert_eq!(room.status, RoomStatus::InProgress);
        assert_eq!(room.round, 1);
        assert!(!room.ranking_published);
    }

    #[test]
    fn ranking_claim_is_single_shot_per_round() {
        let mut room = room(4);
        room.start_match("u1").unwrap();
        assert!(!room.claim_ranking(0));
        assert!(room.claim_ranking(1));
        assert!(!room.claim_ranking(1));
        assert_eq!(room.status, RoomStatus::Finished);
    }

    #[test]
    fn match_topics_are_deduplicated_in_join_order() {
        let mut room = room(4);
        room.add_player(Player::new("u2", "Bo", Some("History".into()), None))
            .unwrap();
        room.add_player(Player::new("u3", "Cy", Some("SPACE".into()), None))
            .unwrap();
        assert_eq!(room.match_topics(), vec!["space", "History"]);
    }

    #[test]
    fn match_difficulty_prefers_host_then_majority() {
        let mut room = room(4);
        room.add_player(Player::new("u2", "Bo", None, Some(Difficulty::Hard)))
            .unwrap();
        room.add_player(Player::new("u3", "Cy", None, Some(Difficulty::Hard)))
            .unwrap();
        assert_eq!(room.match_difficulty(), Difficulty::Easy);

        room.configure_player("u1", Some("space".into()), None).unwrap();
        assert_eq!(room.match_difficulty(), Difficulty::Hard);
    }

    #[test]
    fn creation_time_keeps_whole_milliseconds() {
        let at = UNIX_EPOCH + Duration::from_nanos(1_700_000_000_123_456_789);
        let room = Room::new("ABC123", "Friday quiz", 4, host(), at);
        assert_eq!(
            room.created_at,
            UNIX_EPOCH + Duration::from_millis(1_700_000_000_123)
        );
    }

    #[test]
    fn legacy_difficulty_tags_parse() {
        assert_eq!("baby".parse::<Difficulty>(), Ok(Difficulty::Easy));
        assert_eq!("Conocedor".parse::<Difficulty>(), Ok(Difficulty::Medium));
        assert_eq!("killer".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("nightmare".parse::<Difficulty>().is_err());

        let parsed: Difficulty = serde_json::from_str("\"killer\"").unwrap();
        assert_eq!(parsed, Difficulty::Hard);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"hard\"");
    }
}
