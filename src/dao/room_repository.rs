use std::{sync::Arc, time::SystemTime};

use rand::Rng;
use tracing::{debug, info, warn};

use crate::{
    dao::room_store::RoomStore,
    state::room::{Difficulty, Player, ROOM_CODE_LENGTH, Room, RoomError},
};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Read-modify-write attempts before giving up on a contended room.
pub const CAS_ATTEMPTS: u32 = 3;

type CodeGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Room operations enforcing capacity, uniqueness and host invariants.
///
/// Every mutation re-reads the room, applies a pure change and writes it back
/// conditionally on the version it read.
#[derive(Clone)]
pub struct RoomRepository {
    store: Arc<dyn RoomStore>,
    code_attempts: u32,
    generate_code: CodeGenerator,
}

impl RoomRepository {
    /// Build a repository allocating codes at random, trying at most `code_attempts` codes.
    pub fn new(store: Arc<dyn RoomStore>, code_attempts: u32) -> Self {
        Self {
            store,
            code_attempts: code_attempts.max(1),
            generate_code: Arc::new(random_room_code),
        }
    }

    /// Replace the code generator, mostly to force collisions in tests.
    pub fn with_code_generator<F>(mut self, generate: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.generate_code = Arc::new(generate);
        self
    }

    /// Persist a new waiting room hosted by `host`.
    pub async fn create_room(
        &self,
        name: String,
        max_players: u32,
        host: Player,
    ) -> Result<Room, RoomError> {
        let created_at = SystemTime::now();
        for attempt in 1..=self.code_attempts {
            let code = (self.generate_code)();
            let room = Room::new(code, name.clone(), max_players, host.clone(), created_at);
            if self.store.insert_room(room.clone().into()).await? {
                info!(room = %room.code, host = %host.id, max_players, "room created");
                return Ok(room);
            }
            debug!(room = %room.code, attempt, "room code collision; drawing a new code");
        }
        warn!(attempts = self.code_attempts, "room code space exhausted");
        Err(RoomError::CodeSpaceExhausted(self.code_attempts))
    }

    /// Fetch a room; a missing room is a normal outcome.
    pub async fn get_room(&self, code: &str) -> Result<Option<Room>, RoomError> {
        let room = self.store.find_room(code.to_owned()).await?;
        if room.is_none() {
            debug!(room = %code, "room lookup missed");
        }
        Ok(room.map(Into::into))
    }

    /// Append `player` to the room.
    pub async fn join_room(&self, code: &str, player: Player) -> Result<Room, RoomError> {
        let user_id = player.id.clone();
        let (room, ()) = self
            .update(code, |room| room.add_player(player.clone()))
            .await?;
        info!(room = %code, user = %user_id, players = room.players.len(), "player joined");
        Ok(room)
    }

    /// Remove a player. Returns `None` when the room was emptied and deleted.
    pub async fn leave_room(&self, code: &str, user_id: &str) -> Result<Option<Room>, RoomError> {
        let (room, departure) = self
            .update(code, |room| room.remove_player(user_id))
            .await?;
        info!(room = %code, user = %user_id, ?departure, "player left");
        Ok((!room.players.is_empty()).then_some(room))
    }

    /// Store the topic and difficulty of a member.
    pub async fn configure_player(
        &self,
        code: &str,
        user_id: &str,
        topic: Option<String>,
        difficulty: Option<Difficulty>,
    ) -> Result<Room, RoomError> {
        let (room, ()) = self
            .update(code, |room| {
                room.configure_player(user_id, topic.clone(), difficulty)
                    .map(|_| ())
            })
            .await?;
        debug!(room = %code, user = %user_id, "player configured");
        Ok(room)
    }

    /// Open a new round; only the host may do so.
    pub async fn start_match(&self, code: &str, user_id: &str) -> Result<Room, RoomError> {
        let (room, ()) = self
            .update(code, |room| room.start_match(user_id))
            .await?;
        info!(room = %code, round = room.round, "match started");
        Ok(room)
    }

    /// Mark the ranking of `round` as published. Exactly one caller per round gets `true`.
    pub async fn claim_ranking_publication(&self, code: &str, round: u32) -> Result<bool, RoomError> {
        let (_, claimed) = self
            .update(code, |room| Ok(room.claim_ranking(round)))
            .await?;
        Ok(claimed)
    }

    /// Compare-and-swap loop shared by every mutation.
    ///
    /// Unchanged rooms are not written back; emptied rooms are deleted.
    async fn update<T, F>(&self, code: &str, mut mutate: F) -> Result<(Room, T), RoomError>
    where
        F: FnMut(&mut Room) -> Result<T, RoomError>,
    {
        for attempt in 1..=CAS_ATTEMPTS {
            let Some(entity) = self.store.find_room(code.to_owned()).await? else {
                debug!(room = %code, "room not found");
                return Err(RoomError::RoomNotFound(code.to_owned()));
            };
            let current: Room = entity.into();
            let mut room = current.clone();
            let value = mutate(&mut room)?;

            if room == current {
                return Ok((room, value));
            }

            let written = if room.players.is_empty() {
                self.store.delete_room(code.to_owned(), current.version).await?
            } else {
                room.version = current.version + 1;
                self.store
                    .replace_room(room.clone().into(), current.version)
                    .await?
            };

            if written {
                return Ok((room, value));
            }
            debug!(room = %code, attempt, "room version conflict; retrying");
        }

        warn!(room = %code, attempts = CAS_ATTEMPTS, "giving up on contended room");
        Err(RoomError::ConcurrentModification(code.to_owned()))
    }
}

/// Draw a fresh uppercase alphanumeric room code.
pub fn random_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use futures::future::{BoxFuture, join_all};

    use super::*;
    use crate::dao::{
        models::{MatchResultEntity, RoomEntity},
        room_store::memory::MemoryRoomStore,
        storage::StorageResult,
    };
    use crate::state::room::RoomStatus;

    fn repository() -> RoomRepository {
        RoomRepository::new(Arc::new(MemoryRoomStore::new()), 5)
    }

    fn player(id: &str) -> Player {
        Player::new(id, id.to_uppercase(), None, None)
    }

    /// Delegates to memory but loses every conditional replace.
    struct ContendedStore {
        inner: MemoryRoomStore,
        replace_calls: Arc<AtomicU32>,
    }

    impl RoomStore for ContendedStore {
        fn insert_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.insert_room(room)
        }
        fn find_room(&self, code: String) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
            self.inner.find_room(code)
        }
        fn replace_room(&self, _: RoomEntity, _: u64) -> BoxFuture<'static, StorageResult<bool>> {
            self.replace_calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(false) })
        }
        fn delete_room(&self, code: String, v: u64) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.delete_room(code, v)
        }
        fn insert_result(&self, r: MatchResultEntity) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.insert_result(r)
        }
        fn list_room_results(
            &self,
            code: String,
            round: u32,
        ) -> BoxFuture<'static, StorageResult<Vec<MatchResultEntity>>> {
            self.inner.list_room_results(code, round)
        }
        fn list_results(&self) -> BoxFuture<'static, StorageResult<Vec<MatchResultEntity>>> {
            self.inner.list_results()
        }
        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }
        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.try_reconnect()
        }
    }

    #[test]
    fn random_codes_are_uppercase_alphanumeric() {
        for _ in 0..100 {
            let code = random_room_code();
            assert_eq!(code.len(), ROOM_CODE_LENGTH);
            assert!(
                code.chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            );
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_equal_room() {
        let repo = repository();
        let created = repo
            .create_room("Quiz night".into(), 4, player("u1"))
            .await
            .unwrap();
        let fetched = repo.get_room(&created.code).await.unwrap().unwrap();
        assert_eq!(created, fetched);
        assert_eq!(fetched.status, RoomStatus::Waiting);
        assert!(fetched.players[0].is_host);
    }

    #[tokio::test]
    async fn create_retries_on_code_collision() {
        let codes = Arc::new(AtomicU32::new(0));
        let counter = codes.clone();
        let repo = repository().with_code_generator(move || {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                "AAAAAA".into()
            } else {
                "BBBBBB".into()
            }
        });

        let first = repo.create_room("a".into(), 2, player("u1")).await.unwrap();
        let second = repo.create_room("b".into(), 2, player("u2")).await.unwrap();

        assert_eq!(first.code, "AAAAAA");
        assert_eq!(second.code, "BBBBBB");
        assert_eq!(codes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn create_fails_once_code_attempts_are_spent() {
        let repo = repository().with_code_generator(|| "AAAAAA".into());
        repo.create_room("a".into(), 2, player("u1")).await.unwrap();
        let err = repo
            .create_room("b".into(), 2, player("u2"))
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::CodeSpaceExhausted(5)));
    }

    #[tokio::test]
    async fn join_and_duplicate_join() {
        let repo = repository();
        let room = repo.create_room("r".into(), 3, player("u1")).await.unwrap();

        let joined = repo.join_room(&room.code, player("u2")).await.unwrap();
        assert_eq!(joined.players.len(), 2);
        assert_eq!(joined.version, 1);

        let err = repo.join_room(&room.code, player("u2")).await.unwrap_err();
        assert!(matches!(err, RoomError::PlayerAlreadyInRoom(_)));
        assert_eq!(repo.get_room(&room.code).await.unwrap().unwrap(), joined);
    }

    #[tokio::test]
    async fn join_unknown_room_fails() {
        let err = repository()
            .join_room("NOPE00", player("u1"))
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::RoomNotFound(code) if code == "NOPE00"));
    }

    #[tokio::test]
    async fn concurrent_joins_never_overfill() {
        let repo = repository();
        let room = repo.create_room("r".into(), 4, player("host")).await.unwrap();

        let joins = (0..10).map(|index| {
            let repo = repo.clone();
            let code = room.code.clone();
            async move { repo.join_room(&code, player(&format!("p{index}"))).await }
        });
        let outcomes = join_all(joins).await;
        let accepted = outcomes.iter().filter(|outcome| outcome.is_ok()).count();

        let stored = repo.get_room(&room.code).await.unwrap().unwrap();
        assert_eq!(stored.players.len(), accepted + 1);
        assert!(stored.players.len() <= 4);
        assert_eq!(stored.players.iter().filter(|p| p.is_host).count(), 1);
    }

    #[tokio::test]
    async fn last_leave_deletes_room() {
        let repo = repository();
        let room = repo.create_room("r".into(), 3, player("u1")).await.unwrap();
        repo.join_room(&room.code, player("u2")).await.unwrap();

        let remaining = repo.leave_room(&room.code, "u1").await.unwrap().unwrap();
        assert_eq!(remaining.players[0].id, "u2");
        assert!(remaining.players[0].is_host);

        assert!(repo.leave_room(&room.code, "u2").await.unwrap().is_none());
        assert!(repo.get_room(&room.code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn configure_requires_membership() {
        let repo = repository();
        let room = repo.create_room("r".into(), 3, player("u1")).await.unwrap();

        let err = repo
            .configure_player(&room.code, "ghost", Some("space".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::PlayerNotInRoom(_)));

        let updated = repo
            .configure_player(&room.code, "u1", Some("space".into()), Some(Difficulty::Hard))
            .await
            .unwrap();
        assert!(updated.players[0].configured());
    }

    #[tokio::test]
    async fn publication_is_claimed_once_per_round() {
        let repo = repository();
        let room = repo.create_room("r".into(), 3, player("u1")).await.unwrap();
        let started = repo.start_match(&room.code, "u1").await.unwrap();

        assert!(!repo.claim_ranking_publication(&room.code, 7).await.unwrap());
        assert!(repo.claim_ranking_publication(&room.code, started.round).await.unwrap());
        assert!(!repo.claim_ranking_publication(&room.code, started.round).await.unwrap());

        let finished = repo.get_room(&room.code).await.unwrap().unwrap();
        assert_eq!(finished.status, RoomStatus::Finished);

        let restarted = repo.start_match(&room.code, "u1").await.unwrap();
        assert_eq!(restarted.round, started.round + 1);
        assert!(repo.claim_ranking_publication(&room.code, restarted.round).await.unwrap());
    }

    #[tokio::test]
    async fn persistent_conflicts_surface_as_concurrent_modification() {
        let calls = Arc::new(AtomicU32::new(0));
        let store = ContendedStore {
            inner: MemoryRoomStore::new(),
            replace_calls: calls.clone(),
        };
        let repo = RoomRepository::new(Arc::new(store), 5);
        let room = repo.create_room("r".into(), 3, player("u1")).await.unwrap();

        let err = repo.join_room(&room.code, player("u2")).await.unwrap_err();
        assert!(matches!(err, RoomError::ConcurrentModification(_)));
        assert_eq!(calls.load(Ordering::SeqCst), CAS_ATTEMPTS);
    }
}
