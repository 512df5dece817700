//! Process-local store used by tests and single-node development setups.

use std::{collections::HashMap, sync::Arc};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::dao::{
    models::{MatchResultEntity, RoomEntity},
    room_store::RoomStore,
    storage::StorageResult,
};

/// In-memory [`RoomStore`]. Cloning shares the underlying data.
#[derive(Clone, Default)]
pub struct MemoryRoomStore {
    rooms: Arc<DashMap<String, RoomEntity>>,
    results: Arc<RwLock<ResultArena>>,
}

/// Append-only arena of results with a key index; arena order is arrival order.
#[derive(Default)]
struct ResultArena {
    entries: Vec<MatchResultEntity>,
    by_key: HashMap<String, usize>,
}

impl ResultArena {
    fn insert(&mut self, result: MatchResultEntity) -> bool {
        let key = result.key();
        if self.by_key.contains_key(&key) {
            return false;
        }
        self.by_key.insert(key, self.entries.len());
        self.entries.push(result);
        true
    }
}

impl MemoryRoomStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomStore for MemoryRoomStore {
    fn insert_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let rooms = self.rooms.clone();
        Box::pin(async move {
            match rooms.entry(room.code.clone()) {
                Entry::Occupied(_) => Ok(false),
                Entry::Vacant(slot) => {
                    slot.insert(room);
                    Ok(true)
                }
            }
        })
    }

    fn find_room(&self, code: String) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let rooms = self.rooms.clone();
        Box::pin(async move { Ok(rooms.get(&code).map(|entry| entry.value().clone())) })
    }

    fn replace_room(
        &self,
        room: RoomEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let rooms = self.rooms.clone();
        Box::pin(async move {
            match rooms.get_mut(&room.code) {
                Some(mut stored) if stored.version == expected_version => {
                    *stored = room;
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn delete_room(
        &self,
        code: String,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let rooms = self.rooms.clone();
        Box::pin(async move {
            Ok(rooms
                .remove_if(&code, |_, stored| stored.version == expected_version)
                .is_some())
        })
    }

    fn insert_result(&self, result: MatchResultEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let results = self.results.clone();
        Box::pin(async move { Ok(results.write().await.insert(result)) })
    }

    fn list_room_results(
        &self,
        code: String,
        round: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchResultEntity>>> {
        let results = self.results.clone();
        Box::pin(async move {
            let arena = results.read().await;
            Ok(arena
                .entries
                .iter()
                .filter(|result| result.room_code == code && result.round == round)
                .cloned()
                .collect())
        })
    }

    fn list_results(&self) -> BoxFuture<'static, StorageResult<Vec<MatchResultEntity>>> {
        let results = self.results.clone();
        Box::pin(async move { Ok(results.read().await.entries.clone()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
