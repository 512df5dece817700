#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{MatchResultEntity, RoomEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for rooms and match results.
///
/// Writes that can race are conditional: they report `false` instead of
/// overwriting when the stored state is not the one the caller expects.
pub trait RoomStore: Send + Sync {
    /// Insert a new room; `false` when the code is already taken.
    fn insert_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<bool>>;
    /// Fetch a room by code.
    fn find_room(&self, code: String) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;
    /// Replace a room only if its stored version equals `expected_version`.
    fn replace_room(
        &self,
        room: RoomEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Delete a room only if its stored version equals `expected_version`.
    fn delete_room(
        &self,
        code: String,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Append a match result; `false` when one already exists for the same key.
    fn insert_result(&self, result: MatchResultEntity) -> BoxFuture<'static, StorageResult<bool>>;
    /// Results of one round of a room, in arrival order.
    fn list_room_results(
        &self,
        code: String,
        round: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchResultEntity>>>;
    /// Every stored result.
    fn list_results(&self) -> BoxFuture<'static, StorageResult<Vec<MatchResultEntity>>>;
    /// Cheap connectivity probe.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
