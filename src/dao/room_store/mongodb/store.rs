use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database, IndexModel,
    bson::doc,
    options::IndexOptions,
};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{MongoResultDocument, MongoRoomDocument, doc_id, versioned_doc_id},
};
use crate::dao::{
    models::{MatchResultEntity, RoomEntity},
    room_store::RoomStore,
    storage::StorageResult,
};

const ROOM_COLLECTION_NAME: &str = "rooms";
const RESULT_COLLECTION_NAME: &str = "match_results";

/// [`RoomStore`] backed by two MongoDB collections.
#[derive(Clone)]
pub struct MongoRoomStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let database =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        self.state.write().await.database = database;
        Ok(())
    }
}

impl MongoRoomStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.result_collection().await;
        let index = IndexModel::builder()
            .keys(doc! {"room_code": 1, "round": 1, "submitted_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("result_room_round_idx".to_owned()))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: RESULT_COLLECTION_NAME,
                index: "room_code,round,submitted_at",
                source,
            })?;

        Ok(())
    }

    async fn room_collection(&self) -> Collection<MongoRoomDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoRoomDocument>(ROOM_COLLECTION_NAME)
    }

    async fn result_collection(&self) -> Collection<MongoResultDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoResultDocument>(RESULT_COLLECTION_NAME)
    }

    async fn insert_room(&self, room: RoomEntity) -> MongoResult<bool> {
        let code = room.code.clone();
        let document: MongoRoomDocument = room.into();
        match self.room_collection().await.insert_one(&document).await {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(source) => Err(MongoDaoError::SaveRoom { code, source }),
        }
    }

    async fn find_room(&self, code: String) -> MongoResult<Option<RoomEntity>> {
        let document = self
            .room_collection()
            .await
            .find_one(doc_id(&code))
            .await
            .map_err(|source| MongoDaoError::LoadRoom {
                code: code.clone(),
                source,
            })?;

        document.map(RoomEntity::try_from).transpose()
    }

    async fn replace_room(&self, room: RoomEntity, expected_version: u64) -> MongoResult<bool> {
        let code = room.code.clone();
        let document: MongoRoomDocument = room.into();
        let result = self
            .room_collection()
            .await
            .replace_one(versioned_doc_id(&code, expected_version), &document)
            .await
            .map_err(|source| MongoDaoError::SaveRoom { code, source })?;

        Ok(result.matched_count == 1)
    }

    async fn delete_room(&self, code: String, expected_version: u64) -> MongoResult<bool> {
        let result = self
            .room_collection()
            .await
            .delete_one(versioned_doc_id(&code, expected_version))
            .await
            .map_err(|source| MongoDaoError::DeleteRoom { code, source })?;

        Ok(result.deleted_count == 1)
    }

    async fn insert_result(&self, result: MatchResultEntity) -> MongoResult<bool> {
        let document: MongoResultDocument = result.into();
        match self.result_collection().await.insert_one(&document).await {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(source) => Err(MongoDaoError::SaveResult {
                key: document.key().to_owned(),
                source,
            }),
        }
    }

    async fn list_results_matching(
        &self,
        filter: mongodb::bson::Document,
    ) -> MongoResult<Vec<MatchResultEntity>> {
        let documents: Vec<MongoResultDocument> = self
            .result_collection()
            .await
            .find(filter)
            .sort(doc! {"submitted_at": 1, "_id": 1})
            .await
            .map_err(|source| MongoDaoError::ListResults { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListResults { source })?;

        documents
            .into_iter()
            .map(MatchResultEntity::try_from)
            .collect()
    }
}

impl RoomStore for MongoRoomStore {
    fn insert_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.insert_room(room).await.map_err(Into::into) })
    }

    fn find_room(&self, code: String) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_room(code).await.map_err(Into::into) })
    }

    fn replace_room(
        &self,
        room: RoomEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace_room(room, expected_version)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_room(
        &self,
        code: String,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_room(code, expected_version)
                .await
                .map_err(Into::into)
        })
    }

    fn insert_result(&self, result: MatchResultEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.insert_result(result).await.map_err(Into::into) })
    }

    fn list_room_results(
        &self,
        code: String,
        round: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchResultEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_results_matching(doc! {"room_code": code, "round": i64::from(round)})
                .await
                .map_err(Into::into)
        })
    }

    fn list_results(&self) -> BoxFuture<'static, StorageResult<Vec<MatchResultEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_results_matching(doc! {}).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
