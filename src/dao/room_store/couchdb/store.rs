use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;

use crate::dao::{
    models::{MatchResultEntity, RoomEntity},
    room_store::RoomStore,
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, CouchResultDocument, CouchRoomDocument, END_SUFFIX, RESULT_PREFIX,
        room_doc_id, round_results_prefix,
    },
};

/// Outcome of a document write that may lose a revision race.
enum WriteOutcome {
    Written,
    Conflict,
}

/// [`RoomStore`] speaking the CouchDB HTTP API; `_rev` provides the compare-and-swap.
#[derive(Clone)]
pub struct CouchRoomStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchRoomStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::HttpClient { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        self.with_auth(self.client.request(method, url))
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::Unreachable {
                path: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .with_auth(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::Unreachable {
                        path: database.clone(),
                        source,
                    })?;
                // 412: created concurrently by another instance.
                if create.status().is_success() || create.status() == StatusCode::PRECONDITION_FAILED
                {
                    Ok(())
                } else {
                    Err(CouchDaoError::UnexpectedStatus {
                        path: database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::UnexpectedStatus {
                path: database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::Unreachable {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::UndecodableBody {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::UnexpectedStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// PUT a document; a stale or missing `_rev` on an existing id yields [`WriteOutcome::Conflict`].
    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<WriteOutcome>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::Unreachable {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Ok(WriteOutcome::Conflict),
            status if status.is_success() => Ok(WriteOutcome::Written),
            other => Err(CouchDaoError::UnexpectedStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn delete_document(&self, doc_id: &str, rev: &str) -> CouchResult<WriteOutcome> {
        let response = self
            .request(Method::DELETE, doc_id)
            .query(&[("rev", rev)])
            .send()
            .await
            .map_err(|source| CouchDaoError::Unreachable {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT | StatusCode::NOT_FOUND => Ok(WriteOutcome::Conflict),
            status if status.is_success() => Ok(WriteOutcome::Written),
            other => Err(CouchDaoError::UnexpectedStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{}\"", prefix)),
            ("endkey", format!("\"{}{}\"", prefix, END_SUFFIX)),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::Unreachable {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::UnexpectedStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::UndecodableBody {
                path: ALL_DOCS.to_string(),
                source,
            }
        })?;

        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc)
            .map(|doc| {
                from_value(doc).map_err(|source| CouchDaoError::InvalidDocument {
                    path: ALL_DOCS.to_string(),
                    source,
                })
            })
            .collect()
    }

    async fn list_results_with_prefix(&self, prefix: &str) -> CouchResult<Vec<MatchResultEntity>> {
        let mut results: Vec<MatchResultEntity> = self
            .list_documents::<CouchResultDocument>(prefix)
            .await?
            .into_iter()
            .map(|doc| doc.result)
            .collect();
        // _all_docs is ordered by id; arrival order is what callers expect.
        results.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(results)
    }

    async fn replace_room(&self, room: RoomEntity, expected_version: u64) -> CouchResult<bool> {
        let doc_id = room_doc_id(&room.code);
        let Some(existing) = self.get_document::<CouchRoomDocument>(&doc_id).await? else {
            return Ok(false);
        };
        if existing.room.version != expected_version {
            return Ok(false);
        }
        let document = CouchRoomDocument::from_entity(room, existing.rev);
        Ok(matches!(
            self.put_document(&doc_id, &document).await?,
            WriteOutcome::Written
        ))
    }

    async fn delete_room(&self, code: &str, expected_version: u64) -> CouchResult<bool> {
        let doc_id = room_doc_id(code);
        let Some(existing) = self.get_document::<CouchRoomDocument>(&doc_id).await? else {
            return Ok(false);
        };
        if existing.room.version != expected_version {
            return Ok(false);
        }
        let Some(rev) = existing.rev else {
            return Ok(false);
        };
        Ok(matches!(
            self.delete_document(&doc_id, &rev).await?,
            WriteOutcome::Written
        ))
    }

    async fn ping(&self) -> CouchResult<()> {
        let url = self.database_url();
        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::Unreachable {
                path: url.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::UnexpectedStatus {
                path: url,
                status: response.status(),
            })
        }
    }
}

impl RoomStore for CouchRoomStore {
    fn insert_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = room_doc_id(&room.code);
            let document = CouchRoomDocument::from_entity(room, None);
            let outcome = store.put_document(&doc_id, &document).await?;
            Ok(matches!(outcome, WriteOutcome::Written))
        })
    }

    fn find_room(&self, code: String) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = room_doc_id(&code);
            let maybe_doc = store.get_document::<CouchRoomDocument>(&doc_id).await?;
            Ok(maybe_doc.map(|doc| doc.room))
        })
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
                .delete_room(&code, expected_version)
                .await
                .map_err(Into::into)
        })
    }

    fn insert_result(&self, result: MatchResultEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let document = CouchResultDocument::from(result);
            let outcome = store.put_document(&document.id, &document).await?;
            Ok(matches!(outcome, WriteOutcome::Written))
        })
    }

    fn list_room_results(
        &self,
        code: String,
        round: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchResultEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_results_with_prefix(&round_results_prefix(&code, round))
                .await
                .map_err(Into::into)
        })
    }

    fn list_results(&self) -> BoxFuture<'static, StorageResult<Vec<MatchResultEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_results_with_prefix(RESULT_PREFIX)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
