use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::models::{Collection, Document};
use crate::services::store::{DocumentStore, FieldFilter, Precondition, StoreError, WriteOp};

/// Upper bound on documents fetched per listing
const LIST_LIMIT: usize = 5000;

/// Seconds a staged transaction may stay open on the server
const TRANSACTION_TTL_SECS: u64 = 60;

/// Attribute holding the optimistic-concurrency counter on every document
const VERSION_FIELD: &str = "version";

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Transport(err.to_string())
    }
}

/// Collection IDs in Appwrite
#[derive(Debug, Clone)]
pub struct AppwriteCollections {
    pub requests: String,
    pub donations: String,
    pub asks: String,
    pub shelters: String,
}

impl AppwriteCollections {
    fn id(&self, collection: Collection) -> &str {
        match collection {
            Collection::Requests => &self.requests,
            Collection::Donations => &self.donations,
            Collection::Asks => &self.asks,
            Collection::Shelters => &self.shelters,
        }
    }
}

/// Appwrite database adapter
///
/// Handles all communication with the Appwrite backend including:
/// - Reading single documents and filtered listings
/// - Committing multi-document writes through the transactions API, with a
///   `version` attribute checked and bumped on every write
pub struct AppwriteStore {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: AppwriteCollections,
}

impl AppwriteStore {
    /// Create a new Appwrite store
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: AppwriteCollections,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            project_id,
            database_id,
            client,
            collections,
        })
    }

    fn documents_url(&self, collection: Collection) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url,
            self.database_id,
            self.collections.id(collection)
        )
    }

    fn transactions_url(&self) -> String {
        format!("{}/databases/transactions", self.base_url)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
    }

    async fn fetch_document(
        &self,
        collection: Collection,
        id: &str,
        transaction_id: Option<&str>,
    ) -> Result<Option<Document>, StoreError> {
        let mut url = format!("{}/{}", self.documents_url(collection), urlencoding::encode(id));
        if let Some(tx) = transaction_id {
            url = format!("{}?transactionId={}", url, urlencoding::encode(tx));
        }

        tracing::debug!("Fetching {} document {}", collection, id);

        let response = self.authed(self.client.get(&url)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let json: Value = response.json().await?;
                from_appwrite(&json).map(Some)
            }
            status => Err(StoreError::Transport(format!(
                "Failed to fetch {} {}: {}",
                collection, id, status
            ))),
        }
    }

    async fn begin(&self) -> Result<String, StoreError> {
        let response = self
            .authed(self.client.post(self.transactions_url()))
            .json(&json!({ "ttl": TRANSACTION_TTL_SECS }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::Transport(format!(
                "Failed to open transaction: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;
        json.get("$id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StoreError::Transport("Transaction response missing $id".into()))
    }

    async fn finish(&self, transaction_id: &str, commit: bool) -> Result<(), StoreError> {
        let url = format!("{}/{}", self.transactions_url(), urlencoding::encode(transaction_id));
        let body = if commit {
            json!({ "commit": true })
        } else {
            json!({ "rollback": true })
        };

        let response = self.authed(self.client.patch(&url)).json(&body).send().await?;
        match response.status() {
            StatusCode::CONFLICT => Err(StoreError::Conflict(format!(
                "transaction {} lost a concurrent write",
                transaction_id
            ))),
            status if status.is_success() => Ok(()),
            status => Err(StoreError::Transport(format!(
                "Failed to finish transaction {}: {}",
                transaction_id, status
            ))),
        }
    }

    /// Check preconditions and stage every write inside the open transaction
    async fn stage(&self, transaction_id: &str, ops: &[WriteOp]) -> Result<(), StoreError> {
        let mut operations = Vec::with_capacity(ops.len());

        for op in ops {
            let WriteOp::Put {
                collection,
                id,
                precondition,
                data,
            } = op;

            let current = self.fetch_document(*collection, id, Some(transaction_id)).await?;
            let next_version = match (precondition, &current) {
                (Precondition::Absent, None) => 1,
                (Precondition::Absent, Some(_)) => {
                    return Err(StoreError::Conflict(format!("{} {} already exists", collection, id)));
                }
                (Precondition::Version(expected), Some(doc)) if doc.version == *expected => expected + 1,
                (Precondition::Version(expected), Some(doc)) => {
                    return Err(StoreError::Conflict(format!(
                        "{} {} is at version {}, expected {}",
                        collection, id, doc.version, expected
                    )));
                }
                (Precondition::Version(_), None) => {
                    return Err(StoreError::NotFound {
                        collection: *collection,
                        id: id.clone(),
                    });
                }
                (Precondition::Any, current) => current.as_ref().map_or(1, |doc| doc.version + 1),
            };

            operations.push(json!({
                "action": if current.is_some() { "update" } else { "create" },
                "databaseId": self.database_id,
                "collectionId": self.collections.id(*collection),
                "documentId": id,
                "data": to_appwrite(data, next_version),
            }));
        }

        let url = format!(
            "{}/{}/operations",
            self.transactions_url(),
            urlencoding::encode(transaction_id)
        );
        let response = self
            .authed(self.client.post(&url))
            .json(&json!({ "operations": operations }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::Transport(format!(
                "Failed to stage operations: {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Strip Appwrite system attributes and lift `$id` / `version`
fn from_appwrite(json: &Value) -> Result<Document, StoreError> {
    let object = json
        .as_object()
        .ok_or_else(|| StoreError::Transport("Document is not an object".into()))?;

    let id = object
        .get("$id")
        .or_else(|| object.get("id"))
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Transport("Document missing $id".into()))?
        .to_string();

    let version = object.get(VERSION_FIELD).and_then(Value::as_u64).unwrap_or(0);

    let mut data: Map<String, Value> = object
        .iter()
        .filter(|(k, _)| !k.starts_with('$') && k.as_str() != VERSION_FIELD)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    data.entry("id").or_insert_with(|| Value::String(id.clone()));

    Ok(Document {
        id,
        version,
        data: Value::Object(data),
    })
}

fn to_appwrite(data: &Value, version: u64) -> Value {
    let mut payload = data.as_object().cloned().unwrap_or_default();
    payload.insert(VERSION_FIELD.to_string(), Value::from(version));
    Value::Object(payload)
}

fn query_params(filters: &[FieldFilter]) -> String {
    let mut queries: Vec<String> = filters
        .iter()
        .map(|f| json!({ "method": "equal", "attribute": f.field, "values": [f.equals] }).to_string())
        .collect();
    queries.push(json!({ "method": "limit", "values": [LIST_LIMIT] }).to_string());

    queries
        .iter()
        .map(|q| format!("queries[]={}", urlencoding::encode(q)))
        .collect::<Vec<_>>()
        .join("&")
}

#[async_trait]
impl DocumentStore for AppwriteStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Document, StoreError> {
        self.fetch_document(collection, id, None)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_string(),
            })
    }

    async fn list(&self, collection: Collection, filters: &[FieldFilter]) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}?{}", self.documents_url(collection), query_params(filters));

        let response = self.authed(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(StoreError::Transport(format!(
                "Failed to list {}: {}",
                collection,
                response.status()
            )));
        }

        let json: Value = response.json().await?;
        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| StoreError::Transport("Missing documents array".into()))?;

        let docs: Vec<Document> = documents
            .iter()
            .filter_map(|doc| match from_appwrite(doc) {
                Ok(d) => Some(d),
                Err(e) => {
                    tracing::warn!("Skipping malformed {} document: {}", collection, e);
                    None
                }
            })
            .collect();

        tracing::debug!("Listed {} {} documents", docs.len(), collection);
        Ok(docs)
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        if ops.is_empty() {
            return Ok(());
        }

        let transaction_id = self.begin().await?;
        tracing::debug!("Opened transaction {} for {} writes", transaction_id, ops.len());

        if let Err(e) = self.stage(&transaction_id, &ops).await {
            if let Err(rollback) = self.finish(&transaction_id, false).await {
                tracing::warn!("Rollback of transaction {} failed: {}", transaction_id, rollback);
            }
            return Err(e);
        }

        self.finish(&transaction_id, true).await
    }
}
