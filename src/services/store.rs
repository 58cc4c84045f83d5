use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::EngineError;
use crate::models::{Collection, Document, Versioned};

/// Errors that can occur when talking to the store of record
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection} `{id}` not found")]
    NotFound { collection: Collection, id: String },

    #[error("write conflict: {0}")]
    Conflict(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid document `{id}`: {reason}")]
    InvalidDocument { id: String, reason: String },
}

impl From<StoreError> for EngineError {
    /// Transport failures are treated as a lost race: the caller re-reads and
    /// tries again with fresh state.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => EngineError::NotFound {
                collection: collection.to_string(),
                id,
            },
            StoreError::Conflict(msg) => EngineError::Conflict(msg),
            StoreError::Transport(msg) => EngineError::Conflict(format!("store unavailable: {}", msg)),
            StoreError::InvalidDocument { id, reason } => {
                EngineError::Conflict(format!("document {} unreadable: {}", id, reason))
            }
        }
    }
}

/// Condition a write must satisfy at commit time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// The document must not exist yet
    Absent,
    /// The document must still be at this version
    Version(u64),
    /// Write unconditionally
    Any,
}

/// One write inside an atomic commit
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put {
        collection: Collection,
        id: String,
        precondition: Precondition,
        data: Value,
    },
}

impl WriteOp {
    /// Conditional replace of a document read at `version`
    pub fn replace<T: Serialize>(
        collection: Collection,
        id: impl Into<String>,
        version: u64,
        value: &T,
    ) -> Result<Self, StoreError> {
        let id = id.into();
        let data = serde_json::to_value(value).map_err(|e| StoreError::InvalidDocument {
            id: id.clone(),
            reason: e.to_string(),
        })?;
        Ok(WriteOp::Put {
            collection,
            id,
            precondition: Precondition::Version(version),
            data,
        })
    }

    pub fn collection(&self) -> Collection {
        match self {
            WriteOp::Put { collection, .. } => *collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            WriteOp::Put { id, .. } => id,
        }
    }
}

/// Equality filter on a top-level document field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub equals: Value,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, equals: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            equals: equals.into(),
        }
    }

    pub fn matches(&self, data: &Value) -> bool {
        data.get(&self.field) == Some(&self.equals)
    }
}

/// The store of record, as seen by the engine
///
/// Implementations must make [`commit`](DocumentStore::commit) atomic: either
/// every operation is applied and every touched version is bumped, or none is.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: Collection, id: &str) -> Result<Document, StoreError>;

    /// Every document of `collection` matching all `filters`
    async fn list(&self, collection: Collection, filters: &[FieldFilter]) -> Result<Vec<Document>, StoreError>;

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;
}

/// Read and decode one entity
pub async fn fetch<T, S>(store: &S, collection: Collection, id: &str) -> Result<Versioned<T>, StoreError>
where
    T: DeserializeOwned,
    S: DocumentStore + ?Sized,
{
    let doc = store.get(collection, id).await?;
    doc.decode().map_err(|e| StoreError::InvalidDocument {
        id: doc.id.clone(),
        reason: e.to_string(),
    })
}

/// Read and decode a filtered collection, skipping documents that do not decode
pub async fn fetch_all<T, S>(
    store: &S,
    collection: Collection,
    filters: &[FieldFilter],
) -> Result<Vec<Versioned<T>>, StoreError>
where
    T: DeserializeOwned,
    S: DocumentStore + ?Sized,
{
    let docs = store.list(collection, filters).await?;
    Ok(docs
        .iter()
        .filter_map(|doc| match doc.decode() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Skipping undecodable {} document {}: {}", collection, doc.id, e);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_filter() {
        let filter = FieldFilter::new("status", "pending");
        assert!(filter.matches(&json!({"status": "pending"})));
        assert!(!filter.matches(&json!({"status": "matched"})));
        assert!(!filter.matches(&json!({})));
    }

    #[test]
    fn test_store_error_mapping() {
        let err: EngineError = StoreError::Transport("timeout".into()).into();
        assert!(err.is_retryable());

        let err: EngineError = StoreError::NotFound {
            collection: Collection::Shelters,
            id: "S1".into(),
        }
        .into();
        assert!(matches!(err, EngineError::NotFound { .. }));
        assert!(!err.is_retryable());
    }
}
