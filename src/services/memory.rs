use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{Collection, Document};
use crate::services::store::{DocumentStore, FieldFilter, Precondition, StoreError, WriteOp};

/// In-process store with compare-and-swap commits
///
/// Used by tests and local runs. Documents keep insertion order per
/// collection so listings are deterministic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert documents directly, bypassing preconditions
    pub async fn seed(&self, collection: Collection, documents: Vec<Document>) {
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection).or_default();
        for doc in documents {
            match docs.iter_mut().find(|d| d.id == doc.id) {
                Some(existing) => *existing = doc,
                None => docs.push(doc),
            }
        }
    }
}

fn check(docs: Option<&Vec<Document>>, op: &WriteOp) -> Result<(), StoreError> {
    let WriteOp::Put { id, precondition, collection, .. } = op;
    let current = docs.and_then(|docs| docs.iter().find(|d| &d.id == id));

    match (precondition, current) {
        (Precondition::Any, _) => Ok(()),
        (Precondition::Absent, None) => Ok(()),
        (Precondition::Absent, Some(_)) => Err(StoreError::Conflict(format!("{} {} already exists", collection, id))),
        (Precondition::Version(expected), Some(doc)) if doc.version == *expected => Ok(()),
        (Precondition::Version(expected), Some(doc)) => Err(StoreError::Conflict(format!(
            "{} {} is at version {}, expected {}",
            collection, id, doc.version, expected
        ))),
        (Precondition::Version(_), None) => Err(StoreError::NotFound {
            collection: *collection,
            id: id.clone(),
        }),
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Document, StoreError> {
        let guard = self.collections.read().await;
        guard
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_string(),
            })
    }

    async fn list(&self, collection: Collection, filters: &[FieldFilter]) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filters.iter().all(|f| f.matches(&d.data)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut guard = self.collections.write().await;

        // Validate everything before touching anything
        for op in &ops {
            check(guard.get(&op.collection()), op)?;
        }

        for op in ops {
            let WriteOp::Put { collection, id, data, .. } = op;
            let docs = guard.entry(collection).or_default();
            match docs.iter_mut().find(|d| d.id == id) {
                Some(doc) => {
                    doc.version += 1;
                    doc.data = data;
                }
                None => docs.push(Document { id, version: 1, data }),
            }
        }
        Ok(())
    }
}
