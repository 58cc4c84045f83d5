use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::core::{ApplyOutcome, Projection};
use crate::models::{Collection, Document, SnapshotBatch};
use crate::services::store::{DocumentStore, FieldFilter};

/// Batches buffered per subscription before the poller waits on the consumer
const CHANNEL_CAPACITY: usize = 16;

/// Shortest accepted poll period; `tokio::time::interval` rejects zero
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A live feed of full snapshots for one collection
///
/// Dropping the subscription (or calling [`unsubscribe`](Self::unsubscribe))
/// stops the background poller.
pub struct Subscription {
    collection: Collection,
    receiver: mpsc::Receiver<SnapshotBatch>,
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Wait for the next snapshot; `None` once the feed has stopped
    pub async fn next(&mut self) -> Option<SnapshotBatch> {
        self.receiver.recv().await
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn fingerprint(documents: &[Document]) -> Vec<(String, u64)> {
    let mut print: Vec<(String, u64)> = documents.iter().map(|d| (d.id.clone(), d.version)).collect();
    print.sort();
    print
}

/// Watch `collection` and deliver its complete matching set whenever it changes
///
/// The store is polled every `interval`; a batch is emitted on the first poll
/// and afterwards only when the set of (id, version) pairs differs. Sequence
/// numbers start at 1 and increase by one per emitted batch. An `interval`
/// below one millisecond is raised to one millisecond.
pub fn subscribe(
    store: Arc<dyn DocumentStore>,
    collection: Collection,
    filters: Vec<FieldFilter>,
    interval: Duration,
) -> Subscription {
    let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
    let interval = interval.max(MIN_POLL_INTERVAL);

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<Vec<(String, u64)>> = None;
        let mut sequence = 0u64;

        loop {
            ticker.tick().await;

            let documents = match store.list(collection, &filters).await {
                Ok(docs) => docs,
                Err(e) => {
                    tracing::warn!("Snapshot poll of {} failed: {}", collection, e);
                    continue;
                }
            };

            let print = fingerprint(&documents);
            if last.as_ref() == Some(&print) {
                continue;
            }
            last = Some(print);
            sequence += 1;

            let batch = SnapshotBatch {
                collection,
                sequence,
                documents,
            };
            if sender.send(batch).await.is_err() {
                tracing::debug!("Subscriber for {} went away, stopping poller", collection);
                break;
            }
        }
    });

    tracing::info!("Subscribed to {} (poll every {:?})", collection, interval);

    Subscription {
        collection,
        receiver,
        handle,
    }
}

/// Feed a subscription into a shared projection until the feed stops
///
/// Batches from different collections may arrive on different tasks; the
/// write lock serializes them against each other and against readers.
pub fn spawn_projection_feed(projection: Arc<RwLock<Projection>>, mut subscription: Subscription) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(batch) = subscription.next().await {
            let outcome = projection.write().await.apply(&batch);
            match outcome {
                ApplyOutcome::Applied { accepted, rejected } => {
                    if !rejected.is_empty() {
                        tracing::warn!(
                            "Dropped {} undecodable {} documents: {:?}",
                            rejected.len(),
                            batch.collection,
                            rejected
                        );
                    }
                    tracing::debug!(
                        "Applied {} batch #{} ({} documents)",
                        batch.collection,
                        batch.sequence,
                        accepted
                    );
                }
                ApplyOutcome::Stale { current } => {
                    tracing::debug!(
                        "Ignored stale {} batch #{} (at #{})",
                        batch.collection,
                        batch.sequence,
                        current
                    );
                }
            }
        }
        tracing::info!("Projection feed for {} ended", subscription.collection());
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::InMemoryStore;
    use crate::services::store::{Precondition, WriteOp};
    use serde_json::json;

    fn doc(id: &str) -> Document {
        Document {
            id: id.to_string(),
            version: 1,
            data: json!({"id": id, "status": "pending"}),
        }
    }

    #[tokio::test]
    async fn test_first_poll_delivers_full_set() {
        let store = Arc::new(InMemoryStore::new());
        store.seed(Collection::Asks, vec![doc("A1"), doc("A2")]).await;

        let mut sub = subscribe(store.clone(), Collection::Asks, vec![], Duration::from_millis(10));
        let batch = sub.next().await.unwrap();

        assert_eq!(batch.sequence, 1);
        assert_eq!(batch.documents.len(), 2);
        sub.unsubscribe();
    }

    #[tokio::test]
    async fn test_zero_interval_still_polls() {
        let store = Arc::new(InMemoryStore::new());
        store.seed(Collection::Asks, vec![doc("A1")]).await;

        let mut sub = subscribe(store.clone(), Collection::Asks, vec![], Duration::ZERO);
        let batch = tokio::time::timeout(Duration::from_secs(2), sub.next())
            .await
            .unwrap()
            .expect("poller stopped");

        assert_eq!(batch.sequence, 1);
        assert_eq!(batch.documents.len(), 1);
    }

    #[tokio::test]
    async fn test_change_emits_new_full_snapshot() {
        let store = Arc::new(InMemoryStore::new());
        store.seed(Collection::Asks, vec![doc("A1"), doc("A2")]).await;

        let mut sub = subscribe(store.clone(), Collection::Asks, vec![], Duration::from_millis(10));
        sub.next().await.unwrap();

        store
            .commit(vec![WriteOp::Put {
                collection: Collection::Asks,
                id: "A2".to_string(),
                precondition: Precondition::Version(1),
                data: json!({"id": "A2", "status": "matched"}),
            }])
            .await
            .unwrap();

        let batch = tokio::time::timeout(Duration::from_secs(2), sub.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(batch.sequence, 2);
        assert_eq!(batch.documents.len(), 2, "full set, not a diff");
    }

    #[tokio::test]
    async fn test_filtered_subscription() {
        let store = Arc::new(InMemoryStore::new());
        store.seed(Collection::Asks, vec![doc("A1")]).await;
        store
            .seed(
                Collection::Asks,
                vec![Document {
                    id: "A2".to_string(),
                    version: 1,
                    data: json!({"id": "A2", "status": "matched"}),
                }],
            )
            .await;

        let mut sub = subscribe(
            store.clone(),
            Collection::Asks,
            vec![FieldFilter::new("status", "pending")],
            Duration::from_millis(10),
        );
        let batch = sub.next().await.unwrap();

        assert_eq!(batch.documents.len(), 1);
        assert_eq!(batch.documents[0].id, "A1");
    }

    #[tokio::test]
    async fn test_feed_populates_projection() {
        let store = Arc::new(InMemoryStore::new());
        store
            .seed(
                Collection::Donations,
                vec![Document {
                    id: "D1".to_string(),
                    version: 1,
                    data: json!({
                        "id": "D1",
                        "category": "food",
                        "quantity": 4,
                        "status": "available",
                        "createdAt": "2026-02-01T10:00:00Z"
                    }),
                }],
            )
            .await;

        let projection = Arc::new(RwLock::new(Projection::default()));
        let sub = subscribe(store.clone(), Collection::Donations, vec![], Duration::from_millis(10));
        let feed = spawn_projection_feed(projection.clone(), sub);

        let mut applied = false;
        for _ in 0..100 {
            if projection.read().await.donations().len() == 1 {
                applied = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        feed.abort();

        assert!(applied, "projection never received the snapshot");
    }
}
