// Service exports
pub mod appwrite;
pub mod cache;
pub mod coordinator;
pub mod memory;
pub mod store;
pub mod subscription;

pub use appwrite::{AppwriteCollections, AppwriteStore};
pub use cache::{CacheError, CacheKey, ViewCache};
pub use coordinator::{Coordinator, MatchOutcome, RetryPolicy};
pub use memory::InMemoryStore;
pub use store::{fetch, fetch_all, DocumentStore, FieldFilter, Precondition, StoreError, WriteOp};
pub use subscription::{spawn_projection_feed, subscribe, Subscription};
