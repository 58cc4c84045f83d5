use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// In-memory cache of rendered derived views
///
/// Keys embed the projection generation, so a new snapshot batch makes every
/// older entry unreachable; the TTL then reclaims them.
pub struct ViewCache {
    entries: moka::future::Cache<String, Vec<u8>>,
}

impl ViewCache {
    pub fn new(max_entries: u64, ttl_secs: u64) -> Self {
        let entries = moka::future::CacheBuilder::new(max_entries)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { entries }
    }

    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: DeserializeOwned,
    {
        match self.entries.get(key).await {
            Some(bytes) => {
                tracing::trace!("View cache hit: {}", key);
                Ok(serde_json::from_slice(&bytes)?)
            }
            None => Err(CacheError::CacheMiss(key.to_string())),
        }
    }

    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let bytes = serde_json::to_vec(value)?;
        self.entries.insert(key.to_string(), bytes).await;
        tracing::trace!("View cache set: {}", key);
        Ok(())
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Key for a nearby view of `kind` at a projection generation
    ///
    /// Floats are keyed by their exact bits: two queries share an entry only
    /// when they would compute the same view.
    pub fn nearby(kind: &str, generation: u64, lat: f64, lng: f64, radius_km: f64, filter: Option<&str>) -> String {
        format!(
            "nearby:{}:{}:{:016x}:{:016x}:{:016x}:{}",
            kind,
            generation,
            lat.to_bits(),
            lng.to_bits(),
            radius_km.to_bits(),
            filter.unwrap_or("*")
        )
    }

    pub fn consistency(generation: u64) -> String {
        format!("consistency:{}", generation)
    }
}
