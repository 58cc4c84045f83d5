use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// The monitored collections of the store of record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Requests,
    Donations,
    Asks,
    Shelters,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Requests,
        Collection::Donations,
        Collection::Asks,
        Collection::Shelters,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Requests => "requests",
            Collection::Donations => "donations",
            Collection::Asks => "asks",
            Collection::Shelters => "shelters",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw stored document
///
/// `version` is the optimistic-concurrency token: every committed write bumps
/// it, and conditional writes name the version they were computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub version: u64,
    pub data: Value,
}

impl Document {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Versioned<T>, serde_json::Error> {
        Ok(Versioned {
            version: self.version,
            value: serde_json::from_value(self.data.clone())?,
        })
    }
}

/// A typed entity paired with the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

/// The complete current contents of one monitored collection
///
/// Each batch is authoritative: consumers replace their working set with it.
/// `sequence` increases per subscription so late or repeated deliveries can be
/// recognized and dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotBatch {
    pub collection: Collection,
    pub sequence: u64,
    pub documents: Vec<Document>,
}
