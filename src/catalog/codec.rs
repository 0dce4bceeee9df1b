//! Collection encoding.
//!
//! Each collection lives under one key as a versioned envelope:
//!
//! ```json
//! {"version": 1, "data": [ ... ]}
//! ```
//!
//! A bare JSON array is accepted on load as well. Loading never fails on bad
//! content: an unreadable value is treated as an empty collection. A record
//! that cannot be decoded is kept as raw JSON in the [`Collection`] and
//! written back unchanged, after the decoded records, on the next save of
//! that collection. Only a failing substrate is reported to the caller.

use std::ops::{Deref, DerefMut};

use serde::de::DeserializeOwned;
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::error::{CatalogError, CatalogResult};
use crate::db::KvStore;

pub const VIDEOS_KEY: &str = "catalog.videos";
pub const CATEGORIES_KEY: &str = "catalog.categories";
pub const PLAYLISTS_KEY: &str = "catalog.playlists";

pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    data: Records<'a, T>,
}

/// Decoded records followed by the raw ones, as one JSON array.
struct Records<'a, T> {
    items: &'a [T],
    unreadable: &'a [Value],
}

impl<T: Serialize> Serialize for Records<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.items.len() + self.unreadable.len()))?;
        for item in self.items {
            seq.serialize_element(item)?;
        }
        for raw in self.unreadable {
            seq.serialize_element(raw)?;
        }
        seq.end()
    }
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    data: Vec<Value>,
}

/// One stored collection: the records that decoded, plus the ones that did
/// not. Derefs to the decoded records.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    key: &'static str,
    items: Vec<T>,
    unreadable: Vec<Value>,
}

impl<T> Collection<T> {
    pub fn new(key: &'static str) -> Self {
        Self {
            key,
            items: Vec::new(),
            unreadable: Vec::new(),
        }
    }

    /// Stored records that could not be decoded, as found.
    pub fn unreadable(&self) -> &[Value] {
        &self.unreadable
    }

    /// The `id` of every unreadable record that has a string one.
    pub fn unreadable_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.unreadable
            .iter()
            .filter_map(|record| record.get("id").and_then(Value::as_str))
    }

    /// True if a decoded or an unreadable record carries `id`.
    pub fn holds_id(&self, id: &str, id_of: impl Fn(&T) -> &str) -> bool {
        self.items.iter().any(|item| id_of(item) == id) || self.unreadable_ids().any(|u| u == id)
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T: Serialize> Collection<T> {
    pub fn encode(&self) -> CatalogResult<String> {
        encode_records(self.key, &self.items, &self.unreadable)
    }
}

impl<T> Deref for Collection<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.items
    }
}

impl<T> DerefMut for Collection<T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        &mut self.items
    }
}

pub async fn load<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &'static str,
) -> CatalogResult<Collection<T>> {
    let raw = store
        .get(key)
        .await
        .map_err(CatalogError::PersistenceRead)?;

    Ok(match raw {
        Some(raw) => decode(key, &raw),
        None => Collection::new(key),
    })
}

pub fn decode<T: DeserializeOwned>(key: &'static str, raw: &str) -> Collection<T> {
    let mut collection = Collection::new(key);
    let records = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(records)) => records,
        Ok(value @ Value::Object(_)) => match serde_json::from_value::<Envelope>(value) {
            Ok(envelope) => {
                if envelope.version > FORMAT_VERSION {
                    warn!(
                        "Collection {} has format version {}, newer than {}",
                        key, envelope.version, FORMAT_VERSION
                    );
                }
                envelope.data
            }
            Err(e) => {
                warn!("Collection {} has a malformed envelope, treating as empty: {}", key, e);
                return collection;
            }
        },
        Ok(_) => {
            warn!("Collection {} is not a list, treating as empty", key);
            return collection;
        }
        Err(e) => {
            warn!("Collection {} is not valid JSON, treating as empty: {}", key, e);
            return collection;
        }
    };

    for record in records {
        match T::deserialize(&record) {
            Ok(item) => collection.items.push(item),
            Err(e) => {
                warn!("Keeping unreadable record in {} as is: {}", key, e);
                collection.unreadable.push(record);
            }
        }
    }

    if !collection.unreadable.is_empty() {
        warn!(
            "Loaded {} of {} records from {}",
            collection.items.len(),
            collection.items.len() + collection.unreadable.len(),
            key
        );
    }

    collection
}

pub fn encode<T: Serialize>(key: &str, items: &[T]) -> CatalogResult<String> {
    encode_records(key, items, &[])
}

fn encode_records<T: Serialize>(key: &str, items: &[T], unreadable: &[Value]) -> CatalogResult<String> {
    let envelope = EnvelopeRef {
        version: FORMAT_VERSION,
        data: Records { items, unreadable },
    };
    serde_json::to_string(&envelope).map_err(|e| CatalogError::Encode(key.to_string(), e))
}

pub async fn save<T: Serialize>(store: &dyn KvStore, key: &str, items: &[T]) -> CatalogResult<()> {
    let value = encode(key, items)?;
    store
        .set(key, &value)
        .await
        .map_err(CatalogError::PersistenceWrite)
}
