//! JSON document datastore.
//!
//! The whole data file is one JSON object held in memory behind an async
//! `RwLock`. Top-level keys are resources: an array is a collection of items
//! addressed by their `id` field, an object is a singular resource.
//!
//! Writes are applied to a copy of the document, persisted, and only then
//! swapped in, so a failed write leaves both memory and disk unchanged.
//! On disk the document is replaced atomically: written to `<file>.tmp`,
//! then renamed over the original.

use std::path::PathBuf;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::Error;

/// The shape of a top-level resource.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    /// An array of items.
    Collection,
    /// A single object.
    Singular,
    /// Any other JSON value; readable, never writable.
    Scalar,
}

impl Kind {
    fn of(value: &Value) -> Self {
        match value {
            Value::Array(_) => Self::Collection,
            Value::Object(_) => Self::Singular,
            _ => Self::Scalar,
        }
    }
}

/// Why a datastore operation did not happen.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no resource named `{0}`")]
    UnknownResource(String),

    #[error("`{resource}` does not support this operation")]
    WrongKind { resource: String },

    #[error("`{resource}` has no item with id `{id}`")]
    NotFound { resource: String, id: String },

    #[error("`{resource}` already has an item with id `{id}`")]
    DuplicateId { resource: String, id: String },

    #[error("request body must be a JSON object")]
    NotAnObject,

    #[error(transparent)]
    Persist(#[from] Error),
}

/// The data-access interface over one JSON document.
///
/// Created once at startup and shared as `Arc<Database>`.
#[derive(Debug)]
pub struct Database {
    path: Option<PathBuf>,
    doc: RwLock<Map<String, Value>>,
}

impl Database {
    /// Loads the document at `path`. Every later write is persisted back to it.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let bytes = tokio::fs::read(&path).await?;
        let Value::Object(doc) = serde_json::from_slice::<Value>(&bytes)? else {
            return Err(Error::InvalidDocument { path });
        };
        debug!(path = %path.display(), resources = doc.len(), "data file loaded");
        Ok(Self { path: Some(path), doc: RwLock::new(doc) })
    }

    /// A document that lives only in memory.
    pub fn in_memory(doc: Value) -> Result<Self, Error> {
        let Value::Object(doc) = doc else {
            return Err(Error::InvalidDocument { path: PathBuf::from("<memory>") });
        };
        Ok(Self { path: None, doc: RwLock::new(doc) })
    }

    /// Names of all top-level resources, in document order.
    pub async fn resources(&self) -> Vec<String> {
        self.doc.read().await.keys().cloned().collect()
    }

    pub async fn kind(&self, resource: &str) -> Option<Kind> {
        self.doc.read().await.get(resource).map(Kind::of)
    }

    /// The whole value stored under `resource`.
    pub async fn get(&self, resource: &str) -> Result<Value, StoreError> {
        self.doc.read().await
            .get(resource)
            .cloned()
            .ok_or_else(|| StoreError::UnknownResource(resource.to_owned()))
    }

    /// The collection item whose id renders as `id`.
    pub async fn find(&self, resource: &str, id: &str) -> Result<Value, StoreError> {
        let doc = self.doc.read().await;
        let items = match doc.get(resource) {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(StoreError::WrongKind { resource: resource.to_owned() }),
            None => return Err(StoreError::UnknownResource(resource.to_owned())),
        };
        items.iter()
            .find(|item| id_matches(item, id))
            .cloned()
            .ok_or_else(|| not_found(resource, id))
    }

    /// Appends `item` to a collection and returns it with its id.
    ///
    /// A caller-supplied id is kept if unused; otherwise one is generated.
    pub async fn insert(&self, resource: &str, item: Value) -> Result<Value, StoreError> {
        let Value::Object(mut fields) = item else {
            return Err(StoreError::NotAnObject);
        };

        self.write(|doc| {
            let items = collection_mut(doc, resource)?;
            let id = match fields.shift_remove("id") {
                Some(id) if !id.is_null() => {
                    let rendered = render_id(&id);
                    if items.iter().any(|item| id_matches(item, &rendered)) {
                        return Err(StoreError::DuplicateId {
                            resource: resource.to_owned(),
                            id: rendered,
                        });
                    }
                    id
                }
                _ => next_id(items),
            };

            let created = Value::Object(with_id(id, fields));
            items.push(created.clone());
            Ok(created)
        })
        .await
    }

    /// Replaces a collection item wholesale, keeping its id.
    pub async fn replace(&self, resource: &str, id: &str, item: Value) -> Result<Value, StoreError> {
        let Value::Object(fields) = item else {
            return Err(StoreError::NotAnObject);
        };

        self.write(|doc| {
            let slot = item_mut(doc, resource, id)?;
            let kept = slot.get("id").cloned().unwrap_or(Value::Null);
            let mut fields = fields;
            fields.shift_remove("id");
            *slot = Value::Object(with_id(kept, fields));
            Ok(slot.clone())
        })
        .await
    }

    /// Shallow-merges `patch` into a collection item. The id never changes.
    pub async fn update(&self, resource: &str, id: &str, patch: Value) -> Result<Value, StoreError> {
        let Value::Object(patch) = patch else {
            return Err(StoreError::NotAnObject);
        };

        self.write(|doc| {
            let slot = item_mut(doc, resource, id)?;
            if let Value::Object(fields) = slot {
                merge(fields, patch);
            }
            Ok(slot.clone())
        })
        .await
    }

    /// Removes a collection item and returns it.
    pub async fn remove(&self, resource: &str, id: &str) -> Result<Value, StoreError> {
        self.write(|doc| {
            let items = collection_mut(doc, resource)?;
            let idx = items.iter()
                .position(|item| id_matches(item, id))
                .ok_or_else(|| not_found(resource, id))?;
            Ok(items.remove(idx))
        })
        .await
    }

    /// Replaces a singular resource.
    pub async fn set(&self, resource: &str, value: Value) -> Result<Value, StoreError> {
        if !value.is_object() {
            return Err(StoreError::NotAnObject);
        }

        self.write(|doc| {
            let slot = singular_mut(doc, resource)?;
            *slot = value;
            Ok(slot.clone())
        })
        .await
    }

    /// Shallow-merges `patch` into a singular resource.
    pub async fn merge(&self, resource: &str, patch: Value) -> Result<Value, StoreError> {
        let Value::Object(patch) = patch else {
            return Err(StoreError::NotAnObject);
        };

        self.write(|doc| {
            let slot = singular_mut(doc, resource)?;
            if let Value::Object(fields) = slot {
                fields.extend(patch);
            }
            Ok(slot.clone())
        })
        .await
    }

    async fn write<T>(
        &self,
        apply: impl FnOnce(&mut Map<String, Value>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut doc = self.doc.write().await;
        let mut next = doc.clone();
        let out = apply(&mut next)?;
        self.persist(&next).await?;
        *doc = next;
        Ok(out)
    }

    async fn persist(&self, doc: &Map<String, Value>) -> Result<(), Error> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let bytes = serde_json::to_vec_pretty(doc)?;
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "data file written");
        Ok(())
    }
}

// ── Document helpers ──────────────────────────────────────────────────────────

fn not_found(resource: &str, id: &str) -> StoreError {
    StoreError::NotFound { resource: resource.to_owned(), id: id.to_owned() }
}

fn collection_mut<'a>(
    doc: &'a mut Map<String, Value>,
    resource: &str,
) -> Result<&'a mut Vec<Value>, StoreError> {
    match doc.get_mut(resource) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(StoreError::WrongKind { resource: resource.to_owned() }),
        None => Err(StoreError::UnknownResource(resource.to_owned())),
    }
}

fn item_mut<'a>(
    doc: &'a mut Map<String, Value>,
    resource: &str,
    id: &str,
) -> Result<&'a mut Value, StoreError> {
    collection_mut(doc, resource)?
        .iter_mut()
        .find(|item| id_matches(item, id))
        .ok_or_else(|| not_found(resource, id))
}

fn singular_mut<'a>(
    doc: &'a mut Map<String, Value>,
    resource: &str,
) -> Result<&'a mut Value, StoreError> {
    match doc.get_mut(resource) {
        Some(slot) if slot.is_object() => Ok(slot),
        Some(_) => Err(StoreError::WrongKind { resource: resource.to_owned() }),
        None => Err(StoreError::UnknownResource(resource.to_owned())),
    }
}

/// Ids are compared in their rendered form: `1` and `"1"` both match `/1`.
fn render_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn id_matches(item: &Value, id: &str) -> bool {
    item.get("id").is_some_and(|v| !v.is_null() && render_id(v) == id)
}

/// `max + 1` while every id is a non-negative integer, a UUID otherwise.
fn next_id(items: &[Value]) -> Value {
    let mut max = 0u64;
    for id in items.iter().filter_map(|item| item.get("id")) {
        match id.as_u64() {
            Some(n) => max = max.max(n),
            None => return Value::String(Uuid::new_v4().to_string()),
        }
    }
    match max.checked_add(1) {
        Some(next) => Value::from(next),
        None => Value::String(Uuid::new_v4().to_string()),
    }
}

fn with_id(id: Value, fields: Map<String, Value>) -> Map<String, Value> {
    let mut item = Map::with_capacity(fields.len() + 1);
    item.insert("id".to_owned(), id);
    item.extend(fields);
    item
}

fn merge(fields: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        if key != "id" {
            fields.insert(key, value);
        }
    }
}
