//! Object storage for the admin.
//!
//! The admin works with rows as `serde_json::Value` objects rather than typed
//! models, because it is generic over every registered model. The
//! [`AdminDbExecutor`] trait is the seam between the admin views and a
//! backing store; [`InMemoryAdminDb`] is the bundled implementation.
//!
//! Rows are keyed by their `id` field. Foreign keys are stored as the primary
//! key of the referenced row under the field name (`"collection": 3`).
//!
//! ```
//! use serde_json::json;
//! use storefront_admin::db::{AdminDbExecutor, InMemoryAdminDb};
//!
//! # tokio_test_block_on(async {
//! let db = InMemoryAdminDb::new();
//! let row = db
//!     .create_object("store.collection", json!({"title": "Beauty"}).as_object().unwrap().clone())
//!     .await
//!     .unwrap();
//! assert_eq!(row["id"], 1);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};
use storefront_core::{StoreError, StoreResult};

/// Storage operations the admin performs, keyed by `"app_label.model_name"`.
#[async_trait]
pub trait AdminDbExecutor: Send + Sync {
    /// Returns every row of a model in insertion order.
    async fn all_objects(&self, model_key: &str) -> StoreResult<Vec<Value>>;

    /// Returns one row by primary key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DoesNotExist`] when no row has that key.
    async fn get_object(&self, model_key: &str, pk: &str) -> StoreResult<Value>;

    /// Inserts a row and returns it with its primary key.
    ///
    /// A numeric `id` in `data` is kept and advances the key sequence;
    /// otherwise the next key is assigned.
    async fn create_object(&self, model_key: &str, data: Map<String, Value>) -> StoreResult<Value>;

    /// Merges `data` into one row and returns the updated row.
    async fn update_object(
        &self,
        model_key: &str,
        pk: &str,
        data: Map<String, Value>,
    ) -> StoreResult<Value>;

    /// Merges `data` into every row whose key is in `pks`; returns how many matched.
    async fn update_objects(
        &self,
        model_key: &str,
        pks: &[String],
        data: &Map<String, Value>,
    ) -> StoreResult<usize>;

    /// Removes every row whose key is in `pks`; returns how many were removed.
    async fn delete_objects(&self, model_key: &str, pks: &[String]) -> StoreResult<usize>;

    /// Returns the rows whose `field` holds `value` (compared as a key string).
    async fn objects_where(&self, model_key: &str, field: &str, value: &str) -> StoreResult<Vec<Value>>;
}

/// Storage for one model.
#[derive(Debug, Clone)]
struct ModelTable {
    objects: Vec<Value>,
    next_id: i64,
}

impl ModelTable {
    const fn new() -> Self {
        Self {
            objects: Vec::new(),
            next_id: 1,
        }
    }
}

/// In-memory implementation of [`AdminDbExecutor`].
///
/// Each model gets its own table backed by a `Vec<Value>`. Cloning shares the
/// underlying tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAdminDb {
    tables: Arc<RwLock<HashMap<String, ModelTable>>>,
}

impl InMemoryAdminDb {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows stored for a model.
    pub fn count(&self, model_key: &str) -> StoreResult<usize> {
        Ok(self.read()?.get(model_key).map_or(0, |t| t.objects.len()))
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<String, ModelTable>>> {
        self.tables
            .read()
            .map_err(|_| StoreError::DatabaseError("table lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<String, ModelTable>>> {
        self.tables
            .write()
            .map_err(|_| StoreError::DatabaseError("table lock poisoned".to_string()))
    }
}

#[async_trait]
impl AdminDbExecutor for InMemoryAdminDb {
    async fn all_objects(&self, model_key: &str) -> StoreResult<Vec<Value>> {
        Ok(self
            .read()?
            .get(model_key)
            .map_or_else(Vec::new, |t| t.objects.clone()))
    }

    async fn get_object(&self, model_key: &str, pk: &str) -> StoreResult<Value> {
        self.read()?
            .get(model_key)
            .and_then(|t| t.objects.iter().find(|obj| row_has_pk(obj, pk)).cloned())
            .ok_or_else(|| {
                StoreError::DoesNotExist(format!("{model_key} with id '{pk}' does not exist"))
            })
    }

    #[allow(clippy::significant_drop_tightening)]
    async fn create_object(&self, model_key: &str, mut data: Map<String, Value>) -> StoreResult<Value> {
        let mut tables = self.write()?;
        let table = tables
            .entry(model_key.to_string())
            .or_insert_with(ModelTable::new);

        let id = match data.get("id").and_then(Value::as_i64) {
            Some(explicit) => {
                if table.objects.iter().any(|obj| row_has_pk(obj, &explicit.to_string())) {
                    return Err(StoreError::DatabaseError(format!(
                        "{model_key} with id '{explicit}' already exists"
                    )));
                }
                table.next_id = table.next_id.max(explicit + 1);
                explicit
            }
            None => {
                let id = table.next_id;
                table.next_id += 1;
                id
            }
        };
        data.insert("id".to_string(), Value::from(id));

        let row = Value::Object(data);
        table.objects.push(row.clone());
        Ok(row)
    }

    #[allow(clippy::significant_drop_tightening)]
    async fn update_object(
        &self,
        model_key: &str,
        pk: &str,
        data: Map<String, Value>,
    ) -> StoreResult<Value> {
        let mut tables = self.write()?;
        let row = tables
            .get_mut(model_key)
            .and_then(|t| t.objects.iter_mut().find(|obj| row_has_pk(obj, pk)))
            .ok_or_else(|| {
                StoreError::DoesNotExist(format!("{model_key} with id '{pk}' does not exist"))
            })?;

        if let Value::Object(map) = row {
            for (key, value) in data {
                if key != "id" {
                    map.insert(key, value);
                }
            }
        }
        Ok(row.clone())
    }

    #[allow(clippy::significant_drop_tightening)]
    async fn update_objects(
        &self,
        model_key: &str,
        pks: &[String],
        data: &Map<String, Value>,
    ) -> StoreResult<usize> {
        let mut tables = self.write()?;
        let Some(table) = tables.get_mut(model_key) else {
            return Ok(0);
        };

        let mut updated = 0;
        for row in &mut table.objects {
            if !pks.iter().any(|pk| row_has_pk(row, pk)) {
                continue;
            }
            if let Value::Object(map) = row {
                for (key, value) in data {
                    if key != "id" {
                        map.insert(key.clone(), value.clone());
                    }
                }
                updated += 1;
            }
        }
        Ok(updated)
    }

    #[allow(clippy::significant_drop_tightening)]
    async fn delete_objects(&self, model_key: &str, pks: &[String]) -> StoreResult<usize> {
        let mut tables = self.write()?;
        let Some(table) = tables.get_mut(model_key) else {
            return Ok(0);
        };
        let before = table.objects.len();
        table
            .objects
            .retain(|row| !pks.iter().any(|pk| row_has_pk(row, pk)));
        Ok(before - table.objects.len())
    }

    async fn objects_where(&self, model_key: &str, field: &str, value: &str) -> StoreResult<Vec<Value>> {
        Ok(self
            .read()?
            .get(model_key)
            .map_or_else(Vec::new, |t| {
                t.objects
                    .iter()
                    .filter(|row| row.get(field).is_some_and(|v| value_matches_pk(v, value)))
                    .cloned()
                    .collect()
            }))
    }
}

/// Returns the primary key of a row as a string, empty when missing.
pub fn pk_of(row: &Value) -> String {
    row.get("id").map(key_string).unwrap_or_default()
}

/// Renders a scalar JSON value the way keys are compared.
pub fn key_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn row_has_pk(row: &Value, pk: &str) -> bool {
    row.get("id").is_some_and(|v| value_matches_pk(v, pk))
}

/// Checks if a JSON value matches a primary key string.
fn value_matches_pk(value: &Value, pk: &str) -> bool {
    match value {
        Value::Number(n) => n.to_string() == pk,
        Value::String(s) => s == pk,
        Value::Bool(b) => b.to_string() == pk,
        Value::Null => pk.is_empty() || pk == "null",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let db = InMemoryAdminDb::new();
        let a = db.create_object("store.tag", map(json!({"label": "a"}))).await.unwrap();
        let b = db.create_object("store.tag", map(json!({"label": "b"}))).await.unwrap();
        assert_eq!(a["id"], 1);
        assert_eq!(b["id"], 2);
        assert_eq!(db.count("store.tag").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_create_with_explicit_id_advances_sequence() {
        let db = InMemoryAdminDb::new();
        db.create_object("store.tag", map(json!({"id": 10, "label": "a"}))).await.unwrap();
        let next = db.create_object("store.tag", map(json!({"label": "b"}))).await.unwrap();
        assert_eq!(next["id"], 11);

        let dup = db.create_object("store.tag", map(json!({"id": 10}))).await;
        assert!(matches!(dup, Err(StoreError::DatabaseError(_))));
    }

    #[tokio::test]
    async fn test_get_object() {
        let db = InMemoryAdminDb::new();
        db.create_object("store.tag", map(json!({"label": "a"}))).await.unwrap();
        let row = db.get_object("store.tag", "1").await.unwrap();
        assert_eq!(row["label"], "a");

        let missing = db.get_object("store.tag", "2").await.unwrap_err();
        assert!(matches!(missing, StoreError::DoesNotExist(_)));
        let no_table = db.get_object("store.order", "1").await.unwrap_err();
        assert_eq!(no_table.status_code(), 404);
    }

    #[tokio::test]
    async fn test_update_object_keeps_pk() {
        let db = InMemoryAdminDb::new();
        db.create_object("store.tag", map(json!({"label": "a"}))).await.unwrap();
        let row = db
            .update_object("store.tag", "1", map(json!({"id": 99, "label": "z"})))
            .await
            .unwrap();
        assert_eq!(row["id"], 1);
        assert_eq!(row["label"], "z");
    }

    #[tokio::test]
    async fn test_update_objects_counts_matches() {
        let db = InMemoryAdminDb::new();
        for inventory in [5, 50, 7] {
            db.create_object("store.product", map(json!({"inventory": inventory})))
                .await
                .unwrap();
        }
        let updated = db
            .update_objects(
                "store.product",
                &["1".to_string(), "3".to_string(), "8".to_string()],
                &map(json!({"inventory": 0})),
            )
            .await
            .unwrap();
        assert_eq!(updated, 2);

        let rows = db.all_objects("store.product").await.unwrap();
        let inventories: Vec<_> = rows.iter().map(|r| r["inventory"].clone()).collect();
        assert_eq!(inventories, vec![json!(0), json!(50), json!(0)]);
    }

    #[tokio::test]
    async fn test_delete_objects() {
        let db = InMemoryAdminDb::new();
        for label in ["a", "b", "c"] {
            db.create_object("store.tag", map(json!({"label": label}))).await.unwrap();
        }
        let deleted = db
            .delete_objects("store.tag", &["1".to_string(), "3".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(db.count("store.tag").unwrap(), 1);
        assert_eq!(db.delete_objects("store.none", &["1".to_string()]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_objects_where() {
        let db = InMemoryAdminDb::new();
        db.create_object("store.product", map(json!({"collection": 1}))).await.unwrap();
        db.create_object("store.product", map(json!({"collection": 2}))).await.unwrap();
        db.create_object("store.product", map(json!({"collection": 1}))).await.unwrap();
        let rows = db.objects_where("store.product", "collection", "1").await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_key_helpers() {
        assert_eq!(pk_of(&json!({"id": 4})), "4");
        assert_eq!(pk_of(&json!({})), "");
        assert_eq!(key_string(&json!("G")), "G");
        assert_eq!(key_string(&Value::Null), "");
        assert!(value_matches_pk(&json!(3), "3"));
        assert!(value_matches_pk(&json!(true), "true"));
        assert!(!value_matches_pk(&json!([1]), "1"));
    }
}
