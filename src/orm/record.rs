//! One mapped document: local values, last synced server values, and untouched defaults.

use crate::error::OrmError;
use crate::orm::collection::Collection;
use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use mongodb::Database;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

/// Reserved identity key of every stored document.
pub const ID_KEY: &str = "_id";

pub struct Record<C> {
    id: Option<ObjectId>,
    local: Document,
    defaults: HashSet<&'static str>,
    server: Document,
    _collection: PhantomData<fn() -> C>,
}

impl<C: Collection> Record<C> {
    /// New record with every field at its default.
    pub fn new() -> Self {
        let schema = C::schema();
        let mut local = Document::new();
        let mut defaults = HashSet::with_capacity(schema.len());
        for (name, field) in schema.iter() {
            local.insert(name, field.default_value());
            defaults.insert(name);
        }
        Record {
            id: None,
            local,
            defaults,
            server: Document::new(),
            _collection: PhantomData,
        }
    }

    /// New record with `values` set explicitly and defaults for the rest.
    /// An `_id` entry is taken as the identity and must be an `ObjectId`. Any other
    /// undeclared key is rejected.
    pub fn with_values(values: Document) -> Result<Self, OrmError> {
        let mut record = Self::new();
        for (key, value) in values {
            if key == ID_KEY {
                match value {
                    Bson::ObjectId(id) => record.id = Some(id),
                    other => return Err(OrmError::InvalidId(other)),
                }
                continue;
            }
            record.set(&key, value)?;
        }
        Ok(record)
    }

    /// Rebuild from a stored document. Every field counts as explicitly set and the
    /// server state matches.
    pub(crate) fn from_server(stored: Document) -> Self {
        let schema = C::schema();
        let mut local = Document::new();
        for name in schema.names() {
            local.insert(name, stored.get(name).cloned().unwrap_or(Bson::Null));
        }
        let mut record = Record {
            id: stored.get_object_id(ID_KEY).ok(),
            local,
            defaults: HashSet::new(),
            server: Document::new(),
            _collection: PhantomData,
        };
        record.sync_server_data();
        record
    }

    pub fn id(&self) -> Option<ObjectId> {
        self.id
    }

    pub fn get(&self, key: &str) -> Result<&Bson, OrmError> {
        self.local.get(key).ok_or_else(|| unknown_field::<C>(key))
    }

    /// Typed read of a field.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, OrmError> {
        let value = self.get(key)?.clone();
        bson::from_bson(value).map_err(|source| OrmError::Decode {
            field: key.to_string(),
            source,
        })
    }

    /// Assign a field. It stops counting as a default even if `value` equals the default.
    pub fn set(&mut self, key: &str, value: impl Into<Bson>) -> Result<&mut Self, OrmError> {
        let name = C::schema()
            .name_of(key)
            .ok_or_else(|| unknown_field::<C>(key))?;
        self.local.insert(name, value.into());
        self.defaults.remove(name);
        Ok(self)
    }

    /// True while `key` still holds its untouched default.
    pub fn is_default(&self, key: &str) -> bool {
        self.defaults.contains(key)
    }

    /// Local values, with `_id` first when present.
    pub fn to_document(&self) -> Document {
        let mut out = Document::new();
        if let Some(id) = self.id {
            out.insert(ID_KEY, id);
        }
        for (key, value) in &self.local {
            out.insert(key.clone(), value.clone());
        }
        out
    }

    /// Persist changes. Inserts when the record has no identity yet, otherwise `$set`s the
    /// changed fields by `_id`. Nothing is sent when nothing changed.
    pub async fn save(&mut self, db: &Database) -> Result<(), OrmError> {
        let update_data = self.update_data();
        if update_data.is_empty() {
            return Ok(());
        }
        let collection = C::collection(db).await?;
        match self.id {
            Some(id) => {
                tracing::debug!(collection = C::NAME, %id, fields = update_data.len(), "update");
                collection
                    .update_one(doc! { ID_KEY: id }, doc! { "$set": update_data }, None)
                    .await?;
            }
            None => {
                let res = collection.insert_one(update_data, None).await?;
                self.id = res.inserted_id.as_object_id();
                tracing::debug!(collection = C::NAME, id = ?self.id, "insert");
            }
        }
        self.sync_server_data();
        self.defaults.clear();
        Ok(())
    }

    /// Remove the stored document and forget the identity.
    pub async fn delete(&mut self, db: &Database) -> Result<(), OrmError> {
        let id = self.id.ok_or(OrmError::MissingId)?;
        C::collection(db)
            .await?
            .delete_one(doc! { ID_KEY: id }, None)
            .await?;
        tracing::debug!(collection = C::NAME, %id, "delete");
        self.id = None;
        self.server = Document::new();
        Ok(())
    }

    pub(crate) fn sync_server_data(&mut self) {
        self.server = self.local.clone();
    }

    /// Fields that differ from, or are missing in, the server state.
    pub(crate) fn update_data(&self) -> Document {
        self.local
            .iter()
            .filter(|(k, v)| self.server.get(k.as_str()) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Split into (explicitly set, still default). `_id` is in neither.
    pub(crate) fn upsert_data(&self) -> (Document, Document) {
        let mut set_data = Document::new();
        let mut default_data = Document::new();
        for (key, value) in &self.local {
            if self.defaults.contains(key.as_str()) {
                default_data.insert(key.clone(), value.clone());
            } else {
                set_data.insert(key.clone(), value.clone());
            }
        }
        (set_data, default_data)
    }
}

fn unknown_field<C: Collection>(key: &str) -> OrmError {
    OrmError::UnknownField {
        field: key.to_string(),
        collection: C::NAME,
    }
}

impl<C: Collection> Default for Record<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for Record<C> {
    fn clone(&self) -> Self {
        Record {
            id: self.id,
            local: self.local.clone(),
            defaults: self.defaults.clone(),
            server: self.server.clone(),
            _collection: PhantomData,
        }
    }
}

impl<C: Collection> fmt::Debug for Record<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("collection", &C::NAME)
            .field("id", &self.id)
            .field("local", &self.local)
            .finish()
    }
}

impl<C: Collection> Serialize for Record<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::Field;

    struct Person;

    impl Collection for Person {
        const NAME: &'static str = "person";

        fn fields() -> Vec<(&'static str, Field)> {
            vec![
                ("name", Field::new()),
                ("age", Field::with_default(18)),
                ("tags", Field::with_producer(|| Bson::Array(vec![]))),
            ]
        }
    }

    #[test]
    fn new_record_uses_defaults() {
        let person = Record::<Person>::new();
        assert_eq!(person.id(), None);
        assert_eq!(person.get("name").unwrap(), &Bson::Null);
        assert_eq!(person.get_as::<i32>("age").unwrap(), 18);
        assert!(person.is_default("age"));
        assert!(person.is_default("name"));
    }

    #[test]
    fn with_values_marks_fields_explicit() {
        let person = Record::<Person>::with_values(doc! { "name": "Bob", "age": 20 }).unwrap();
        assert_eq!(person.get_as::<String>("name").unwrap(), "Bob");
        assert!(!person.is_default("name"));
        assert!(!person.is_default("age"));
        assert!(person.is_default("tags"));
    }

    #[test]
    fn with_values_takes_id() {
        let id = ObjectId::new();
        let person = Record::<Person>::with_values(doc! { "_id": id, "name": "Bob" }).unwrap();
        assert_eq!(person.id(), Some(id));
    }

    #[test]
    fn with_values_rejects_non_object_id() {
        let res = Record::<Person>::with_values(doc! { "_id": "abc", "name": "Bob" });
        assert!(matches!(res, Err(OrmError::InvalidId(Bson::String(ref s))) if s == "abc"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut person = Record::<Person>::new();
        assert!(matches!(
            person.set("nickname", "B"),
            Err(OrmError::UnknownField { collection: "person", .. })
        ));
        assert!(matches!(person.get("nickname"), Err(OrmError::UnknownField { .. })));
        assert!(Record::<Person>::with_values(doc! { "nickname": "B" }).is_err());
    }

    #[test]
    fn setting_default_value_still_counts_as_explicit() {
        let mut person = Record::<Person>::new();
        person.set("age", 18).unwrap();
        assert!(!person.is_default("age"));
        let (set_data, default_data) = person.upsert_data();
        assert_eq!(set_data.get_i32("age").unwrap(), 18);
        assert!(!default_data.contains_key("age"));
    }

    #[test]
    fn get_as_reports_type_mismatch() {
        let person = Record::<Person>::with_values(doc! { "name": "Bob" }).unwrap();
        assert!(matches!(person.get_as::<i64>("name"), Err(OrmError::Decode { .. })));
    }

    #[test]
    fn update_data_is_full_record_before_sync() {
        let person = Record::<Person>::with_values(doc! { "name": "Bob" }).unwrap();
        let delta = person.update_data();
        assert_eq!(delta.len(), 3);
        assert!(!delta.contains_key(ID_KEY));
    }

    #[test]
    fn update_data_only_changed_fields_after_sync() {
        let mut person = Record::<Person>::with_values(doc! { "name": "Bob" }).unwrap();
        person.sync_server_data();
        assert!(person.update_data().is_empty());
        person.set("age", 17).unwrap();
        assert_eq!(person.update_data(), doc! { "age": 17 });
        person.set("age", 18).unwrap();
        assert!(person.update_data().is_empty());
    }

    #[test]
    fn upsert_data_splits_explicit_and_default() {
        let mut person = Record::<Person>::with_values(doc! { "_id": ObjectId::new() }).unwrap();
        person.set("name", "Alice").unwrap();
        let (set_data, default_data) = person.upsert_data();
        assert_eq!(set_data, doc! { "name": "Alice" });
        assert_eq!(default_data.keys().collect::<Vec<_>>(), vec!["age", "tags"]);
    }

    #[test]
    fn from_server_has_no_defaults_and_no_delta() {
        let id = ObjectId::new();
        let person = Record::<Person>::from_server(doc! { "_id": id, "name": "Bob", "extra": 1 });
        assert_eq!(person.id(), Some(id));
        assert_eq!(person.get("age").unwrap(), &Bson::Null);
        assert!(!person.is_default("age"));
        assert!(person.update_data().is_empty());
        assert!(person.get("extra").is_err());
    }

    #[test]
    fn to_document_puts_id_first() {
        let id = ObjectId::new();
        let person = Record::<Person>::with_values(doc! { "_id": id, "name": "Bob" }).unwrap();
        let document = person.to_document();
        assert_eq!(document.keys().next().map(String::as_str), Some(ID_KEY));
        assert_eq!(document.get_object_id(ID_KEY).unwrap(), id);
    }

    #[tokio::test]
    async fn delete_without_id_fails_before_touching_store() {
        let client = mongodb::Client::with_options(
            mongodb::options::ClientOptions::parse("mongodb://localhost:27017")
                .await
                .unwrap(),
        )
        .unwrap();
        let db = client.database("unused");
        let mut person = Record::<Person>::new();
        assert!(matches!(person.delete(&db).await, Err(OrmError::MissingId)));
    }
}
