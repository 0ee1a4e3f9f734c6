//! Class-level operations of a mapped collection type.

use crate::error::OrmError;
use crate::orm::field::Field;
use crate::orm::record::{Record, ID_KEY};
use crate::orm::registry;
use crate::orm::schema::Schema;
use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{doc, Document};
use futures::stream::{BoxStream, StreamExt};
use mongodb::options::{FindOneOptions, FindOptions, UpdateOptions};
use mongodb::Database;
use std::sync::Arc;

/// Lazy, single-pass sequence of records read from one cursor.
pub type RecordStream<C> = BoxStream<'static, Result<Record<C>, OrmError>>;

/// Identity given either natively or in its 24-char hex form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordId<'a> {
    Native(ObjectId),
    Text(&'a str),
}

impl RecordId<'_> {
    /// `None` for text that is not a valid object id.
    pub fn to_object_id(&self) -> Option<ObjectId> {
        match self {
            RecordId::Native(id) => Some(*id),
            RecordId::Text(s) => ObjectId::parse_str(s).ok(),
        }
    }
}

impl From<ObjectId> for RecordId<'static> {
    fn from(id: ObjectId) -> Self {
        RecordId::Native(id)
    }
}

impl<'a> From<&'a str> for RecordId<'a> {
    fn from(s: &'a str) -> Self {
        RecordId::Text(s)
    }
}

impl<'a> From<&'a String> for RecordId<'a> {
    fn from(s: &'a String) -> Self {
        RecordId::Text(s.as_str())
    }
}

/// A record type stored in the collection [`Collection::NAME`].
///
/// Implementors declare their own fields and, optionally, the schemas of the types they
/// build on. Everything else is provided.
#[async_trait]
pub trait Collection: Sized + Send + Sync + 'static {
    const NAME: &'static str;

    /// Fields declared directly on this type, in declaration order.
    fn fields() -> Vec<(&'static str, Field)>;

    /// Resolved schemas this type inherits from, nearest first (e.g. `vec![Parent::schema()]`).
    fn ancestors() -> Vec<Arc<Schema>> {
        Vec::new()
    }

    /// Resolved field list, computed on first use and cached for the process.
    fn schema() -> Arc<Schema> {
        registry::schema_of::<Self>()
    }

    fn field_names() -> Vec<&'static str> {
        Self::schema().names().collect()
    }

    /// Driver handle for this collection. The first call per database ensures the
    /// unique indexes of the schema.
    async fn collection(db: &Database) -> Result<mongodb::Collection<Document>, OrmError> {
        let collection = db.collection::<Document>(Self::NAME);
        if !registry::is_indexed::<Self>(db.name()) {
            let schema = Self::schema();
            for (name, field) in schema.iter() {
                field.create_index(&collection, name).await?;
            }
            registry::mark_indexed::<Self>(db.name());
        }
        Ok(collection)
    }

    async fn find_one(db: &Database, filter: Document) -> Result<Option<Record<Self>>, OrmError> {
        Self::find_one_with(db, filter, None).await
    }

    async fn find_one_with(
        db: &Database,
        filter: Document,
        options: Option<FindOneOptions>,
    ) -> Result<Option<Record<Self>>, OrmError> {
        let found = Self::collection(db).await?.find_one(filter, options).await?;
        Ok(found.map(Record::from_server))
    }

    /// Records matching `filter`. Each call opens a new cursor; `options` carries
    /// sort, skip and limit.
    async fn find_many(
        db: &Database,
        filter: Document,
        options: Option<FindOptions>,
    ) -> Result<RecordStream<Self>, OrmError> {
        let cursor = Self::collection(db).await?.find(filter, options).await?;
        Ok(cursor
            .map(|res| res.map(Record::from_server).map_err(OrmError::from))
            .boxed())
    }

    async fn count(db: &Database, filter: Document) -> Result<u64, OrmError> {
        Ok(Self::collection(db)
            .await?
            .count_documents(filter, None)
            .await?)
    }

    /// Look up by identity. Text that is not a valid object id yields `None` without a query.
    async fn from_id(db: &Database, id: RecordId<'_>) -> Result<Option<Record<Self>>, OrmError> {
        let Some(id) = id.to_object_id() else {
            return Ok(None);
        };
        Self::find_one(db, doc! { ID_KEY: id }).await
    }

    /// Insert-or-update the document matching `filter` in one atomic call. Explicitly
    /// set fields always overwrite; fields still at their default are written only when
    /// a new document is created. Returns the new `_id` when one was inserted.
    async fn upsert(
        db: &Database,
        record: &Record<Self>,
        filter: Document,
    ) -> Result<Option<ObjectId>, OrmError> {
        let (set_data, default_data) = record.upsert_data();
        let mut update = Document::new();
        if !set_data.is_empty() {
            update.insert("$set", set_data);
        }
        if !default_data.is_empty() {
            update.insert("$setOnInsert", default_data);
        }
        if update.is_empty() {
            tracing::debug!(collection = Self::NAME, "upsert skipped: schema has no fields");
            return Ok(None);
        }
        let mut options = UpdateOptions::default();
        options.upsert = Some(true);
        let res = Self::collection(db)
            .await?
            .update_one(filter, update, options)
            .await?;
        Ok(res.upserted_id.and_then(|id| id.as_object_id()))
    }

    /// Apply the explicitly set fields of `record` to the document matching `filter`.
    /// Never inserts. Returns whether a document matched; `false` without a query when
    /// nothing was explicitly set.
    async fn update(
        db: &Database,
        record: &Record<Self>,
        filter: Document,
    ) -> Result<bool, OrmError> {
        let (set_data, _) = record.upsert_data();
        if set_data.is_empty() {
            return Ok(false);
        }
        let res = Self::collection(db)
            .await?
            .update_one(filter, doc! { "$set": set_data }, None)
            .await?;
        Ok(res.matched_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::Bson;

    struct Account;

    impl Collection for Account {
        const NAME: &'static str = "account";

        fn fields() -> Vec<(&'static str, Field)> {
            vec![
                ("login", Field::new().unique()),
                ("name", Field::with_default("anonymous")),
            ]
        }
    }

    struct Profile;

    impl Collection for Profile {
        const NAME: &'static str = "profile";

        fn fields() -> Vec<(&'static str, Field)> {
            vec![("bio", Field::new()), ("name", Field::with_default("guest"))]
        }
    }

    struct AccountProfile;

    impl Collection for AccountProfile {
        const NAME: &'static str = "account_profile";

        fn fields() -> Vec<(&'static str, Field)> {
            vec![]
        }

        fn ancestors() -> Vec<Arc<Schema>> {
            vec![Account::schema(), Profile::schema()]
        }
    }

    #[test]
    fn field_names_follow_declaration_order() {
        assert_eq!(Account::field_names(), vec!["login", "name"]);
    }

    #[test]
    fn inherited_names_keep_nearer_definition() {
        assert_eq!(AccountProfile::field_names(), vec!["login", "name", "bio"]);
        assert_eq!(
            AccountProfile::schema().get("name").unwrap().default_value(),
            Bson::String("anonymous".into())
        );
    }

    #[test]
    fn schema_is_cached_per_type() {
        assert!(Arc::ptr_eq(&Account::schema(), &Account::schema()));
        assert!(!Arc::ptr_eq(&Account::schema(), &Profile::schema()));
    }

    #[test]
    fn record_id_parses_text() {
        let id = ObjectId::new();
        let text = id.to_hex();
        assert_eq!(RecordId::from(&text).to_object_id(), Some(id));
        assert_eq!(RecordId::from(id).to_object_id(), Some(id));
        assert_eq!(RecordId::from("not-an-id").to_object_id(), None);
    }

    #[tokio::test]
    async fn from_id_with_invalid_text_does_not_query() {
        let client = mongodb::Client::with_options(
            mongodb::options::ClientOptions::parse("mongodb://localhost:27017")
                .await
                .unwrap(),
        )
        .unwrap();
        let db = client.database("unused");
        let found = Account::from_id(&db, "xyz".into()).await.unwrap();
        assert!(found.is_none());
    }
}
