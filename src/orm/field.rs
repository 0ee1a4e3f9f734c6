use bson::{doc, Bson, Document};
use mongodb::options::IndexOptions;
use mongodb::IndexModel;

/// Default rule of a field: a constant, or a generator called once per new record.
#[derive(Clone, Debug)]
pub enum FieldDefault {
    Value(Bson),
    Producer(fn() -> Bson),
}

/// A declared attribute of a mapped record type.
#[derive(Clone, Debug)]
pub struct Field {
    default: FieldDefault,
    is_unique: bool,
}

impl Field {
    /// Field defaulting to null.
    pub fn new() -> Self {
        Field {
            default: FieldDefault::Value(Bson::Null),
            is_unique: false,
        }
    }

    pub fn with_default(value: impl Into<Bson>) -> Self {
        Field {
            default: FieldDefault::Value(value.into()),
            is_unique: false,
        }
    }

    /// The producer runs every time a default is needed, so time-based or random
    /// defaults differ per record.
    pub fn with_producer(producer: fn() -> Bson) -> Self {
        Field {
            default: FieldDefault::Producer(producer),
            is_unique: false,
        }
    }

    /// Require values to be unique across the collection (enforced by a unique index).
    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn is_unique(&self) -> bool {
        self.is_unique
    }

    pub fn default_value(&self) -> Bson {
        match &self.default {
            FieldDefault::Value(v) => v.clone(),
            FieldDefault::Producer(f) => f(),
        }
    }

    /// Ensure a unique index on `field_name`. No effect when the field is not unique or
    /// the index already exists.
    pub async fn create_index(
        &self,
        collection: &mongodb::Collection<Document>,
        field_name: &str,
    ) -> Result<(), mongodb::error::Error> {
        if !self.is_unique {
            return Ok(());
        }
        tracing::info!("Create unique index: {}: {}", collection.name(), field_name);
        let index = IndexModel::builder()
            .keys(doc! { field_name: 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        collection.create_index(index, None).await?;
        Ok(())
    }
}

impl Default for Field {
    fn default() -> Self {
        Self::new()
    }
}
