//! Process-wide caches keyed by collection type.

use crate::orm::collection::Collection;
use crate::orm::schema::Schema;
use once_cell::sync::Lazy;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

static SCHEMAS: Lazy<RwLock<HashMap<TypeId, Arc<Schema>>>> = Lazy::new(Default::default);

/// (collection type, database name) pairs whose unique indexes exist.
static INDEXED: Lazy<Mutex<HashSet<(TypeId, String)>>> = Lazy::new(Default::default);

/// Resolved schema of `C`, built on first use. The build runs outside the lock because
/// resolving ancestors re-enters this function; the first stored value is kept.
pub(crate) fn schema_of<C: Collection>() -> Arc<Schema> {
    let key = TypeId::of::<C>();
    if let Some(schema) = SCHEMAS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Arc::clone(schema);
    }
    let built = Arc::new(Schema::resolve(C::fields(), &C::ancestors()));
    let mut schemas = SCHEMAS.write().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(schemas.entry(key).or_insert(built))
}

pub(crate) fn is_indexed<C: Collection>(database: &str) -> bool {
    INDEXED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(&(TypeId::of::<C>(), database.to_string()))
}

pub(crate) fn mark_indexed<C: Collection>(database: &str) {
    INDEXED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert((TypeId::of::<C>(), database.to_string()));
}

/// Forget ensured indexes for `database`, e.g. after it was dropped.
pub(crate) fn forget_database(database: &str) {
    INDEXED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .retain(|(_, name)| name != database);
}
