//! Document mapping: record types backed by MongoDB collections.
//!
//! ```ignore
//! struct User;
//!
//! impl Collection for User {
//!     const NAME: &'static str = "user";
//!
//!     fn fields() -> Vec<(&'static str, Field)> {
//!         vec![
//!             ("uid", Field::with_producer(now).unique()),
//!             ("name", Field::new()),
//!             ("age", Field::with_default(18)),
//!         ]
//!     }
//! }
//!
//! let mut user = Record::<User>::with_values(doc! { "name": "Bob" })?; // age 18
//! user.save(&db).await?;
//! let bob = User::find_one(&db, doc! { "name": "Bob" }).await?;
//! ```

mod collection;
mod field;
mod record;
mod registry;
mod schema;

pub use collection::{Collection, RecordId, RecordStream};
pub use field::{Field, FieldDefault};
pub use record::{Record, ID_KEY};
pub use schema::Schema;

pub(crate) use registry::forget_database;
