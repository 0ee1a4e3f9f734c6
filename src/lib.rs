//! Web toolset: MongoDB document mapping and composable route tables for axum.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod orm;
pub mod response;
pub mod router;
pub mod routes;
pub mod server;
pub mod state;
pub mod testing;

pub use app::make_app;
pub use config::{DbConfig, Listen, ServerConfig};
pub use db::connect;
pub use error::{AppError, ConfigError, OrmError, RouteError};
pub use orm::{Collection, Field, FieldDefault, Record, RecordId, RecordStream, Schema};
pub use response::{success_many, success_one, success_one_ok};
pub use router::{Route, RouteMeta, Router};
pub use routes::common_routes;
pub use server::serve;
pub use state::AppState;
