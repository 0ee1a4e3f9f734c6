//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::error::{ErrorKind, WriteFailure};
use serde::Serialize;
use thiserror::Error;

/// MongoDB server error code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Startup and configuration errors. Fatal: the process should not proceed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("DB: missing replica set for hosts {0:?}")]
    MissingReplicaSet(Vec<String>),
    #[error("DB: database auth failed for user '{0}'")]
    AuthFailed(String),
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
    #[error("DB: connect: {0}")]
    Connect(#[source] mongodb::error::Error),
}

/// Route table entries that cannot be served together.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("route path '{0}' must start with '/'")]
    InvalidPath(String),
    #[error("route '{path}' conflicts with '{existing}'")]
    Conflict { path: String, existing: String },
    #[error("route '{path}': {reason}")]
    Overlap { path: String, reason: String },
}

/// Errors from the document mapping layer.
#[derive(Error, Debug)]
pub enum OrmError {
    #[error("{field} is not an attribute of {collection}")]
    UnknownField {
        field: String,
        collection: &'static str,
    },
    #[error("missing _id field")]
    MissingId,
    #[error("_id must be an ObjectId, got {0}")]
    InvalidId(bson::Bson),
    #[error("decode field '{field}': {source}")]
    Decode {
        field: String,
        #[source]
        source: bson::de::Error,
    },
    #[error("database: {0}")]
    Db(#[from] mongodb::error::Error),
}

impl OrmError {
    /// True when the store rejected a write because of a unique index.
    pub fn is_duplicate_key(&self) -> bool {
        let OrmError::Db(err) = self else {
            return false;
        };
        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY_CODE,
            ErrorKind::Command(e) => e.code == DUPLICATE_KEY_CODE,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Orm(#[from] OrmError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Orm(e) if e.is_duplicate_key() => (StatusCode::CONFLICT, "conflict"),
            AppError::Orm(OrmError::UnknownField { .. } | OrmError::InvalidId(_)) => {
                (StatusCode::BAD_REQUEST, "bad_request")
            }
            AppError::Orm(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
