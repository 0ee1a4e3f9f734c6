//! User handlers: create, list, read, upsert by name, delete.

use crate::model::User;
use axum::extract::{Path, Query, State};
use axum::routing::{get, put, MethodRouter};
use axum::Json;
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::options::FindOptions;
use serde::Deserialize;
use serde_json::Value;
use web_toolset::{
    success_many, success_one, success_one_ok, AppError, AppState, Collection, Record, Router,
};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

pub fn route() -> Router<MethodRouter<AppState>> {
    let mut route = Router::new();
    route.mount_handler("", get(list).post(create));
    route.mount_handler("/by-name/:name", put(upsert_by_name));
    route.mount_handler("/:id", get(read).delete(remove));
    route
}

fn body_to_document(body: Value) -> Result<Document, AppError> {
    match body {
        Value::Object(_) => {
            bson::to_document(&body).map_err(|e| AppError::BadRequest(e.to_string()))
        }
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let mut user = Record::<User>::with_values(body_to_document(body)?)?;
    user.save(&state.db).await.map_err(|e| {
        if e.is_duplicate_key() {
            AppError::Conflict("user already exists".into())
        } else {
            e.into()
        }
    })?;
    Ok(success_one(user))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    name: Option<String>,
    skip: Option<u64>,
    limit: Option<i64>,
}

async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let filter = match &params.name {
        Some(name) => doc! { User::NAME_FIELD: name.as_str() },
        None => Document::new(),
    };
    let mut options = FindOptions::default();
    options.sort = Some(doc! { User::NAME_FIELD: 1 });
    options.skip = params.skip;
    options.limit = Some(params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT));
    let total = User::count(&state.db, filter.clone()).await?;
    let users: Vec<Record<User>> = User::find_many(&state.db, filter, Some(options))
        .await?
        .try_collect()
        .await?;
    Ok(success_many(users, total))
}

async fn read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let user = User::from_id(&state.db, (&id).into())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", id)))?;
    Ok(success_one_ok(user))
}

/// Set the given fields on the user called `name`, creating it with defaults if missing.
async fn upsert_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let mut user = Record::<User>::with_values(body_to_document(body)?)?;
    if user.is_default(User::NAME_FIELD) {
        user.set(User::NAME_FIELD, name.as_str())?;
    }
    let inserted = User::upsert(&state.db, &user, doc! { User::NAME_FIELD: name.as_str() }).await?;
    let stored_name = user.get(User::NAME_FIELD)?.clone();
    let stored = User::find_one(&state.db, doc! { User::NAME_FIELD: stored_name })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", name)))?;
    if inserted.is_some() {
        Ok(success_one(stored))
    } else {
        Ok(success_one_ok(stored))
    }
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let mut user = User::from_id(&state.db, (&id).into())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", id)))?;
    user.delete(&state.db).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
