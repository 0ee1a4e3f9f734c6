//! Standard response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::CREATED, Json(SuccessOne { data }))
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { data }))
}

/// `count` is the total matching the query, which may exceed `data.len()` when paged.
pub fn success_many<T: Serialize>(
    data: Vec<T>,
    count: u64,
) -> (StatusCode, Json<SuccessMany<T>>) {
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: MetaCount { count },
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn many_carries_total_count() {
        let (status, Json(body)) = success_many(vec![1, 2], 5);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "data": [1, 2], "meta": { "count": 5 } })
        );
    }

    #[test]
    fn one_is_wrapped_in_data() {
        let (status, Json(body)) = success_one("x");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(serde_json::to_value(&body).unwrap(), serde_json::json!({ "data": "x" }));
    }
}
