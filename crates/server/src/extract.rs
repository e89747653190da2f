//! Body and query extractors whose rejections use the JSON error body.
//!
//! axum's own `Json` and `Query` reject with plain text; these wrappers keep
//! the rejection status and move its message into `details.reason`.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::{ServerError, details};

/// `Json<T>` with a `{error: "invalid json", details: {reason}}` rejection.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                let reason = rejection.body_text();
                tracing::debug!(status = %rejection.status(), %reason, "json body rejected");
                Err(ServerError::Rejected {
                    status: rejection.status(),
                    error: "invalid json".to_string(),
                    details: details([("reason", reason.as_str())]),
                })
            }
        }
    }
}

/// `Query<T>` with a `{error: "invalid query", details: {reason}}` rejection.
#[derive(Debug)]
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => {
                let reason = rejection.body_text();
                Err(ServerError::Rejected {
                    status: rejection.status(),
                    error: "invalid query".to_string(),
                    details: details([("reason", reason.as_str())]),
                })
            }
        }
    }
}
