use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;
use serde_json::{Map, Value};

use api_types::ErrorBody;
pub use access::WorkspaceAccess;
pub use auth::{AuthConfig, AuthUser, decode_token, issue_token};
pub use server::{ServerState, router, run, run_with_listener};

mod access;
mod analytics;
mod auth;
mod budgets;
mod categories;
mod extract;
mod health;
mod members;
mod server;
mod transactions;
mod user;
mod workspaces;

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Unauthorized,
    BadRequest {
        error: String,
        details: Map<String, Value>,
    },
    Forbidden {
        error: String,
        details: Map<String, Value>,
    },
    NotFound(String),
    /// An extractor refused the request; keeps the extractor's status.
    Rejected {
        status: StatusCode,
        error: String,
        details: Map<String, Value>,
    },
}

impl ServerError {
    pub(crate) fn bad_request(error: &str, id: &str) -> Self {
        Self::BadRequest {
            error: error.to_string(),
            details: details([("id", id)]),
        }
    }
}

pub(crate) fn details<const N: usize>(pairs: [(&str, &str); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::InvalidId(_) => StatusCode::BAD_REQUEST,
        EngineError::InvalidCredentials | EngineError::InvalidRefreshToken => {
            StatusCode::UNAUTHORIZED
        }
        EngineError::KeyNotFound(_) | EngineError::UserNotFound | EngineError::MemberNotFound => {
            StatusCode::NOT_FOUND
        }
        EngineError::ExistingKey(_)
        | EngineError::AlreadyMember
        | EngineError::CannotSelfDemote
        | EngineError::LastOwner => StatusCode::CONFLICT,
        EngineError::Validation(_) | EngineError::InvalidRole(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EngineError::CorruptedRole(_) | EngineError::Internal(_) | EngineError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    if err.is_internal() {
        tracing::error!("internal error: {err}");
        return "internal server error".to_string();
    }
    err.to_string()
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error, details) = match self {
            ServerError::Engine(err) => (
                status_for_engine_error(&err),
                message_for_engine_error(err),
                None,
            ),
            ServerError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "unauthenticated".to_string(), None)
            }
            ServerError::BadRequest { error, details } => {
                (StatusCode::BAD_REQUEST, error, Some(details))
            }
            ServerError::Forbidden { error, details } => {
                (StatusCode::FORBIDDEN, error, Some(details))
            }
            ServerError::NotFound(error) => (StatusCode::NOT_FOUND, error, None),
            ServerError::Rejected {
                status,
                error,
                details,
            } => (status, error, Some(details)),
        };

        (status, Json(ErrorBody { error, details })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
