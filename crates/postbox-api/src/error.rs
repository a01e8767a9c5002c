use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use postbox_db::StoreError;

/// Every failure this service reports to a caller. Raised at the point of
/// detection and propagated unchanged; the boundary mapping to a status
/// code lives in the `IntoResponse` impl below.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} is required")]
    MissingField(&'static str),
    /// Covers both unknown username and wrong password. The two cases must
    /// stay indistinguishable to the caller.
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("username taken, please pick another")]
    UsernameTaken,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("authentication required")]
    Unauthenticated,
    #[error("token expired")]
    TokenExpired,
    #[error("you do not have access to this resource")]
    Forbidden,
    #[error("recipient does not exist")]
    RecipientNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername => ApiError::UsernameTaken,
            other => ApiError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(anyhow::anyhow!("blocking task failed: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MissingField(_)
            | ApiError::InvalidCredentials
            | ApiError::UsernameTaken
            | ApiError::RecipientNotFound => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated | ApiError::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(err) => {
                error!("internal error: {err:#}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Internal details are logged, never returned.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (ApiError::MissingField("phone"), StatusCode::BAD_REQUEST),
            (ApiError::InvalidCredentials, StatusCode::BAD_REQUEST),
            (ApiError::UsernameTaken, StatusCode::BAD_REQUEST),
            (ApiError::RecipientNotFound, StatusCode::BAD_REQUEST),
            (ApiError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ApiError::TokenExpired, StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden, StatusCode::FORBIDDEN),
            (ApiError::NotFound("message"), StatusCode::NOT_FOUND),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn internal_detail_is_not_leaked() {
        let err = ApiError::Internal(anyhow::anyhow!("secret detail"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn duplicate_username_becomes_username_taken() {
        let err: ApiError = StoreError::DuplicateUsername.into();
        assert!(matches!(err, ApiError::UsernameTaken));
    }
}
