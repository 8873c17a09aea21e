use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::{auth::jwt::TokenError, db::StoreError};

/// Every failure a request can end in. Each maps to one status code and the
/// `{ "error": ... }` body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{}", token_message(.0))]
    InvalidToken(TokenError),

    #[error("User not found")]
    UserNotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Method not allowed")]
    MethodNotAllowed(&'static str),

    #[error("Internal server error")]
    Upstream(#[from] anyhow::Error),
}

fn token_message(e: &TokenError) -> &'static str {
    match e {
        TokenError::Expired => "Token expired",
        TokenError::InvalidSignature | TokenError::Malformed => "Invalid token",
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::InvalidToken(_) | ApiError::UserNotFound => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::InvalidCredentials => StatusCode::BAD_REQUEST,
            ApiError::DuplicateEmail => StatusCode::CONFLICT,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Upstream(e.into())
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        ApiError::InvalidToken(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Upstream(e) = &self {
            error!(error = ?e, "upstream failure");
        }

        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        let mut res = (status, Json(body)).into_response();

        if let ApiError::MethodNotAllowed(allow) = self {
            res.headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(allow));
        }
        res
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
