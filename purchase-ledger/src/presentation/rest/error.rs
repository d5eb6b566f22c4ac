use crate::application::{ConvertedPurchaseError, CreatePurchaseError, GetPurchaseError};
use crate::presentation::rest::dto::ErrorResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// API error type
#[derive(Debug)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
    pub status: StatusCode,
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError {
            code: "NOT_FOUND",
            message: message.into(),
            status: StatusCode::NOT_FOUND,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError {
            code: "IDEMPOTENCY_CONFLICT",
            message: message.into(),
            status: StatusCode::CONFLICT,
        }
    }

    pub fn unprocessable(code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            status: StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn unavailable(code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            status: StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError {
            code: "INTERNAL",
            message: message.into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn invalid_parameter(param: &str, reason: &str) -> Self {
        Self::bad_request(
            "INVALID_PARAMETER",
            format!("Illegal parameter '{}': {}", param, reason),
        )
    }

    pub fn missing_parameter(param: &str) -> Self {
        Self::bad_request(
            "MISSING_PARAMETER",
            format!("Mandatory parameter '{}' was not sent", param),
        )
    }
}

impl From<CreatePurchaseError> for ApiError {
    fn from(e: CreatePurchaseError) -> Self {
        match e {
            CreatePurchaseError::Conflict { .. } => ApiError::conflict(e.to_string()),
            CreatePurchaseError::InvalidPurchase(inner) => {
                ApiError::bad_request("INVALID_PURCHASE", inner.to_string())
            }
            CreatePurchaseError::Storage(msg) => {
                tracing::error!(error = %msg, "Purchase create failed in storage");
                ApiError::internal("Storage failure")
            }
        }
    }
}

impl From<GetPurchaseError> for ApiError {
    fn from(e: GetPurchaseError) -> Self {
        match e {
            GetPurchaseError::NotFound(_) => ApiError::not_found(e.to_string()),
            GetPurchaseError::Storage(msg) => {
                tracing::error!(error = %msg, "Purchase read failed in storage");
                ApiError::internal("Storage failure")
            }
        }
    }
}

impl From<ConvertedPurchaseError> for ApiError {
    fn from(e: ConvertedPurchaseError) -> Self {
        match e {
            ConvertedPurchaseError::NotFound(_) => ApiError::not_found(e.to_string()),
            ConvertedPurchaseError::RateUnavailable { .. } => {
                ApiError::unprocessable("RATE_UNAVAILABLE", e.to_string())
            }
            ConvertedPurchaseError::RateSource(msg) => {
                tracing::warn!(error = %msg, "Rate source failed");
                ApiError::unavailable("RATE_SOURCE_UNAVAILABLE", "Exchange rate source unavailable")
            }
            ConvertedPurchaseError::Conversion(inner) => {
                ApiError::unprocessable("CONVERSION_FAILED", inner.to_string())
            }
            ConvertedPurchaseError::Storage(msg) => {
                tracing::error!(error = %msg, "Purchase read failed in storage");
                ApiError::internal("Storage failure")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::new(self.code, self.message));
        (self.status, body).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API Error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
