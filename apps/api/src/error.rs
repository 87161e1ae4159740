//! API error type and its HTTP rendering.
//!
//! Every failure leaves the server as the same JSON envelope the success
//! path uses:
//!
//! ```json
//! { "success": false, "message": "Cart is empty" }
//! { "success": false, "message": "Validation failed",
//!   "errors": { "phone": ["The phone field is required"] } }
//! ```

use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chai_core::ports::StoreError;
use chai_core::{CoreError, OtpRecord, ValidationError};
use serde_json::{json, Value};

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Request body or query string could not be parsed.
    #[error("{0}")]
    BadRequest(String),

    /// Missing, malformed, expired or revoked bearer token.
    #[error("{0}")]
    Unauthorized(String),

    /// Correct credentials for an account whose phone is not verified yet.
    /// A fresh OTP has been sent; `otp` is echoed only in development.
    #[error("Phone number not verified. OTP sent to your phone.")]
    VerificationRequired { phone: String, otp: Option<String> },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn verification_required(otp: &OtpRecord, expose_otp: bool) -> Self {
        ApiError::VerificationRequired {
            phone: otp.phone.clone(),
            otp: expose_otp.then(|| otp.code.to_string()),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(err) => core_status(err),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::VerificationRequired { .. } => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn core_status(err: &CoreError) -> StatusCode {
    match err {
        CoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        CoreError::AlreadyTaken { .. } => StatusCode::CONFLICT,
        CoreError::InvalidOtp
        | CoreError::AlreadyVerified
        | CoreError::CartEmpty
        | CoreError::ProductUnavailable { .. }
        | CoreError::ForeignVariant { .. }
        | CoreError::QuantityTooLarge { .. }
        | CoreError::InvalidStatusTransition { .. } => StatusCode::BAD_REQUEST,
        CoreError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
        CoreError::Store(StoreError::Conflict { .. } | StoreError::Stale(_)) => {
            StatusCode::CONFLICT
        }
        CoreError::Store(StoreError::Backend(_)) | CoreError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Client-facing message. Storage and collaborator details stay in the log.
fn core_message(err: &CoreError) -> String {
    match err {
        CoreError::Validation(_) => "Validation failed".to_string(),
        CoreError::InvalidStatusTransition { .. } => {
            "Order cannot be cancelled at this stage".to_string()
        }
        CoreError::Store(StoreError::NotFound { entity, .. }) => format!("{entity} not found"),
        CoreError::Store(StoreError::Conflict { field }) => {
            format!("The {field} has already been taken")
        }
        CoreError::Store(StoreError::Stale(_)) => {
            "Your cart changed while the order was being placed. Please try again.".to_string()
        }
        CoreError::Store(StoreError::Backend(_)) | CoreError::Internal(_) => {
            "Internal server error".to_string()
        }
        other => other.to_string(),
    }
}

fn validation_errors(err: &ValidationError) -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([(err.field().to_string(), vec![err.to_string()])])
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = match &self {
            ApiError::Core(CoreError::Validation(err)) => json!({
                "success": false,
                "message": "Validation failed",
                "errors": validation_errors(err),
            }),
            ApiError::Core(err) => json!({
                "success": false,
                "message": core_message(err),
            }),
            ApiError::VerificationRequired { phone, otp } => json!({
                "success": false,
                "message": self.to_string(),
                "data": { "phone": phone, "otp": otp },
            }),
            ApiError::Internal(_) => json!({
                "success": false,
                "message": "Internal server error",
            }),
            ApiError::BadRequest(message) | ApiError::Unauthorized(message) => json!({
                "success": false,
                "message": message,
            }),
        };

        (status, Json::<Value>(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Core(CoreError::Validation(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
