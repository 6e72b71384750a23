//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cart::CartError;
use checkout::CheckoutError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or unusable authentication.
    Unauthorized(String),
    /// Cart operation error.
    Cart(CartError),
    /// Checkout or reconciliation error.
    Checkout(CheckoutError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, error_body(msg)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, error_body(msg)),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, error_body(msg)),
            ApiError::Cart(err) => cart_error_to_response(err),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, error_body(msg))
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

fn error_body(message: impl std::fmt::Display) -> serde_json::Value {
    serde_json::json!({ "error": message.to_string() })
}

fn cart_error_to_response(err: CartError) -> (StatusCode, serde_json::Value) {
    match &err {
        CartError::ProductNotFound(_) | CartError::LineNotFound(_) | CartError::CartNotFound => {
            (StatusCode::NOT_FOUND, error_body(&err))
        }
        CartError::ProductInactive(_) | CartError::InvalidQuantity => {
            (StatusCode::BAD_REQUEST, error_body(&err))
        }
        // Enough detail for the client to adjust and retry.
        CartError::InsufficientStock {
            available, in_cart, ..
        } => (
            StatusCode::BAD_REQUEST,
            serde_json::json!({
                "error": err.to_string(),
                "available_stock": available,
                "in_cart": in_cart,
            }),
        ),
        CartError::NotModifiable { .. } | CartError::ConcurrencyExhausted => {
            (StatusCode::CONFLICT, error_body(&err))
        }
        CartError::Store(inner) => store_error_to_response(inner, err.to_string()),
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, serde_json::Value) {
    match &err {
        CheckoutError::EmptyCart
        | CheckoutError::IntentMismatch { .. }
        | CheckoutError::InvalidSignature(_)
        | CheckoutError::Serialization(_) => (StatusCode::BAD_REQUEST, error_body(&err)),
        CheckoutError::PaymentNotSucceeded { .. } => (StatusCode::BAD_REQUEST, error_body(&err)),
        CheckoutError::InsufficientStock { available, .. } => (
            StatusCode::BAD_REQUEST,
            serde_json::json!({
                "error": err.to_string(),
                "available_stock": available,
            }),
        ),
        CheckoutError::OrderNotFound(_) => (StatusCode::NOT_FOUND, error_body(&err)),
        CheckoutError::CartNotReady { .. } | CheckoutError::ConcurrencyExhausted => {
            (StatusCode::CONFLICT, error_body(&err))
        }
        CheckoutError::Provider(_) => {
            tracing::error!(error = %err, "payment provider call failed");
            (StatusCode::BAD_GATEWAY, error_body(&err))
        }
        CheckoutError::InventoryInconsistency { .. } => {
            tracing::error!(error = %err, "order/inventory state diverged");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(&err))
        }
        CheckoutError::Store(inner) => store_error_to_response(inner, err.to_string()),
    }
}

fn store_error_to_response(err: &StoreError, message: String) -> (StatusCode, serde_json::Value) {
    match err {
        StoreError::ProductNotFound(_)
        | StoreError::CartNotFound(_)
        | StoreError::OrderNotFound(_) => (StatusCode::NOT_FOUND, error_body(&message)),
        StoreError::VersionConflict { .. } | StoreError::DuplicateOpenCart { .. } => {
            (StatusCode::CONFLICT, error_body(&message))
        }
        _ => {
            tracing::error!(error = %message, "store error");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(&message))
        }
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        ApiError::Cart(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::OrderNotFound(_) | StoreError::CartNotFound(_)
            | StoreError::ProductNotFound(_) => ApiError::NotFound(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}
