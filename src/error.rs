// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP error envelope and the mapping from the ledger error taxonomy.
//!
//! Business-rule violations surface as structured JSON errors:
//!
//! | Kind | Status |
//! |------|--------|
//! | `InvalidInput` | 400 |
//! | `NotFound` | 404 |
//! | `InvalidStateTransition` | 422 |
//! | `InsufficientFunds` | 422 |
//! | `Internal` (storage/serialization) | 500 |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::storage::LedgerError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match &err {
            LedgerError::InvalidInput(msg) => ApiError::bad_request(msg.clone()),
            LedgerError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            LedgerError::InvalidStateTransition(_) | LedgerError::InsufficientFunds { .. } => {
                ApiError::unprocessable(err.to_string())
            }
            _ => {
                tracing::error!(error = %err, "ledger operation failed");
                ApiError::internal("Internal storage error")
            }
        }
    }
}
