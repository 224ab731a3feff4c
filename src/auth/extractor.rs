// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the gateway-established caller identity.
//!
//! Use `Identity` in handlers to require a caller:
//!
//! ```rust,ignore
//! async fn my_handler(Identity(caller): Identity) -> impl IntoResponse {
//!     // caller is CallerIdentity
//! }
//! ```
//!
//! `AdminOnly` additionally rejects non-admin callers with 403.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, CallerIdentity, Role, ACCOUNT_ID_HEADER, ACCOUNT_ROLE_HEADER};

/// Extractor for the authenticated caller.
#[derive(Debug)]
pub struct Identity(pub CallerIdentity);

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account_id = parts
            .headers
            .get(ACCOUNT_ID_HEADER)
            .ok_or(AuthError::MissingIdentity)?
            .to_str()
            .map_err(|_| AuthError::InvalidIdentity)?
            .trim()
            .to_string();

        if account_id.is_empty() {
            return Err(AuthError::InvalidIdentity);
        }

        let role = match parts.headers.get(ACCOUNT_ROLE_HEADER) {
            Some(value) => value
                .to_str()
                .map_err(|_| AuthError::InvalidIdentity)?
                .parse::<Role>()
                .map_err(|_| AuthError::InvalidIdentity)?,
            None => Role::User,
        };

        Ok(Identity(CallerIdentity { account_id, role }))
    }
}

/// Extractor that requires the admin role.
#[derive(Debug)]
pub struct AdminOnly(pub CallerIdentity);

impl<S: Send + Sync> FromRequestParts<S> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Identity(caller) = Identity::from_request_parts(parts, state).await?;
        if caller.role != Role::Admin {
            return Err(AuthError::Forbidden);
        }
        Ok(AdminOnly(caller))
    }
}
