// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Caller Identity Module
//!
//! Credential verification (login, token issuance, password reset) lives in
//! the authenticating gateway in front of this service. The gateway strips
//! any client-supplied identity headers and injects its own after
//! verifying the session:
//!
//! - `x-account-id`: the authenticated account id
//! - `x-account-role`: `user` (default) or `admin`
//!
//! This module only parses those trusted headers. Handlers take
//! [`Identity`] to require a caller and [`AdminOnly`] to additionally gate
//! on the admin role.

pub mod error;
pub mod extractor;

pub use error::AuthError;
pub use extractor::{AdminOnly, Identity};

/// Header carrying the authenticated account id.
pub const ACCOUNT_ID_HEADER: &str = "x-account-id";

/// Header carrying the caller's role. Absent means `user`.
pub const ACCOUNT_ROLE_HEADER: &str = "x-account-role";

/// Caller role established by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

/// The authenticated caller, as established by the gateway.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    /// Account id of the caller.
    pub account_id: String,
    /// Role of the caller.
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("Admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert!("root".parse::<Role>().is_err());
    }
}
