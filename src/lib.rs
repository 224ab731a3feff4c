// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Nexus Ledger Server - Tiered Investment Platform Ledger
//!
//! This crate provides the accounting core of a tiered-investment platform:
//! the balance ledger, the deposit/withdrawal approval state machines, node
//! capital locking and the three-tier referral bonus cascade, backed by an
//! embedded ACID database and exposed over HTTP behind an authenticating
//! gateway.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Caller identity from gateway-injected headers
//! - `storage` - Ledger database and entity repositories (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
