// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Storage Module
//!
//! Persistent storage for the platform ledger, backed by **redb** (pure
//! Rust, embedded, ACID).
//!
//! ## Transaction Model
//!
//! A unit of work is one redb write transaction. [`LedgerDb`]
//! owns the database handle and is the only place transactions are opened
//! and committed; the per-entity repositories under [`repository`] express
//! their mutations against a caller-supplied `WriteTransaction` and hold no
//! transaction boundary of their own.
//!
//! ## Entity Collections
//!
//! ```text
//! accounts            balance + referral edge          (hub)
//! deposits            pending → approved/declined      claims
//! withdrawals         pending → approved/declined      reservations
//! nodes               capital locks, perpetually active
//! node_activity       append-only audit log per node
//! referral_bonuses    append-only cascade payouts
//! idempotency_keys    create-op replay protection
//! ```
//!
//! Account is the hub: every other collection references it by id.

pub mod ledger;
pub mod repository;

pub use ledger::{LedgerDb, LedgerError, LedgerResult, LedgerStats};
pub use repository::{
    Account, Deposit, Node, NodeActivity, NodeStatus, ReferralBonus, RequestStatus, Withdrawal,
};
