// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for the ledger database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

/// Environment variable name for the data directory path.
///
/// The ledger database file lives inside this directory. Every account
/// balance, pending request, node contract and bonus record is stored there.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Default data directory when `DATA_DIR` is not set.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// File name of the redb ledger database inside the data directory.
pub const LEDGER_DB_FILE: &str = "nexus.redb";
