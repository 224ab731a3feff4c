// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::storage::LedgerDb;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerDb>,
}

impl AppState {
    pub fn new(ledger: LedgerDb) -> Self {
        Self {
            ledger: Arc::new(ledger),
        }
    }
}
