// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Referral cascade engine: three-tier bonus settlement on node activation.
//!
//! When an account locks capital into a node, its referral ancestors are
//! paid a fixed share of the principal: 7% at tier 1 (direct referrer), 3%
//! at tier 2 and 1% at tier 3. The walk stops early at the first missing
//! parent and never exceeds three hops; the hop limit is a business rule
//! and the safety bound against a malformed (cyclic) parent graph.
//!
//! Crediting a beneficiary and inserting the matching bonus row happen
//! together inside the activation's write transaction; a failure anywhere
//! rolls back the debit, the node and every partial bonus.
//!
//! ## Table Layout
//!
//! - `referral_bonuses`: bonus_id → serialized ReferralBonus (JSON bytes)
//! - `bonus_account_idx`: composite key (beneficiary|!timestamp|id)

use chrono::{DateTime, Utc};
use redb::{ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::super::ledger::LedgerResult;
use super::{accounts, entity_id_from_key, owner_index_key, owner_prefix, owner_prefix_end};

pub(crate) const BONUSES: TableDefinition<&str, &[u8]> = TableDefinition::new("referral_bonuses");
pub(crate) const BONUS_ACCOUNT_IDX: TableDefinition<&[u8], ()> =
    TableDefinition::new("bonus_account_idx");

/// Maximum referral depth the cascade will ever walk.
pub const MAX_TIER: u8 = 3;

/// One tiered payout triggered by a downline activation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReferralBonus {
    /// Unique bonus identifier (UUID).
    pub bonus_id: String,
    /// Beneficiary account credited with the bonus.
    pub account_id: String,
    /// The account whose activation triggered the payout. Always the
    /// original activator, at every tier.
    pub referred_account_id: String,
    /// Bonus amount (principal × tier percentage).
    pub amount: Decimal,
    /// Cascade depth: 1 = direct referrer, 2, 3.
    pub tier: u8,
    /// When the bonus was settled.
    pub created_at: DateTime<Utc>,
}

/// Share of the principal paid at each tier.
fn tier_rate(tier: u8) -> Decimal {
    match tier {
        1 => Decimal::new(7, 2),
        2 => Decimal::new(3, 2),
        _ => Decimal::new(1, 2),
    }
}

/// Walk the activator's referral ancestors and settle tiered bonuses.
///
/// Runs inside the activation's write transaction. Returns the bonuses
/// created, one per reached tier, in tier order.
pub(crate) fn cascade(
    txn: &WriteTransaction,
    activator_id: &str,
    principal: Decimal,
) -> LedgerResult<Vec<ReferralBonus>> {
    let mut bonuses = Vec::new();
    let mut current = activator_id.to_string();

    for tier in 1..=MAX_TIER {
        let Some(beneficiary) = accounts::referrer_of(txn, &current)? else {
            break;
        };

        let amount = principal * tier_rate(tier);
        accounts::adjust_balance(txn, &beneficiary, amount)?;

        let bonus = ReferralBonus {
            bonus_id: Uuid::new_v4().to_string(),
            account_id: beneficiary.clone(),
            referred_account_id: activator_id.to_string(),
            amount,
            tier,
            created_at: Utc::now(),
        };
        insert(txn, &bonus)?;
        bonuses.push(bonus);

        current = beneficiary;
    }

    Ok(bonuses)
}

/// Insert a bonus row and its beneficiary index entry.
pub(crate) fn insert(txn: &WriteTransaction, bonus: &ReferralBonus) -> LedgerResult<()> {
    let json = serde_json::to_vec(bonus)?;
    {
        let mut table = txn.open_table(BONUSES)?;
        table.insert(bonus.bonus_id.as_str(), json.as_slice())?;
    }
    let mut idx = txn.open_table(BONUS_ACCOUNT_IDX)?;
    let key = owner_index_key(
        &bonus.account_id,
        bonus.created_at.timestamp_millis(),
        &bonus.bonus_id,
    );
    idx.insert(key.as_slice(), ())?;
    Ok(())
}

/// Newest-first bonus history for a beneficiary.
pub(crate) fn bonuses_by_beneficiary(
    txn: &ReadTransaction,
    account_id: &str,
) -> LedgerResult<Vec<ReferralBonus>> {
    let idx = txn.open_table(BONUS_ACCOUNT_IDX)?;
    let table = txn.open_table(BONUSES)?;

    let prefix = owner_prefix(account_id);
    let end = owner_prefix_end(account_id);

    let mut bonuses = Vec::new();
    for entry in idx.range(prefix.as_slice()..end.as_slice())? {
        let entry = entry?;
        if let Some(id) = entity_id_from_key(entry.0.value()) {
            if let Some(value) = table.get(id.as_str())? {
                bonuses.push(serde_json::from_slice::<ReferralBonus>(value.value())?);
            }
        }
    }
    Ok(bonuses)
}

/// Total count and settled amount across all bonuses. Admin stats.
pub(crate) fn totals(txn: &ReadTransaction) -> LedgerResult<(usize, Decimal)> {
    let table = txn.open_table(BONUSES)?;
    let mut count = 0;
    let mut total = Decimal::ZERO;
    for entry in table.iter()? {
        let entry = entry?;
        let bonus: ReferralBonus = serde_json::from_slice(entry.1.value())?;
        count += 1;
        total += bonus.amount;
    }
    Ok((count, total))
}
