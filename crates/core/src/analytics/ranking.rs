use alloy::primitives::Address;
use serde::Serialize;
use std::collections::HashMap;

use crate::events::LiquidationEvent;

/// Which side of a liquidation to rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Liquidator,
    Liquidatee,
}

impl Party {
    fn of(&self, event: &LiquidationEvent) -> Address {
        match self {
            Self::Liquidator => event.liquidator,
            Self::Liquidatee => event.liquidatee,
        }
    }
}

/// Totals for one ranked account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountTotals {
    pub address: Address,
    pub count: usize,
    pub total_btc: f64,
    pub total_usd: f64,
}

/// Top `n` accounts by total USD, descending. Ties keep first-appearance order.
pub fn top_accounts(events: &[LiquidationEvent], party: Party, n: usize) -> Vec<AccountTotals> {
    let mut slots: HashMap<Address, usize> = HashMap::new();
    let mut totals: Vec<AccountTotals> = Vec::new();

    for event in events {
        let address = party.of(event);
        let idx = *slots.entry(address).or_insert_with(|| {
            totals.push(AccountTotals { address, count: 0, total_btc: 0.0, total_usd: 0.0 });
            totals.len() - 1
        });
        let entry = &mut totals[idx];
        entry.count += 1;
        entry.total_btc += event.collateral_amount_btc;
        entry.total_usd += event.collateral_amount_usd;
    }

    // Stable sort preserves first appearance among equal totals.
    totals.sort_by(|a, b| b.total_usd.total_cmp(&a.total_usd));
    totals.truncate(n);
    totals
}

pub fn top_liquidators(events: &[LiquidationEvent], n: usize) -> Vec<AccountTotals> {
    top_accounts(events, Party::Liquidator, n)
}

pub fn top_liquidatees(events: &[LiquidationEvent], n: usize) -> Vec<AccountTotals> {
    top_accounts(events, Party::Liquidatee, n)
}
