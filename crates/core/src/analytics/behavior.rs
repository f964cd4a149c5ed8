//! Rollups over classified liquidations.

use alloy::primitives::Address;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::brackets::BehaviorBracket;
use crate::classifier::{Behavior, ClassifiedLiquidation};
use crate::events::{ActionType, UserActionEvent};

/// Counts per behavior plus deposit/repay averages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BehaviorSummary {
    pub total: usize,
    pub passive: usize,
    pub deposit_only: usize,
    pub repay_only: usize,
    pub both: usize,
    /// Share of liquidations with any defensive action, in percent
    pub pct_tried_save: f64,
    pub deposited_collateral_count: usize,
    /// Mean over rows that deposited anything
    pub avg_deposit_usd: Option<f64>,
    /// Mean over rows that repaid anything
    pub avg_repay_usd: Option<f64>,
}

impl BehaviorSummary {
    pub fn count(&self, behavior: Behavior) -> usize {
        match behavior {
            Behavior::Passive => self.passive,
            Behavior::DepositOnly => self.deposit_only,
            Behavior::RepayOnly => self.repay_only,
            Behavior::DepositAndRepay => self.both,
        }
    }
}

fn positive_mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .filter(|v| *v > 0.0)
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

pub fn behavior_summary(rows: &[ClassifiedLiquidation]) -> BehaviorSummary {
    if rows.is_empty() {
        return BehaviorSummary::default();
    }

    let mut summary = BehaviorSummary { total: rows.len(), ..Default::default() };
    for row in rows {
        match row.behavior {
            Behavior::Passive => summary.passive += 1,
            Behavior::DepositOnly => summary.deposit_only += 1,
            Behavior::RepayOnly => summary.repay_only += 1,
            Behavior::DepositAndRepay => summary.both += 1,
        }
        if row.deposited_collateral {
            summary.deposited_collateral_count += 1;
        }
    }

    summary.pct_tried_save = (summary.total - summary.passive) as f64 / summary.total as f64 * 100.0;
    summary.avg_deposit_usd = positive_mean(rows.iter().map(|r| r.deposit_usd));
    summary.avg_repay_usd = positive_mean(rows.iter().map(|r| r.repay_usd));
    summary
}

/// Behavior counts within one size bracket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviorBySize {
    pub bracket: BehaviorBracket,
    pub behavior: Behavior,
    pub count: usize,
}

/// Non-empty (bracket, behavior) cells, bracket order then behavior order.
/// Rows below 1 are not bucketed.
pub fn behavior_by_size(rows: &[ClassifiedLiquidation]) -> Vec<BehaviorBySize> {
    let mut cells: BTreeMap<(BehaviorBracket, Behavior), usize> = BTreeMap::new();
    for row in rows {
        if let Some(bracket) = BehaviorBracket::of(row.event.collateral_amount_btc) {
            *cells.entry((bracket, row.behavior)).or_default() += 1;
        }
    }
    cells
        .into_iter()
        .map(|((bracket, behavior), count)| BehaviorBySize { bracket, behavior, count })
        .collect()
}

/// Deposits of one asset by liquidated accounts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepositAssetStats {
    pub asset_symbol: String,
    pub count: usize,
    pub total_usd: f64,
    pub unique_users: usize,
}

/// What liquidated accounts deposited, by asset, sorted by USD descending.
///
/// Covers every stored deposit of an account that appears as a liquidatee
/// in `rows`, not only deposits inside a classification window.
pub fn deposit_asset_breakdown(
    rows: &[ClassifiedLiquidation],
    actions: &[UserActionEvent],
) -> Vec<DepositAssetStats> {
    let liquidatees: HashSet<Address> = rows.iter().map(|r| r.event.liquidatee).collect();

    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut stats: Vec<(DepositAssetStats, HashSet<Address>)> = Vec::new();

    let deposits = actions
        .iter()
        .filter(|a| a.action_type == ActionType::Deposit && liquidatees.contains(&a.account));
    for deposit in deposits {
        let idx = *slots.entry(deposit.asset_symbol.as_str()).or_insert_with(|| {
            stats.push((
                DepositAssetStats {
                    asset_symbol: deposit.asset_symbol.clone(),
                    count: 0,
                    total_usd: 0.0,
                    unique_users: 0,
                },
                HashSet::new(),
            ));
            stats.len() - 1
        });
        let (entry, users) = &mut stats[idx];
        entry.count += 1;
        entry.total_usd += deposit.amount_usd;
        users.insert(deposit.account);
    }

    let mut out: Vec<DepositAssetStats> = stats
        .into_iter()
        .map(|(mut entry, users)| {
            entry.unique_users = users.len();
            entry
        })
        .collect();
    out.sort_by(|a, b| b.total_usd.total_cmp(&a.total_usd));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::WBTC;
    use crate::classifier::{classify_liquidations, ClassifierParams};
    use crate::events::fixtures::*;

    fn classified() -> (Vec<ClassifiedLiquidation>, Vec<UserActionEvent>) {
        let (a, b, c) = (account(0xa1), account(0xb2), account(0xc3));
        let liquidations = vec![
            liquidation("L1", a, 10_000, 2.0, 1.0),
            liquidation("L2", b, 10_000, 7.0, 1.0),
            liquidation("L3", c, 10_000, 60.0, 1.0),
            liquidation("L4", a, 20_000, 3.0, 1.0),
        ];
        let actions = vec![
            action("d1", a, ActionType::Deposit, 9_000, ("WBTC", WBTC_ADDR), 400.0),
            action("r1", b, ActionType::Repay, 9_500, ("USDC", USDC_ADDR), 100.0),
            action("d2", b, ActionType::Deposit, 9_600, ("USDC", USDC_ADDR), 200.0),
            action("d3", account(0xdd), ActionType::Deposit, 9_600, ("USDC", USDC_ADDR), 999.0),
        ];
        let params = ClassifierParams { min_size: 1.0, window_secs: 3_600 };
        (classify_liquidations(&liquidations, &actions, &WBTC, &params), actions)
    }

    #[test]
    fn test_empty_summary() {
        let summary = behavior_summary(&[]);
        assert_eq!(summary, BehaviorSummary::default());
        assert_eq!(summary.avg_deposit_usd, None);
        assert!(behavior_by_size(&[]).is_empty());
        assert!(deposit_asset_breakdown(&[], &[]).is_empty());
    }

    #[test]
    fn test_summary() {
        let (rows, _) = classified();
        let summary = behavior_summary(&rows);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.passive, 2);
        assert_eq!(summary.deposit_only, 1);
        assert_eq!(summary.both, 1);
        assert_eq!(summary.repay_only, 0);
        assert_eq!(summary.pct_tried_save, 50.0);
        assert_eq!(summary.deposited_collateral_count, 1);
        assert_eq!(summary.avg_deposit_usd, Some(300.0));
        assert_eq!(summary.avg_repay_usd, Some(100.0));
        let counted: usize = Behavior::ALL.iter().map(|b| summary.count(*b)).sum();
        assert_eq!(counted, summary.total);
    }

    #[test]
    fn test_behavior_by_size() {
        let (rows, _) = classified();
        let cells: Vec<_> = behavior_by_size(&rows)
            .into_iter()
            .map(|c| (c.bracket, c.behavior, c.count))
            .collect();

        assert_eq!(
            cells,
            vec![
                (BehaviorBracket::OneToFive, Behavior::Passive, 1),
                (BehaviorBracket::OneToFive, Behavior::DepositOnly, 1),
                (BehaviorBracket::FiveToTen, Behavior::DepositAndRepay, 1),
                (BehaviorBracket::OverFifty, Behavior::Passive, 1),
            ]
        );
    }

    #[test]
    fn test_deposit_asset_breakdown() {
        let (rows, actions) = classified();
        let breakdown = deposit_asset_breakdown(&rows, &actions);

        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].asset_symbol, "WBTC");
        assert_eq!(breakdown[0].total_usd, 400.0);
        assert_eq!(breakdown[1].asset_symbol, "USDC");
        assert_eq!(breakdown[1].count, 1);
        assert_eq!(breakdown[1].unique_users, 1);
    }
}
