//! Pre-liquidation behavior classification.
//!
//! For every qualifying liquidation, the liquidatee's deposits and repays in
//! the closed window `[t - window, t]` decide one of four labels. Actions are
//! indexed by account once, then each window is a pair of binary searches.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::debug;

use crate::assets::Asset;
use crate::config::BehaviorConfig;
use crate::events::{ActionType, LiquidationEvent, UserActionEvent};

/// What a liquidated account did in the window before liquidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Behavior {
    #[serde(rename = "Passive")]
    Passive,
    #[serde(rename = "Deposit Only")]
    DepositOnly,
    #[serde(rename = "Repay Only")]
    RepayOnly,
    #[serde(rename = "Deposit + Repay")]
    DepositAndRepay,
}

impl Behavior {
    pub const ALL: [Behavior; 4] = [
        Behavior::Passive,
        Behavior::DepositOnly,
        Behavior::RepayOnly,
        Behavior::DepositAndRepay,
    ];

    pub fn from_activity(deposited: bool, repaid: bool) -> Self {
        match (deposited, repaid) {
            (true, true) => Self::DepositAndRepay,
            (true, false) => Self::DepositOnly,
            (false, true) => Self::RepayOnly,
            (false, false) => Self::Passive,
        }
    }

    /// Whether the account tried to defend the position.
    pub fn is_active(&self) -> bool {
        *self != Self::Passive
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Passive => "Passive",
            Self::DepositOnly => "Deposit Only",
            Self::RepayOnly => "Repay Only",
            Self::DepositAndRepay => "Deposit + Repay",
        }
    }
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A liquidation with its pre-liquidation behavior attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedLiquidation {
    #[serde(flatten)]
    pub event: LiquidationEvent,
    pub behavior: Behavior,
    pub deposit_count: usize,
    pub repay_count: usize,
    pub deposit_usd: f64,
    pub repay_usd: f64,
    /// Sorted, unique symbols deposited in the window
    pub deposit_assets: Vec<String>,
    /// Whether the liquidated collateral itself was deposited in the window
    pub deposited_collateral: bool,
    pub hours_before_last_action: Option<f64>,
}

impl ClassifiedLiquidation {
    fn passive(event: LiquidationEvent) -> Self {
        Self {
            event,
            behavior: Behavior::Passive,
            deposit_count: 0,
            repay_count: 0,
            deposit_usd: 0.0,
            repay_usd: 0.0,
            deposit_assets: Vec::new(),
            deposited_collateral: false,
            hours_before_last_action: None,
        }
    }
}

/// Size threshold and lookback window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierParams {
    /// Minimum liquidation size in native units
    pub min_size: f64,
    /// Lookback in seconds
    pub window_secs: i64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self { min_size: 1.0, window_secs: 48 * 3600 }
    }
}

impl From<&BehaviorConfig> for ClassifierParams {
    fn from(config: &BehaviorConfig) -> Self {
        Self {
            min_size: config.min_size,
            window_secs: config.window_secs(),
        }
    }
}

/// Actions grouped by account, each group in ascending time order.
pub struct ActionIndex<'a> {
    by_account: HashMap<Address, Vec<&'a UserActionEvent>>,
}

impl<'a> ActionIndex<'a> {
    pub fn new(actions: &'a [UserActionEvent]) -> Self {
        let mut by_account: HashMap<Address, Vec<&'a UserActionEvent>> = HashMap::new();
        for action in actions {
            by_account.entry(action.account).or_default().push(action);
        }
        for group in by_account.values_mut() {
            group.sort_by_key(|a| a.timestamp);
        }
        Self { by_account }
    }

    /// Actions by `account` with `from <= timestamp <= to`.
    pub fn window(&self, account: &Address, from: i64, to: i64) -> &[&'a UserActionEvent] {
        let Some(group) = self.by_account.get(account) else {
            return &[];
        };
        let start = group.partition_point(|a| a.timestamp < from);
        let end = group.partition_point(|a| a.timestamp <= to);
        if start >= end {
            &[]
        } else {
            &group[start..end]
        }
    }

    pub fn accounts(&self) -> usize {
        self.by_account.len()
    }
}

/// Classify every liquidation at or above `params.min_size`.
///
/// `asset` identifies the collateral; a deposit of that token in the window
/// sets `deposited_collateral`. Output keeps the input order.
pub fn classify_liquidations(
    liquidations: &[LiquidationEvent],
    actions: &[UserActionEvent],
    asset: &Asset,
    params: &ClassifierParams,
) -> Vec<ClassifiedLiquidation> {
    let qualifying = liquidations
        .iter()
        .filter(|l| l.collateral_amount_btc >= params.min_size);

    if actions.is_empty() {
        return qualifying.cloned().map(ClassifiedLiquidation::passive).collect();
    }

    let index = ActionIndex::new(actions);
    debug!(
        asset = asset.key,
        actions = actions.len(),
        accounts = index.accounts(),
        "Indexed user actions"
    );

    qualifying
        .map(|liq| classify_one(liq, &index, asset, params.window_secs))
        .collect()
}

fn classify_one(
    liq: &LiquidationEvent,
    index: &ActionIndex<'_>,
    asset: &Asset,
    window_secs: i64,
) -> ClassifiedLiquidation {
    let t = liq.timestamp;
    let window = index.window(&liq.liquidatee, t.saturating_sub(window_secs), t);

    let mut deposit_count = 0;
    let mut repay_count = 0;
    let mut deposit_usd = 0.0;
    let mut repay_usd = 0.0;
    let mut deposit_assets = BTreeSet::new();
    let mut deposited_collateral = false;

    for action in window {
        match action.action_type {
            ActionType::Deposit => {
                deposit_count += 1;
                deposit_usd += action.amount_usd;
                deposit_assets.insert(action.asset_symbol.clone());
                deposited_collateral |= action.asset_address == asset.address;
            }
            ActionType::Repay => {
                repay_count += 1;
                repay_usd += action.amount_usd;
            }
        }
    }

    // Window is sorted ascending, so the last entry is the latest action.
    let hours_before_last_action = window
        .last()
        .map(|latest| (t - latest.timestamp) as f64 / 3600.0);

    ClassifiedLiquidation {
        event: liq.clone(),
        behavior: Behavior::from_activity(deposit_count > 0, repay_count > 0),
        deposit_count,
        repay_count,
        deposit_usd,
        repay_usd,
        deposit_assets: deposit_assets.into_iter().collect(),
        deposited_collateral,
        hours_before_last_action,
    }
}
