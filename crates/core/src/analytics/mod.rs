//! Pure, empty-safe aggregations over liquidation and classified tables.

mod behavior;
mod brackets;
mod filter;
mod kpi;
mod monthly;
mod ranking;

pub use behavior::{
    behavior_by_size, behavior_summary, deposit_asset_breakdown, BehaviorBySize, BehaviorSummary,
    DepositAssetStats,
};
pub use brackets::{size_distribution, BehaviorBracket, BracketStats, SizeBracket};
pub use filter::LiquidationFilter;
pub use kpi::{compute_kpis, KpiSummary};
pub use monthly::{
    monthly_by_size_bracket, monthly_by_version, monthly_stats, Month, MonthlyBracketStats,
    MonthlyStats, MonthlyVersionStats,
};
pub use ranking::{top_accounts, top_liquidatees, top_liquidators, AccountTotals, Party};
