//! Fetch pipelines: subgraph pages to normalized tables to stores.

use alloy::primitives::Address;
use anyhow::Context;
use liquidations_api::{ProtocolVersion, QueryTransport, SubgraphClient};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

use crate::analytics::compute_kpis;
use crate::assets::Asset;
use crate::config::AnalyticsConfig;
use crate::events::{sort_newest_first, ActionType, LiquidationEvent, UserActionEvent};
use crate::normalize::{action_table, liquidation_table, normalize_liquidation};
use crate::state::AnalyticsState;

/// Progress is logged every this many (account, version) pairs.
const PROGRESS_EVERY: usize = 50;

/// Records gathered across one or more paginated fetches.
#[derive(Debug, Clone)]
pub struct FetchReport<R> {
    pub records: Vec<R>,
    /// False if any underlying fetch ended early
    pub complete: bool,
}

/// Result of a liquidation update.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationUpdate {
    pub fetched: usize,
    pub total: usize,
    pub total_btc: f64,
    pub total_usd: f64,
    pub per_version: Vec<(ProtocolVersion, usize)>,
    pub complete: bool,
}

/// Result of a user-action update.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionUpdate {
    pub fetched: usize,
    pub total: usize,
    pub deposits: usize,
    pub repays: usize,
    pub unique_accounts: usize,
    /// Fetched actions per asset symbol, most used first
    pub assets_used: Vec<(String, usize)>,
    pub complete: bool,
}

/// Window and pacing for user-action fetches.
#[derive(Debug, Clone, Copy)]
pub struct ActionFetchParams {
    pub min_size: f64,
    pub window_secs: i64,
    /// Pause after each per-account query
    pub pair_delay: Duration,
}

impl From<&AnalyticsConfig> for ActionFetchParams {
    fn from(config: &AnalyticsConfig) -> Self {
        Self {
            min_size: config.behavior.min_size,
            window_secs: config.behavior.window_secs(),
            pair_delay: config.fetch.action_delay(),
        }
    }
}

/// Liquidations of `asset` since `timestamp_from` from every subgraph listing it.
#[instrument(skip(client, asset), fields(asset = asset.key))]
pub async fn fetch_all_liquidations<T: QueryTransport>(
    client: &SubgraphClient<T>,
    asset: &Asset,
    timestamp_from: i64,
) -> FetchReport<LiquidationEvent> {
    let mut events = Vec::new();
    let mut complete = true;

    for &version in asset.subgraphs {
        let outcome = client
            .fetch_liquidations(version, asset.address, timestamp_from)
            .await;
        if !outcome.is_complete() {
            warn!(
                %version,
                status = ?outcome.status,
                fetched = outcome.records.len(),
                "Liquidation fetch ended early, data may be incomplete"
            );
            complete = false;
        }
        events.extend(
            outcome
                .records
                .into_iter()
                .map(|raw| normalize_liquidation(raw, version)),
        );
    }

    FetchReport { records: liquidation_table(events), complete }
}

/// Fetch the configured lookback of liquidations and merge them into the store.
pub async fn update_liquidations<T: QueryTransport>(
    state: &AnalyticsState,
    client: &SubgraphClient<T>,
    now: i64,
) -> anyhow::Result<LiquidationUpdate> {
    let asset = state.asset();
    let timestamp_from = now - state.config().fetch.lookback_secs();
    info!(
        asset = asset.key,
        days_back = state.config().fetch.days_back,
        subgraphs = ?asset.subgraphs,
        "Updating liquidations"
    );

    let report = fetch_all_liquidations(client, asset, timestamp_from).await;
    let fetched = report.records.len();
    let merged = state
        .upsert_liquidations(report.records)
        .with_context(|| format!("failed to save {} liquidations", asset.symbol))?;

    let kpi = compute_kpis(&merged);
    let per_version: Vec<_> = asset
        .subgraphs
        .iter()
        .map(|&v| (v, kpi.version_count(v)))
        .collect();

    info!(
        asset = asset.key,
        fetched,
        total = merged.len(),
        total_btc = kpi.total_btc,
        total_usd = kpi.total_usd,
        per_version = ?per_version,
        complete = report.complete,
        "Liquidation update finished"
    );

    Ok(LiquidationUpdate {
        fetched,
        total: merged.len(),
        total_btc: kpi.total_btc,
        total_usd: kpi.total_usd,
        per_version,
        complete: report.complete,
    })
}

/// Deposits and repays of every liquidatee of a qualifying liquidation.
///
/// Liquidations are grouped per (liquidatee, version); each group is queried
/// once over `[min_ts - window, max_ts]`. Liquidations on versions the asset
/// is not listed on are ignored.
#[instrument(skip_all, fields(asset = asset.key))]
pub async fn fetch_user_actions<T: QueryTransport>(
    client: &SubgraphClient<T>,
    asset: &Asset,
    liquidations: &[LiquidationEvent],
    params: &ActionFetchParams,
) -> FetchReport<UserActionEvent> {
    let mut groups: BTreeMap<(Address, ProtocolVersion), (i64, i64)> = BTreeMap::new();
    let mut qualifying = 0;
    for liq in liquidations
        .iter()
        .filter(|l| l.collateral_amount_btc >= params.min_size && asset.supports(l.version))
    {
        qualifying += 1;
        groups
            .entry((liq.liquidatee, liq.version))
            .and_modify(|(min, max)| {
                *min = (*min).min(liq.timestamp);
                *max = (*max).max(liq.timestamp);
            })
            .or_insert((liq.timestamp, liq.timestamp));
    }

    let users = groups.keys().map(|(a, _)| a).collect::<HashSet<_>>().len();
    info!(
        liquidations = qualifying,
        users,
        pairs = groups.len(),
        min_size = params.min_size,
        "Fetching user actions"
    );

    let mut records = Vec::new();
    let mut complete = true;
    let mut processed = 0;
    let total = groups.len();

    for ((account, version), (min_ts, max_ts)) in groups {
        let from = min_ts.saturating_sub(params.window_secs);

        for action_type in ActionType::ALL {
            let outcome = client
                .fetch_account_actions(version, action_type.entity(), account, from, max_ts)
                .await;
            if !outcome.is_complete() {
                warn!(
                    %account,
                    %version,
                    action = %action_type,
                    status = ?outcome.status,
                    "Action fetch ended early, data may be incomplete"
                );
                complete = false;
            }
            records.extend(action_table(outcome.records, action_type, version));
            sleep(params.pair_delay).await;
        }

        processed += 1;
        if processed % PROGRESS_EVERY == 0 {
            info!(processed, total, actions = records.len(), "User action progress");
        }
    }

    sort_newest_first(&mut records);
    FetchReport { records, complete }
}

/// Fetch actions for the selected asset's stored liquidations and merge them.
///
/// Returns `None` when the asset has no liquidation data yet.
pub async fn update_user_actions<T: QueryTransport>(
    state: &AnalyticsState,
    client: &SubgraphClient<T>,
) -> anyhow::Result<Option<ActionUpdate>> {
    let asset = state.asset();
    let liquidations = state
        .liquidations()
        .with_context(|| format!("failed to load {} liquidations", asset.symbol))?;
    if liquidations.records.is_empty() {
        info!(
            asset = asset.key,
            "No liquidation data, run `update {}` first", asset.key
        );
        return Ok(None);
    }

    let params = ActionFetchParams::from(state.config());
    info!(
        asset = asset.key,
        window_hours = state.config().behavior.window_hours,
        "Fetching pre-liquidation behavior"
    );
    let report = fetch_user_actions(client, asset, &liquidations.records, &params).await;

    let fetched = report.records.len();
    let deposits = report
        .records
        .iter()
        .filter(|a| a.action_type == ActionType::Deposit)
        .count();
    let unique_accounts = report
        .records
        .iter()
        .map(|a| a.account)
        .collect::<HashSet<_>>()
        .len();
    let mut usage: HashMap<&str, usize> = HashMap::new();
    for action in &report.records {
        *usage.entry(action.asset_symbol.as_str()).or_default() += 1;
    }
    let mut assets_used: Vec<(String, usize)> = usage
        .into_iter()
        .map(|(symbol, count)| (symbol.to_string(), count))
        .collect();
    assets_used.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let total = if report.records.is_empty() {
        info!(asset = asset.key, "No user actions found");
        state
            .actions()
            .with_context(|| format!("failed to load {} user actions", asset.symbol))?
            .records
            .len()
    } else {
        state
            .upsert_actions(report.records)
            .with_context(|| format!("failed to save {} user actions", asset.symbol))?
            .len()
    };

    info!(
        asset = asset.key,
        fetched,
        total,
        deposits,
        repays = fetched - deposits,
        unique_accounts,
        assets_used = ?assets_used,
        complete = report.complete,
        "User action update finished"
    );

    Ok(Some(ActionUpdate {
        fetched,
        total,
        deposits,
        repays: fetched - deposits,
        unique_accounts,
        assets_used,
        complete: report.complete,
    }))
}
