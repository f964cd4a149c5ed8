//! Aave wrapped-BTC liquidation analytics.
//!
//! Commands:
//! - `update [asset|all] [--days N]`: fetch recent liquidations and merge them into the tables
//! - `fetch-behavior [asset|all] [--min-size BTC] [--window HOURS]`: fetch deposits/repays
//!   made before large liquidations
//! - `report [asset|all] [--min-size BTC] [--window HOURS]`: classify stored data and log the
//!   aggregates

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use liquidations_api::SubgraphClient;
use liquidations_core::analytics::{
    behavior_by_size, behavior_summary, compute_kpis, deposit_asset_breakdown, monthly_stats,
    size_distribution, top_liquidatees, top_liquidators,
};
use liquidations_core::{
    update_liquidations, update_user_actions, AnalyticsConfig, AnalyticsState, Asset, RunOverrides,
    REGISTRY,
};

/// Rows shown in top-N tables.
const TOP_N: usize = 10;

/// Aave wrapped-BTC liquidation analytics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Commands {
    /// Fetch recent liquidations and merge them into the tables
    Update {
        /// Asset key (`wbtc`, `cbbtc`) or `all`
        #[arg(default_value = "all")]
        asset: String,
        /// Days of history to fetch
        #[arg(long)]
        days: Option<u32>,
    },
    /// Fetch deposits/repays made before large liquidations
    FetchBehavior {
        /// Asset key (`wbtc`, `cbbtc`) or `all`
        #[arg(default_value = "all")]
        asset: String,
        /// Minimum liquidation size in BTC
        #[arg(long = "min-size", visible_alias = "min-wbtc")]
        min_size: Option<f64>,
        /// Hours before each liquidation to scan
        #[arg(long)]
        window: Option<u32>,
    },
    /// Classify stored data and log the aggregates
    Report {
        /// Asset key (`wbtc`, `cbbtc`) or `all`
        #[arg(default_value = "all")]
        asset: String,
        /// Minimum liquidation size in BTC
        #[arg(long = "min-size", visible_alias = "min-wbtc")]
        min_size: Option<f64>,
        /// Hours before each liquidation to scan
        #[arg(long)]
        window: Option<u32>,
    },
}

impl Commands {
    fn asset(&self) -> &str {
        match self {
            Self::Update { asset, .. } | Self::FetchBehavior { asset, .. } | Self::Report { asset, .. } => asset,
        }
    }

    fn overrides(&self) -> RunOverrides {
        match *self {
            Self::Update { days, .. } => RunOverrides { days_back: days, ..Default::default() },
            Self::FetchBehavior { min_size, window, .. } | Self::Report { min_size, window, .. } => {
                RunOverrides { min_size, window_hours: window, ..Default::default() }
            }
        }
    }

    fn needs_api(&self) -> bool {
        !matches!(self, Self::Report { .. })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,liquidations_core=debug,liquidations_api=debug")
            }),
        )
        .init();

    let cli = Cli::parse();
    let assets = REGISTRY.select(cli.command.asset())?;

    // ANALYTICS_CONFIG (TOML path) wins over ANALYTICS_PROFILE
    let mut config = AnalyticsConfig::from_env().context("failed to load configuration")?;
    config.apply_overrides(&cli.command.overrides());
    config.log_config();

    if cli.command.needs_api() && !config.api.has_api_key() {
        bail!("GRAPH_API_KEY not set. Set it in .env or as an environment variable.");
    }

    let Some(&first) = assets.first() else {
        bail!("No assets selected");
    };
    let mut state = AnalyticsState::new(config, first);
    for asset in assets {
        state.select_asset(asset);
        info!(asset = asset.key, symbol = asset.symbol, command = ?cli.command, "Running");
        match cli.command {
            Commands::Update { .. } => run_update(&state).await?,
            Commands::FetchBehavior { .. } => run_fetch_behavior(&state).await?,
            Commands::Report { .. } => run_report(&state)?,
        }
    }

    Ok(())
}

async fn run_update(state: &AnalyticsState) -> Result<()> {
    let config = state.config();
    let client = SubgraphClient::new(config.api.api_key.clone(), config.fetch.request_timeout())?
        .with_gateway_url(config.api.gateway_url.clone())
        .with_pagination(config.fetch.liquidation_pagination());

    let now = chrono::Utc::now().timestamp();
    let update = update_liquidations(state, &client, now).await?;
    if !update.complete {
        warn!(asset = state.asset().key, "Some subgraph fetches ended early; rerun to fill gaps");
    }
    Ok(())
}

async fn run_fetch_behavior(state: &AnalyticsState) -> Result<()> {
    let config = state.config();
    let client = SubgraphClient::new(config.api.api_key.clone(), config.fetch.request_timeout())?
        .with_gateway_url(config.api.gateway_url.clone())
        .with_pagination(config.fetch.action_pagination());

    match update_user_actions(state, &client).await? {
        Some(update) if !update.complete => {
            warn!(asset = state.asset().key, "Some action fetches ended early; rerun to fill gaps");
        }
        Some(_) => {}
        None => info!(asset = state.asset().key, "Skipped"),
    }
    Ok(())
}

fn run_report(state: &AnalyticsState) -> Result<()> {
    let asset: &Asset = state.asset();
    let liquidations = state.liquidations()?;
    if liquidations.is_missing() {
        info!(asset = asset.key, "No liquidation data, run `update {}` first", asset.key);
        return Ok(());
    }
    let records = &liquidations.records;

    let kpi = compute_kpis(records);
    info!(
        asset = asset.key,
        liquidations = kpi.total_liquidations,
        total_btc = kpi.total_btc,
        total_usd = kpi.total_usd,
        unique_liquidators = kpi.unique_liquidators,
        unique_liquidatees = kpi.unique_liquidatees,
        avg_usd = kpi.avg_liquidation_usd,
        max_usd = kpi.max_liquidation_usd,
        v2 = kpi.v2_count,
        v3 = kpi.v3_count,
        "KPI summary"
    );

    if let Some(latest) = monthly_stats(records).last() {
        info!(
            month = %latest.month,
            count = latest.count,
            total_btc = latest.total_btc,
            total_usd = latest.total_usd,
            "Latest month"
        );
    }

    for bracket in size_distribution(records) {
        info!(
            bracket = %bracket.bracket,
            count = bracket.count,
            total_btc = bracket.total_btc,
            total_usd = bracket.total_usd,
            "Size bracket"
        );
    }

    for (rank, top) in top_liquidators(records, TOP_N).iter().enumerate() {
        info!(rank = rank + 1, liquidator = %top.address, count = top.count, total_usd = top.total_usd, "Top liquidator");
    }
    for (rank, top) in top_liquidatees(records, TOP_N).iter().enumerate() {
        info!(rank = rank + 1, liquidatee = %top.address, count = top.count, total_usd = top.total_usd, "Top liquidatee");
    }

    let classified = state.classify()?;
    let summary = behavior_summary(&classified);
    info!(
        total = summary.total,
        passive = summary.passive,
        deposit_only = summary.deposit_only,
        repay_only = summary.repay_only,
        both = summary.both,
        pct_tried_save = summary.pct_tried_save,
        deposited_collateral = summary.deposited_collateral_count,
        avg_deposit_usd = ?summary.avg_deposit_usd,
        avg_repay_usd = ?summary.avg_repay_usd,
        min_size = state.config().behavior.min_size,
        "Behavior summary"
    );
    for cell in behavior_by_size(&classified) {
        info!(bracket = %cell.bracket, behavior = %cell.behavior, count = cell.count, "Behavior by size");
    }

    let actions = state.actions()?;
    for deposit in deposit_asset_breakdown(&classified, &actions.records) {
        info!(
            asset = %deposit.asset_symbol,
            count = deposit.count,
            total_usd = deposit.total_usd,
            unique_users = deposit.unique_users,
            "Deposited asset"
        );
    }

    Ok(())
}
