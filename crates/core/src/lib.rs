//! Wrapped-BTC liquidation analytics core.
//!
//! This crate provides:
//! - Asset registry for the tracked BTC wrappers
//! - Normalization of raw subgraph entities into typed records
//! - Per-asset JSON tables with merge-by-id upsert and legacy migration
//! - Fetch pipelines for liquidations and pre-liquidation user actions
//! - Windowed behavior classification
//! - Aggregations for reporting

pub mod amounts;
pub mod analytics;
mod assets;
pub mod classifier;
pub mod config;
pub mod events;
pub mod normalize;
pub mod pipeline;
mod state;
pub mod store;

pub use assets::{get_asset_config, Asset, AssetError, AssetRegistry, ASSETS, CBBTC, REGISTRY, WBTC};
pub use classifier::{classify_liquidations, ActionIndex, Behavior, ClassifiedLiquidation, ClassifierParams};
pub use config::{AnalyticsConfig, RunOverrides};
pub use events::{ActionType, LiquidationEvent, Record, UserActionEvent};
pub use pipeline::{
    fetch_all_liquidations, fetch_user_actions, update_liquidations, update_user_actions,
    ActionFetchParams, ActionUpdate, FetchReport, LiquidationUpdate,
};
pub use state::{AnalyticsState, DatasetCache};
pub use store::{merge_records, DatasetStore, LoadedTable, Presence, StoreError};
