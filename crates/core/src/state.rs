//! Explicit application state: configuration, selected asset, cached tables.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::assets::Asset;
use crate::classifier::{classify_liquidations, ClassifiedLiquidation, ClassifierParams};
use crate::config::AnalyticsConfig;
use crate::events::{LiquidationEvent, UserActionEvent};
use crate::store::{DatasetStore, LoadedTable, StoreError};

/// Cached table with timestamp for TTL expiration.
struct CachedTable<R> {
    table: Arc<LoadedTable<R>>,
    cached_at: Instant,
}

/// Loaded tables keyed by asset, expiring after a fixed TTL.
pub struct DatasetCache<R> {
    entries: DashMap<&'static str, CachedTable<R>>,
    ttl: Duration,
}

impl<R> std::fmt::Debug for DatasetCache<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetCache")
            .field("cache_size", &self.entries.len())
            .field("cache_ttl", &self.ttl)
            .finish()
    }
}

impl<R> DatasetCache<R> {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: DashMap::new(), ttl }
    }

    /// Fresh entry for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Arc<LoadedTable<R>>> {
        let cached = self.entries.get(key)?;
        if cached.cached_at.elapsed() < self.ttl {
            debug!(
                asset = key,
                cache_age_ms = cached.cached_at.elapsed().as_millis(),
                "Cache hit for table"
            );
            Some(Arc::clone(&cached.table))
        } else {
            None
        }
    }

    pub fn insert(&self, key: &'static str, table: LoadedTable<R>) -> Arc<LoadedTable<R>> {
        let table = Arc::new(table);
        self.entries.insert(key, CachedTable { table: Arc::clone(&table), cached_at: Instant::now() });
        table
    }

    /// Return the cached table or load and cache it.
    pub fn get_or_load(
        &self,
        key: &'static str,
        load: impl FnOnce() -> Result<LoadedTable<R>, StoreError>,
    ) -> Result<Arc<LoadedTable<R>>, StoreError> {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        debug!(asset = key, "Cache miss, loading table");
        Ok(self.insert(key, load()?))
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop expired entries.
    pub fn cleanup(&self) {
        self.entries.retain(|_, cached| cached.cached_at.elapsed() < self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a command needs, passed explicitly.
///
/// Reads go through the per-asset caches; every write through the state
/// invalidates the written table's entry.
#[derive(Debug)]
pub struct AnalyticsState {
    config: AnalyticsConfig,
    asset: &'static Asset,
    liquidations: DatasetCache<LiquidationEvent>,
    actions: DatasetCache<UserActionEvent>,
}

impl AnalyticsState {
    pub fn new(config: AnalyticsConfig, asset: &'static Asset) -> Self {
        let liquidations = DatasetCache::new(config.cache.liquidations_ttl());
        let actions = DatasetCache::new(config.cache.actions_ttl());
        Self { config, asset, liquidations, actions }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn asset(&self) -> &'static Asset {
        self.asset
    }

    /// Switch the selected asset. Cached tables of other assets are kept.
    pub fn select_asset(&mut self, asset: &'static Asset) {
        self.asset = asset;
    }

    pub fn liquidation_store(&self) -> DatasetStore<LiquidationEvent> {
        DatasetStore::liquidations(&self.config.data_dir, self.asset)
    }

    pub fn action_store(&self) -> DatasetStore<UserActionEvent> {
        DatasetStore::user_actions(&self.config.data_dir, self.asset)
    }

    pub fn classifier_params(&self) -> ClassifierParams {
        ClassifierParams::from(&self.config.behavior)
    }

    /// Liquidation table of the selected asset.
    pub fn liquidations(&self) -> Result<Arc<LoadedTable<LiquidationEvent>>, StoreError> {
        let store = self.liquidation_store();
        self.liquidations.get_or_load(self.asset.key, || store.load())
    }

    /// User-action table of the selected asset.
    pub fn actions(&self) -> Result<Arc<LoadedTable<UserActionEvent>>, StoreError> {
        let store = self.action_store();
        self.actions.get_or_load(self.asset.key, || store.load())
    }

    /// Merge `incoming` into the liquidation table.
    pub fn upsert_liquidations(
        &self,
        incoming: Vec<LiquidationEvent>,
    ) -> Result<Vec<LiquidationEvent>, StoreError> {
        let merged = self.liquidation_store().upsert(incoming);
        self.liquidations.invalidate(self.asset.key);
        merged
    }

    /// Merge `incoming` into the user-action table.
    pub fn upsert_actions(
        &self,
        incoming: Vec<UserActionEvent>,
    ) -> Result<Vec<UserActionEvent>, StoreError> {
        let merged = self.action_store().upsert(incoming);
        self.actions.invalidate(self.asset.key);
        merged
    }

    /// Classify the selected asset's stored liquidations.
    pub fn classify(&self) -> Result<Vec<ClassifiedLiquidation>, StoreError> {
        let liquidations = self.liquidations()?;
        let actions = self.actions()?;
        Ok(classify_liquidations(
            &liquidations.records,
            &actions.records,
            self.asset,
            &self.classifier_params(),
        ))
    }
}
