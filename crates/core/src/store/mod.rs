//! Per-asset persisted tables with merge-by-id upsert.
//!
//! Each table is a JSON document `{"schema_version": 1, "records": [...]}`.
//! Saves go to a sibling temp file first and are renamed over the target, so
//! readers never observe a half-written table.

pub mod migration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::assets::Asset;
use crate::events::{sort_newest_first, LiquidationEvent, Record, UserActionEvent};
use migration::{migrate_action_row, migrate_liquidation_row, RowMigration};

/// Current on-disk document version.
pub const SCHEMA_VERSION: u32 = 1;

/// Store failures. Missing files are not errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Legacy file {} does not match the expected shape: {source}", path.display())]
    LegacySchema {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported schema version {found} in {}", path.display())]
    UnsupportedSchema { path: PathBuf, found: u32 },
}

/// Where a loaded table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Nothing has ever been persisted
    Missing,
    /// Read from the current path
    Current,
    /// Read through the legacy fallback; the next save writes the current path
    Legacy,
}

/// Records plus their provenance.
#[derive(Debug, Clone)]
pub struct LoadedTable<R> {
    pub records: Vec<R>,
    pub presence: Presence,
}

impl<R> LoadedTable<R> {
    pub fn missing() -> Self {
        Self { records: Vec::new(), presence: Presence::Missing }
    }

    pub fn is_missing(&self) -> bool {
        self.presence == Presence::Missing
    }
}

#[derive(Deserialize)]
struct Document<R> {
    schema_version: u32,
    records: Vec<R>,
}

#[derive(Serialize)]
struct DocumentRef<'a, R> {
    schema_version: u32,
    records: &'a [R],
}

/// A pre-rename file and the row transform that brings it up to date.
#[derive(Debug, Clone)]
pub struct LegacySource {
    pub path: PathBuf,
    pub migrate: RowMigration,
}

/// Table file bound to one asset and record type.
#[derive(Debug, Clone)]
pub struct DatasetStore<R> {
    path: PathBuf,
    legacy: Option<LegacySource>,
    _record: PhantomData<fn() -> R>,
}

impl DatasetStore<LiquidationEvent> {
    /// `{data_dir}/{asset}_liquidations.json`
    pub fn liquidations(data_dir: impl AsRef<Path>, asset: &Asset) -> Self {
        let data_dir = data_dir.as_ref();
        let store = Self::new(data_dir.join(format!("{}_liquidations.json", asset.key)));
        if asset.legacy_files {
            store.with_legacy(data_dir.join("liquidations.json"), migrate_liquidation_row)
        } else {
            store
        }
    }
}

impl DatasetStore<UserActionEvent> {
    /// `{data_dir}/{asset}_user_actions.json`
    pub fn user_actions(data_dir: impl AsRef<Path>, asset: &Asset) -> Self {
        let data_dir = data_dir.as_ref();
        let store = Self::new(data_dir.join(format!("{}_user_actions.json", asset.key)));
        if asset.legacy_files {
            store.with_legacy(data_dir.join("user_actions.json"), migrate_action_row)
        } else {
            store
        }
    }
}

impl<R> DatasetStore<R>
where
    R: Record + Serialize + DeserializeOwned + Clone,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), legacy: None, _record: PhantomData }
    }

    pub fn with_legacy(mut self, path: impl Into<PathBuf>, migrate: RowMigration) -> Self {
        self.legacy = Some(LegacySource { path: path.into(), migrate });
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the table, falling back to the legacy file when one is declared.
    ///
    /// Never writes. A legacy table moves to the current path on the next
    /// [`save`](Self::save) or [`upsert`](Self::upsert).
    pub fn load(&self) -> Result<LoadedTable<R>, StoreError> {
        if self.path.exists() {
            let records = self.read_current()?;
            debug!(path = %self.path.display(), count = records.len(), "Loaded table");
            return Ok(LoadedTable { records, presence: Presence::Current });
        }

        let Some(legacy) = &self.legacy else {
            return Ok(LoadedTable::missing());
        };
        if !legacy.path.exists() {
            return Ok(LoadedTable::missing());
        }

        let records = read_legacy(legacy)?;
        info!(
            from = %legacy.path.display(),
            count = records.len(),
            "Read legacy table"
        );
        Ok(LoadedTable { records, presence: Presence::Legacy })
    }

    /// Atomically replace the table with `records`.
    pub fn save(&self, records: &[R]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }

        let tmp = self.tmp_path();
        let file = File::create(&tmp).map_err(|source| StoreError::Io { path: tmp.clone(), source })?;
        let mut writer = BufWriter::new(file);
        let document = DocumentRef { schema_version: SCHEMA_VERSION, records };
        serde_json::to_writer(&mut writer, &document)
            .map_err(|source| StoreError::Encode { path: self.path.clone(), source })?;
        writer
            .flush()
            .map_err(|source| StoreError::Io { path: tmp.clone(), source })?;
        drop(writer);

        fs::rename(&tmp, &self.path).map_err(|source| self.io_error(source))?;
        debug!(path = %self.path.display(), count = records.len(), "Saved table");
        Ok(())
    }

    /// Load, merge `incoming` over the existing records, save.
    pub fn upsert(&self, incoming: Vec<R>) -> Result<Vec<R>, StoreError> {
        let existing = self.load()?;
        let before = existing.records.len();
        let merged = merge_records(existing.records, incoming);
        self.save(&merged)?;
        if existing.presence == Presence::Legacy {
            info!(to = %self.path.display(), "Migrated legacy table");
        }
        info!(
            path = %self.path.display(),
            before,
            after = merged.len(),
            "Upserted table"
        );
        Ok(merged)
    }

    fn read_current(&self) -> Result<Vec<R>, StoreError> {
        let file = File::open(&self.path).map_err(|source| self.io_error(source))?;
        let document: Document<R> = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| StoreError::Decode { path: self.path.clone(), source })?;
        if document.schema_version != SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                path: self.path.clone(),
                found: document.schema_version,
            });
        }
        Ok(document.records)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io { path: self.path.clone(), source }
    }
}

fn read_legacy<R: DeserializeOwned>(legacy: &LegacySource) -> Result<Vec<R>, StoreError> {
    let file = File::open(&legacy.path)
        .map_err(|source| StoreError::Io { path: legacy.path.clone(), source })?;
    let rows: Vec<Map<String, Value>> = serde_json::from_reader(BufReader::new(file))
        .map_err(|source| StoreError::LegacySchema { path: legacy.path.clone(), source })?;

    rows.into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object((legacy.migrate)(row)))
                .map_err(|source| StoreError::LegacySchema { path: legacy.path.clone(), source })
        })
        .collect()
}

/// Concatenate, keep the last occurrence of each id, sort newest first.
pub fn merge_records<R: Record>(existing: Vec<R>, incoming: Vec<R>) -> Vec<R> {
    let combined: Vec<R> = existing.into_iter().chain(incoming).collect();

    let mut last_seen: HashMap<&str, usize> = HashMap::with_capacity(combined.len());
    for (idx, record) in combined.iter().enumerate() {
        last_seen.insert(record.id(), idx);
    }
    let keep: Vec<bool> = combined
        .iter()
        .enumerate()
        .map(|(idx, record)| last_seen.get(record.id()) == Some(&idx))
        .collect();

    let mut merged: Vec<R> = combined
        .into_iter()
        .zip(keep)
        .filter_map(|(record, keep)| keep.then_some(record))
        .collect();
    sort_newest_first(&mut merged);
    merged
}

#[cfg(test)]
pub(crate) mod test_dir {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    /// Fresh, empty directory under the system temp dir.
    pub fn fresh(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let dir = std::env::temp_dir().join(format!(
            "btc-liquidations-{label}-{}-{nanos}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{CBBTC, WBTC};
    use crate::events::fixtures::{account, action, USDC_ADDR, WBTC_ADDR};
    use crate::events::ActionType;
    use crate::normalize::fixtures::raw_liquidation;
    use crate::normalize::normalize_liquidation;
    use liquidations_api::ProtocolVersion;

    fn liq(id: &str, timestamp: i64, usd: &str) -> LiquidationEvent {
        normalize_liquidation(
            raw_liquidation(id, timestamp, "100000000", Some(usd)),
            ProtocolVersion::V3,
        )
    }

    fn ids<R: Record>(records: &[R]) -> Vec<&str> {
        records.iter().map(|r| r.id()).collect()
    }

    #[test]
    fn test_merge_incoming_wins() {
        let existing = vec![liq("a", 100, "10"), liq("b", 200, "20")];
        let incoming = vec![liq("b", 200, "99"), liq("c", 300, "30")];

        let merged = merge_records(existing, incoming);

        assert_eq!(ids(&merged), vec!["c", "b", "a"]);
        assert_eq!(merged[1].collateral_amount_usd, 99.0);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let batch = vec![liq("a", 100, "1"), liq("b", 300, "2"), liq("c", 200, "3")];

        let once = merge_records(Vec::new(), batch.clone());
        let twice = merge_records(once.clone(), batch);

        assert_eq!(once, twice);
        assert_eq!(ids(&twice), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_missing_table() {
        let dir = test_dir::fresh("missing");
        let store = DatasetStore::liquidations(&dir, &WBTC);

        let loaded = store.load().unwrap();
        assert!(loaded.is_missing());
        assert!(loaded.records.is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = test_dir::fresh("round-trip");
        let store = DatasetStore::liquidations(&dir, &CBBTC);
        let records = vec![liq("x", 500, "1.5"), liq("y", 400, "2.5")];

        store.save(&records).unwrap();

        assert!(store.path().ends_with("cbbtc_liquidations.json"));
        assert!(!dir.join("cbbtc_liquidations.json.tmp").exists());
        let loaded = store.load().unwrap();
        assert_eq!(loaded.presence, Presence::Current);
        assert_eq!(loaded.records, records);

        let raw: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["schema_version"], 1);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_upsert_merges_with_disk() {
        let dir = test_dir::fresh("upsert");
        let store = DatasetStore::liquidations(&dir, &WBTC);

        store.upsert(vec![liq("a", 100, "1")]).unwrap();
        let merged = store.upsert(vec![liq("a", 100, "5"), liq("b", 200, "2")]).unwrap();

        assert_eq!(ids(&merged), vec!["b", "a"]);
        assert_eq!(store.load().unwrap().records, merged);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unsupported_schema_version() {
        let dir = test_dir::fresh("schema");
        fs::create_dir_all(&dir).unwrap();
        let store = DatasetStore::liquidations(&dir, &CBBTC);
        fs::write(store.path(), r#"{"schema_version": 7, "records": []}"#).unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedSchema { found: 7, .. }));
        fs::remove_dir_all(&dir).ok();
    }

    fn legacy_row(event: &LiquidationEvent) -> Value {
        let mut row = match serde_json::to_value(event).unwrap() {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let amount = row.remove("collateral_amount_btc").unwrap();
        row.insert("collateral_amount_wbtc".into(), amount);
        row.remove("datetime");
        Value::Object(row)
    }

    #[test]
    fn test_legacy_migration() {
        let dir = test_dir::fresh("legacy");
        fs::create_dir_all(&dir).unwrap();
        let original = vec![liq("old-1", 1_600_000_000, "42")];
        let rows = Value::Array(original.iter().map(legacy_row).collect());
        fs::write(dir.join("liquidations.json"), rows.to_string()).unwrap();

        let store = DatasetStore::liquidations(&dir, &WBTC);
        let first = store.load().unwrap();
        assert_eq!(first.presence, Presence::Legacy);
        assert_eq!(first.records, original);
        assert!(!store.path().exists(), "load must not write");

        let merged = store.upsert(vec![liq("new-1", 1_700_000_000, "7")]).unwrap();
        assert_eq!(ids(&merged), vec!["new-1", "old-1"]);

        let second = store.load().unwrap();
        assert_eq!(second.presence, Presence::Current);
        assert_eq!(second.records, merged);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_legacy_user_actions() {
        let dir = test_dir::fresh("legacy-actions");
        fs::create_dir_all(&dir).unwrap();
        let original = vec![
            action("dep-1", account(0xaa), ActionType::Deposit, 1_600_000_100, ("WBTC", WBTC_ADDR), 900.0),
            action("rep-1", account(0xaa), ActionType::Repay, 1_600_000_000, ("USDC", USDC_ADDR), 50.0),
        ];
        let rows: Vec<Value> = original
            .iter()
            .map(|event| {
                let mut row = serde_json::to_value(event).unwrap();
                row.as_object_mut().unwrap().remove("datetime");
                row
            })
            .collect();
        fs::write(dir.join("user_actions.json"), Value::Array(rows).to_string()).unwrap();

        let store = DatasetStore::user_actions(&dir, &WBTC);
        assert!(store.path().ends_with("wbtc_user_actions.json"));

        let loaded = store.load().unwrap();
        assert_eq!(loaded.presence, Presence::Legacy);
        assert_eq!(loaded.records, original);
        assert!(!store.path().exists());

        store.upsert(Vec::new()).unwrap();
        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.presence, Presence::Current);
        assert_eq!(reloaded.records, original);

        // cbBTC never had pre-rename files
        assert!(DatasetStore::user_actions(&dir, &CBBTC).load().unwrap().is_missing());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_legacy_ignored_for_assets_without_one() {
        let dir = test_dir::fresh("no-legacy");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("liquidations.json"), "[]").unwrap();

        let loaded = DatasetStore::liquidations(&dir, &CBBTC).load().unwrap();
        assert!(loaded.is_missing());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_legacy_schema_mismatch() {
        let dir = test_dir::fresh("legacy-bad");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("liquidations.json"), r#"[{"id": "a", "timestamp": 1}]"#).unwrap();

        let err = DatasetStore::liquidations(&dir, &WBTC).load().unwrap_err();
        assert!(matches!(err, StoreError::LegacySchema { .. }));
        fs::remove_dir_all(&dir).ok();
    }
}
