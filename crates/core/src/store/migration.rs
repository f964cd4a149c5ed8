//! Row transforms for pre-rename data files.
//!
//! Legacy wBTC tables were written before multi-asset support and use
//! asset-specific column names. Each transform takes one legacy row and
//! returns it in the current record shape; decoding happens afterwards.

use serde_json::{Map, Value};

use crate::events::datetime_from_epoch;

/// Legacy row transform.
pub type RowMigration = fn(Map<String, Value>) -> Map<String, Value>;

/// Renamed liquidation columns, legacy name first.
const LIQUIDATION_RENAMES: &[(&str, &str)] = &[("collateral_amount_wbtc", "collateral_amount_btc")];

/// Migrate one legacy liquidation row.
pub fn migrate_liquidation_row(mut row: Map<String, Value>) -> Map<String, Value> {
    for (old, new) in LIQUIDATION_RENAMES {
        if let Some(value) = row.remove(*old) {
            row.entry(*new).or_insert(value);
        }
    }
    fill_datetime(&mut row);
    row
}

/// Migrate one legacy user-action row. Column names are unchanged.
pub fn migrate_action_row(mut row: Map<String, Value>) -> Map<String, Value> {
    fill_datetime(&mut row);
    row
}

/// Derive `datetime` from `timestamp` when the legacy writer dropped it.
fn fill_datetime(row: &mut Map<String, Value>) {
    if row.contains_key("datetime") {
        return;
    }
    let timestamp = match row.get("timestamp") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    };
    if let Some(ts) = timestamp {
        row.insert(
            "datetime".to_string(),
            Value::String(datetime_from_epoch(ts).to_rfc3339()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_liquidation_rename() {
        let migrated = migrate_liquidation_row(row(json!({
            "id": "a",
            "timestamp": 1_700_000_000,
            "collateral_amount_wbtc": 1.25,
        })));

        assert_eq!(migrated["collateral_amount_btc"], json!(1.25));
        assert!(!migrated.contains_key("collateral_amount_wbtc"));
        assert_eq!(migrated["datetime"], json!("2023-11-14T22:13:20+00:00"));
    }

    #[test]
    fn test_current_column_wins_over_legacy() {
        let migrated = migrate_liquidation_row(row(json!({
            "collateral_amount_wbtc": 9.0,
            "collateral_amount_btc": 2.0,
            "datetime": "2020-01-01T00:00:00+00:00",
        })));

        assert_eq!(migrated["collateral_amount_btc"], json!(2.0));
        assert_eq!(migrated["datetime"], json!("2020-01-01T00:00:00+00:00"));
    }

    #[test]
    fn test_action_row_keeps_columns() {
        let migrated = migrate_action_row(row(json!({ "id": "d", "timestamp": "60", "amount": 3.0 })));
        assert_eq!(migrated["amount"], json!(3.0));
        assert_eq!(migrated["datetime"], json!("1970-01-01T00:01:00+00:00"));
    }
}
