//! Wire types for the Messari-schema Aave subgraphs.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::queries::{AAVE_V2_SUBGRAPH_ID, AAVE_V3_SUBGRAPH_ID};

/// Aave protocol version a record was fetched under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProtocolVersion {
    V2,
    V3,
}

impl ProtocolVersion {
    /// Every version, in display order.
    pub const ALL: [ProtocolVersion; 2] = [ProtocolVersion::V2, ProtocolVersion::V3];

    /// Subgraph deployment serving this version.
    pub fn subgraph_id(&self) -> &'static str {
        match self {
            Self::V2 => AAVE_V2_SUBGRAPH_ID,
            Self::V3 => AAVE_V3_SUBGRAPH_ID,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V2 => "V2",
            Self::V3 => "V3",
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase hex form used for entity ids in the subgraph.
pub fn subgraph_address(address: &Address) -> String {
    address.to_string().to_lowercase()
}

/// Variables accepted by the liquidation and user-action queries.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryVariables {
    pub first: u32,
    pub skip: u32,
    pub timestamp_from: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_to: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl QueryVariables {
    /// Liquidations of `asset` since `timestamp_from`.
    pub fn for_asset(asset: &Address, timestamp_from: i64) -> Self {
        Self {
            timestamp_from,
            asset: Some(subgraph_address(asset)),
            ..Default::default()
        }
    }

    /// Actions of `account` within `[timestamp_from, timestamp_to]`.
    pub fn for_account(account: &Address, timestamp_from: i64, timestamp_to: i64) -> Self {
        Self {
            timestamp_from,
            timestamp_to: Some(timestamp_to),
            account: Some(subgraph_address(account)),
            ..Default::default()
        }
    }
}

/// Top-level GraphQL response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

/// One entry of a GraphQL `errors` list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub locations: Option<serde_json::Value>,
    #[serde(default)]
    pub path: Option<serde_json::Value>,
}

/// Reference to an account entity.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRef {
    #[serde(deserialize_with = "deserialize_address")]
    pub id: Address,
}

/// Lending market a record belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMarket {
    pub id: String,
    pub name: String,
}

/// Token metadata embedded in every record.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAsset {
    #[serde(deserialize_with = "deserialize_address")]
    pub id: Address,
    pub symbol: String,
    #[serde(deserialize_with = "deserialize_u8_from_string")]
    pub decimals: u8,
}

/// `liquidates` entity.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLiquidation {
    pub id: String,
    pub hash: String,
    #[serde(rename = "blockNumber", deserialize_with = "deserialize_u64_from_string")]
    pub block_number: u64,
    #[serde(deserialize_with = "deserialize_i64_from_string")]
    pub timestamp: i64,
    pub liquidator: AccountRef,
    pub liquidatee: AccountRef,
    pub market: RawMarket,
    pub asset: RawAsset,
    /// Collateral seized, in the asset's smallest unit
    #[serde(deserialize_with = "deserialize_u256_from_string")]
    pub amount: U256,
    #[serde(rename = "amountUSD", default, deserialize_with = "deserialize_optional_f64")]
    pub amount_usd: Option<f64>,
}

/// `deposits` / `repays` entity.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAction {
    pub id: String,
    pub hash: String,
    #[serde(deserialize_with = "deserialize_i64_from_string")]
    pub timestamp: i64,
    pub account: AccountRef,
    pub market: RawMarket,
    pub asset: RawAsset,
    #[serde(deserialize_with = "deserialize_u256_from_string")]
    pub amount: U256,
    #[serde(rename = "amountUSD", default, deserialize_with = "deserialize_optional_f64")]
    pub amount_usd: Option<f64>,
}

// Custom deserializers

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

fn deserialize_address<'de, D>(deserializer: D) -> Result<Address, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

fn deserialize_u256_from_string<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => {
            U256::from_str_radix(s.trim(), 10).map_err(serde::de::Error::custom)
        }
        StringOrNumber::Unsigned(n) => Ok(U256::from(n)),
        StringOrNumber::Signed(n) => u64::try_from(n)
            .map(U256::from)
            .map_err(|_| serde::de::Error::custom(format!("negative amount {n}"))),
        StringOrNumber::Float(f) => Err(serde::de::Error::custom(format!(
            "expected integer amount, got {f}"
        ))),
    }
}

fn deserialize_i64_from_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        StringOrNumber::Unsigned(n) => i64::try_from(n).map_err(serde::de::Error::custom),
        StringOrNumber::Signed(n) => Ok(n),
        StringOrNumber::Float(f) => Err(serde::de::Error::custom(format!(
            "expected integer, got {f}"
        ))),
    }
}

fn deserialize_u64_from_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        StringOrNumber::Unsigned(n) => Ok(n),
        StringOrNumber::Signed(n) => u64::try_from(n).map_err(serde::de::Error::custom),
        StringOrNumber::Float(f) => Err(serde::de::Error::custom(format!(
            "expected integer, got {f}"
        ))),
    }
}

fn deserialize_u8_from_string<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = deserialize_u64_from_string(deserializer)?;
    u8::try_from(value).map_err(serde::de::Error::custom)
}

fn deserialize_optional_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<StringOrNumber>::deserialize(deserializer)? {
        Some(StringOrNumber::String(s)) => {
            if s.is_empty() {
                Ok(None)
            } else {
                s.parse().map(Some).map_err(serde::de::Error::custom)
            }
        }
        Some(StringOrNumber::Unsigned(n)) => Ok(Some(n as f64)),
        Some(StringOrNumber::Signed(n)) => Ok(Some(n as f64)),
        Some(StringOrNumber::Float(f)) => Ok(Some(f)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_liquidation() {
        // Shape of a V3 `liquidates` entity as served by the gateway
        let json = r#"{
            "id": "0x6a3f...-12",
            "hash": "0x9c1b6c3d7e3b3f4c1f5f9e0b1f1c5b1a1e9c8d7f6a5b4c3d2e1f0a9b8c7d6e5f",
            "blockNumber": "18765432",
            "timestamp": "1702300000",
            "liquidator": { "id": "0x00000000009e50a7ddb7a7b0e2ee6604fd120e49" },
            "liquidatee": { "id": "0x1f2a98889594024bffda3311cbe69728d392c06d" },
            "market": { "id": "0x5ee5bf7ae06d1be5997a1a72006fe6c607ec6de8", "name": "Aave Ethereum WBTC" },
            "asset": {
                "id": "0x2260fac5e5542a773aa44fbcfedf7c193bc2c599",
                "symbol": "WBTC",
                "name": "Wrapped BTC",
                "decimals": 8
            },
            "amount": "250000000",
            "amountUSD": "105123.45",
            "profitUSD": "4012.11"
        }"#;

        let liq: RawLiquidation = serde_json::from_str(json).unwrap();
        assert_eq!(liq.block_number, 18_765_432);
        assert_eq!(liq.timestamp, 1_702_300_000);
        assert_eq!(liq.asset.decimals, 8);
        assert_eq!(liq.amount, U256::from(250_000_000u64));
        assert!((liq.amount_usd.unwrap() - 105_123.45).abs() < 1e-6);
        assert_eq!(
            subgraph_address(&liq.asset.id),
            "0x2260fac5e5542a773aa44fbcfedf7c193bc2c599"
        );
    }

    #[test]
    fn test_deserialize_action_without_usd() {
        let json = r#"{
            "id": "dep-1",
            "hash": "0xabc",
            "timestamp": 1700000000,
            "account": { "id": "0x1f2a98889594024bffda3311cbe69728d392c06d" },
            "market": { "id": "m", "name": "Aave Ethereum USDC" },
            "asset": { "id": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", "symbol": "USDC", "decimals": "6" },
            "amount": "1500000000"
        }"#;

        let action: RawAction = serde_json::from_str(json).unwrap();
        assert_eq!(action.asset.decimals, 6);
        assert!(action.amount_usd.is_none());
    }

    #[test]
    fn test_rejects_fractional_amount() {
        let json = r#"{
            "id": "dep-2",
            "hash": "0xabc",
            "timestamp": "1700000000",
            "account": { "id": "0x1f2a98889594024bffda3311cbe69728d392c06d" },
            "market": { "id": "m", "name": "Aave Ethereum USDC" },
            "asset": { "id": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", "symbol": "USDC", "decimals": 6 },
            "amount": "15.5"
        }"#;

        assert!(serde_json::from_str::<RawAction>(json).is_err());
    }

    #[test]
    fn test_variables_serialization() {
        let asset: Address = "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599".parse().unwrap();
        let mut vars = QueryVariables::for_asset(&asset, 1_600_000_000);
        vars.first = 1000;

        let json = serde_json::to_value(&vars).unwrap();
        assert_eq!(json["first"], 1000);
        assert_eq!(json["timestampFrom"], 1_600_000_000i64);
        assert_eq!(json["asset"], "0x2260fac5e5542a773aa44fbcfedf7c193bc2c599");
        assert!(json.get("account").is_none());
        assert!(json.get("timestampTo").is_none());
    }
}
