//! Flat, typed liquidation and user-action records.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use liquidations_api::{Entity, ProtocolVersion};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A persisted record keyed by a source-assigned id.
pub trait Record {
    fn id(&self) -> &str;
    fn timestamp(&self) -> i64;
}

/// Sort newest first. Stable, so equal timestamps keep their relative order.
pub fn sort_newest_first<R: Record>(records: &mut [R]) {
    records.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
}

/// Epoch seconds to UTC. Out-of-range values map to the epoch.
pub fn datetime_from_epoch(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// One liquidation of wrapped-BTC collateral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationEvent {
    pub id: String,
    pub version: ProtocolVersion,
    pub timestamp: i64,
    pub datetime: DateTime<Utc>,
    pub block_number: u64,
    pub tx_hash: String,
    pub liquidator: Address,
    pub liquidatee: Address,
    pub collateral_asset_symbol: String,
    pub collateral_asset_address: Address,
    /// Seized amount in the token's smallest unit, as a decimal string
    pub collateral_amount_raw: String,
    /// Seized amount in whole tokens
    pub collateral_amount_btc: f64,
    pub collateral_amount_usd: f64,
    pub market_name: String,
    pub market_address: String,
}

impl Record for LiquidationEvent {
    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Kind of pre-liquidation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Deposit,
    Repay,
}

impl ActionType {
    pub const ALL: [ActionType; 2] = [ActionType::Deposit, ActionType::Repay];

    /// Subgraph collection holding this action.
    pub fn entity(&self) -> Entity {
        match self {
            Self::Deposit => Entity::Deposits,
            Self::Repay => Entity::Repays,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Repay => "repay",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deposit or repay made by an account that was later liquidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserActionEvent {
    pub id: String,
    pub action_type: ActionType,
    pub version: ProtocolVersion,
    pub timestamp: i64,
    pub datetime: DateTime<Utc>,
    pub tx_hash: String,
    pub account: Address,
    pub asset_symbol: String,
    pub asset_address: Address,
    /// Amount in whole tokens
    pub amount: f64,
    pub amount_usd: f64,
    pub market_name: String,
}

impl Record for UserActionEvent {
    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use alloy::primitives::address;

    pub const WBTC_ADDR: Address = address!("2260fac5e5542a773aa44fbcfedf7c193bc2c599");
    pub const USDC_ADDR: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    pub const LIQUIDATOR: Address = address!("00000000009e50a7ddb7a7b0e2ee6604fd120e49");

    pub fn account(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    pub fn liquidation(id: &str, liquidatee: Address, timestamp: i64, btc: f64, usd: f64) -> LiquidationEvent {
        LiquidationEvent {
            id: id.to_string(),
            version: ProtocolVersion::V3,
            timestamp,
            datetime: datetime_from_epoch(timestamp),
            block_number: 18_000_000,
            tx_hash: format!("0x{id}"),
            liquidator: LIQUIDATOR,
            liquidatee,
            collateral_asset_symbol: "WBTC".to_string(),
            collateral_asset_address: WBTC_ADDR,
            collateral_amount_raw: format!("{}", (btc * 1e8) as u64),
            collateral_amount_btc: btc,
            collateral_amount_usd: usd,
            market_name: "Aave Ethereum WBTC".to_string(),
            market_address: "0x5ee5bf7ae06d1be5997a1a72006fe6c607ec6de8".to_string(),
        }
    }

    pub fn action(
        id: &str,
        account: Address,
        action_type: ActionType,
        timestamp: i64,
        asset: (&str, Address),
        usd: f64,
    ) -> UserActionEvent {
        UserActionEvent {
            id: id.to_string(),
            action_type,
            version: ProtocolVersion::V3,
            timestamp,
            datetime: datetime_from_epoch(timestamp),
            tx_hash: format!("0x{id}"),
            account,
            asset_symbol: asset.0.to_string(),
            asset_address: asset.1,
            amount: 1.0,
            amount_usd: usd,
            market_name: format!("Aave Ethereum {}", asset.0),
        }
    }
}
