//! Raw subgraph entities to flat records.
//!
//! Decimals always come from the asset metadata embedded in each raw record,
//! never from the registry: user actions touch arbitrary tokens.

use liquidations_api::{ProtocolVersion, RawAction, RawLiquidation};

use crate::amounts::scale_amount;
use crate::events::{datetime_from_epoch, sort_newest_first, ActionType, LiquidationEvent, UserActionEvent};

/// Flatten one `liquidates` entity fetched from `version`'s subgraph.
pub fn normalize_liquidation(raw: RawLiquidation, version: ProtocolVersion) -> LiquidationEvent {
    LiquidationEvent {
        id: raw.id,
        version,
        timestamp: raw.timestamp,
        datetime: datetime_from_epoch(raw.timestamp),
        block_number: raw.block_number,
        tx_hash: raw.hash,
        liquidator: raw.liquidator.id,
        liquidatee: raw.liquidatee.id,
        collateral_asset_symbol: raw.asset.symbol,
        collateral_asset_address: raw.asset.id,
        collateral_amount_raw: raw.amount.to_string(),
        collateral_amount_btc: scale_amount(raw.amount, raw.asset.decimals),
        collateral_amount_usd: raw.amount_usd.unwrap_or(0.0),
        market_name: raw.market.name,
        market_address: raw.market.id,
    }
}

/// Flatten one `deposits`/`repays` entity.
pub fn normalize_action(
    raw: RawAction,
    action_type: ActionType,
    version: ProtocolVersion,
) -> UserActionEvent {
    UserActionEvent {
        id: raw.id,
        action_type,
        version,
        timestamp: raw.timestamp,
        datetime: datetime_from_epoch(raw.timestamp),
        tx_hash: raw.hash,
        account: raw.account.id,
        asset_symbol: raw.asset.symbol,
        asset_address: raw.asset.id,
        amount: scale_amount(raw.amount, raw.asset.decimals),
        amount_usd: raw.amount_usd.unwrap_or(0.0),
        market_name: raw.market.name,
    }
}

/// Build a liquidation table: drop zero-amount noise, newest first.
pub fn liquidation_table(events: impl IntoIterator<Item = LiquidationEvent>) -> Vec<LiquidationEvent> {
    let mut table: Vec<_> = events
        .into_iter()
        .filter(|e| e.collateral_amount_btc > 0.0)
        .collect();
    sort_newest_first(&mut table);
    table
}

/// Normalize and tag a batch of raw actions, newest first.
pub fn action_table(
    raw: impl IntoIterator<Item = RawAction>,
    action_type: ActionType,
    version: ProtocolVersion,
) -> Vec<UserActionEvent> {
    let mut table: Vec<_> = raw
        .into_iter()
        .map(|r| normalize_action(r, action_type, version))
        .collect();
    sort_newest_first(&mut table);
    table
}
