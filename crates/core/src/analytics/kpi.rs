use alloy::primitives::Address;
use liquidations_api::ProtocolVersion;
use serde::Serialize;
use std::collections::HashSet;

use crate::events::LiquidationEvent;

/// Headline metrics for a liquidation table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_liquidations: usize,
    pub total_btc: f64,
    pub total_usd: f64,
    pub unique_liquidators: usize,
    pub unique_liquidatees: usize,
    pub avg_liquidation_usd: f64,
    pub max_liquidation_usd: f64,
    pub v2_count: usize,
    pub v3_count: usize,
}

impl KpiSummary {
    pub fn version_count(&self, version: ProtocolVersion) -> usize {
        match version {
            ProtocolVersion::V2 => self.v2_count,
            ProtocolVersion::V3 => self.v3_count,
        }
    }
}

/// Compute headline metrics. All zeros on empty input.
pub fn compute_kpis(events: &[LiquidationEvent]) -> KpiSummary {
    if events.is_empty() {
        return KpiSummary::default();
    }

    let mut summary = KpiSummary {
        total_liquidations: events.len(),
        max_liquidation_usd: f64::MIN,
        ..Default::default()
    };
    let mut liquidators: HashSet<Address> = HashSet::new();
    let mut liquidatees: HashSet<Address> = HashSet::new();

    for event in events {
        summary.total_btc += event.collateral_amount_btc;
        summary.total_usd += event.collateral_amount_usd;
        summary.max_liquidation_usd = summary.max_liquidation_usd.max(event.collateral_amount_usd);
        liquidators.insert(event.liquidator);
        liquidatees.insert(event.liquidatee);
        match event.version {
            ProtocolVersion::V2 => summary.v2_count += 1,
            ProtocolVersion::V3 => summary.v3_count += 1,
        }
    }

    summary.unique_liquidators = liquidators.len();
    summary.unique_liquidatees = liquidatees.len();
    summary.avg_liquidation_usd = summary.total_usd / events.len() as f64;
    summary
}
