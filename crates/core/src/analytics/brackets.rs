//! Liquidation size brackets in native units.

use serde::Serialize;
use std::fmt;

use crate::events::LiquidationEvent;

/// Half-open size ranges: `[0,0.1) [0.1,0.5) [0.5,1) [1,5) [5,10) [10,50) [50,inf)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SizeBracket {
    #[serde(rename = "<0.1")]
    Dust,
    #[serde(rename = "0.1-0.5")]
    Tiny,
    #[serde(rename = "0.5-1")]
    Small,
    #[serde(rename = "1-5")]
    Medium,
    #[serde(rename = "5-10")]
    Large,
    #[serde(rename = "10-50")]
    Huge,
    #[serde(rename = ">50")]
    Whale,
}

impl SizeBracket {
    pub const ALL: [SizeBracket; 7] = [
        SizeBracket::Dust,
        SizeBracket::Tiny,
        SizeBracket::Small,
        SizeBracket::Medium,
        SizeBracket::Large,
        SizeBracket::Huge,
        SizeBracket::Whale,
    ];

    /// Inclusive lower bound of each bracket, in bracket order.
    const LOWER_BOUNDS: [f64; 7] = [0.0, 0.1, 0.5, 1.0, 5.0, 10.0, 50.0];

    /// Bracket containing `amount`. Non-positive amounts fall in the first.
    pub fn of(amount: f64) -> Self {
        let idx = Self::LOWER_BOUNDS
            .iter()
            .rposition(|&lower| amount >= lower)
            .unwrap_or(0);
        Self::ALL[idx]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Dust => "<0.1",
            Self::Tiny => "0.1-0.5",
            Self::Small => "0.5-1",
            Self::Medium => "1-5",
            Self::Large => "5-10",
            Self::Huge => "10-50",
            Self::Whale => ">50",
        }
    }
}

impl fmt::Display for SizeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarser brackets for behavior analysis: `[1,5) [5,10) [10,50) [50,inf)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum BehaviorBracket {
    #[serde(rename = "1-5 BTC")]
    OneToFive,
    #[serde(rename = "5-10 BTC")]
    FiveToTen,
    #[serde(rename = "10-50 BTC")]
    TenToFifty,
    #[serde(rename = ">50 BTC")]
    OverFifty,
}

impl BehaviorBracket {
    pub const ALL: [BehaviorBracket; 4] = [
        BehaviorBracket::OneToFive,
        BehaviorBracket::FiveToTen,
        BehaviorBracket::TenToFifty,
        BehaviorBracket::OverFifty,
    ];

    /// Bracket containing `amount`, or `None` below 1.
    pub fn of(amount: f64) -> Option<Self> {
        match amount {
            a if a >= 50.0 => Some(Self::OverFifty),
            a if a >= 10.0 => Some(Self::TenToFifty),
            a if a >= 5.0 => Some(Self::FiveToTen),
            a if a >= 1.0 => Some(Self::OneToFive),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OneToFive => "1-5 BTC",
            Self::FiveToTen => "5-10 BTC",
            Self::TenToFifty => "10-50 BTC",
            Self::OverFifty => ">50 BTC",
        }
    }
}

impl fmt::Display for BehaviorBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Count and totals for one size bracket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BracketStats {
    pub bracket: SizeBracket,
    pub count: usize,
    pub total_btc: f64,
    pub total_usd: f64,
}

/// Per-bracket totals in bracket order. Empty brackets are omitted.
pub fn size_distribution(events: &[LiquidationEvent]) -> Vec<BracketStats> {
    let mut stats: Vec<BracketStats> = SizeBracket::ALL
        .iter()
        .map(|&bracket| BracketStats { bracket, count: 0, total_btc: 0.0, total_usd: 0.0 })
        .collect();

    for event in events {
        let entry = &mut stats[SizeBracket::of(event.collateral_amount_btc) as usize];
        entry.count += 1;
        entry.total_btc += event.collateral_amount_btc;
        entry.total_usd += event.collateral_amount_usd;
    }

    stats.retain(|s| s.count > 0);
    stats
}
