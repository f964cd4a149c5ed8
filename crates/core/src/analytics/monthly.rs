//! Calendar-month rollups, ascending by month.

use chrono::Datelike;
use liquidations_api::ProtocolVersion;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::brackets::SizeBracket;
use crate::events::LiquidationEvent;

/// A UTC calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn of(event: &LiquidationEvent) -> Self {
        Self {
            year: event.datetime.year(),
            month: event.datetime.month(),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Totals {
    count: usize,
    total_btc: f64,
    total_usd: f64,
}

impl Totals {
    fn add(&mut self, event: &LiquidationEvent) {
        self.count += 1;
        self.total_btc += event.collateral_amount_btc;
        self.total_usd += event.collateral_amount_usd;
    }
}

fn rollup<K: Ord>(events: &[LiquidationEvent], key: impl Fn(&LiquidationEvent) -> K) -> BTreeMap<K, Totals> {
    let mut groups: BTreeMap<K, Totals> = BTreeMap::new();
    for event in events {
        groups.entry(key(event)).or_default().add(event);
    }
    groups
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyStats {
    pub month: Month,
    pub count: usize,
    pub total_btc: f64,
    pub total_usd: f64,
    pub avg_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyVersionStats {
    pub month: Month,
    pub version: ProtocolVersion,
    pub count: usize,
    pub total_btc: f64,
    pub total_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBracketStats {
    pub month: Month,
    pub bracket: SizeBracket,
    pub count: usize,
    pub total_btc: f64,
    pub total_usd: f64,
}

pub fn monthly_stats(events: &[LiquidationEvent]) -> Vec<MonthlyStats> {
    rollup(events, Month::of)
        .into_iter()
        .map(|(month, t)| MonthlyStats {
            month,
            count: t.count,
            total_btc: t.total_btc,
            total_usd: t.total_usd,
            avg_usd: t.total_usd / t.count as f64,
        })
        .collect()
}

pub fn monthly_by_version(events: &[LiquidationEvent]) -> Vec<MonthlyVersionStats> {
    rollup(events, |e| (Month::of(e), e.version))
        .into_iter()
        .map(|((month, version), t)| MonthlyVersionStats {
            month,
            version,
            count: t.count,
            total_btc: t.total_btc,
            total_usd: t.total_usd,
        })
        .collect()
}

pub fn monthly_by_size_bracket(events: &[LiquidationEvent]) -> Vec<MonthlyBracketStats> {
    rollup(events, |e| (Month::of(e), SizeBracket::of(e.collateral_amount_btc)))
        .into_iter()
        .map(|((month, bracket), t)| MonthlyBracketStats {
            month,
            bracket,
            count: t.count,
            total_btc: t.total_btc,
            total_usd: t.total_usd,
        })
        .collect()
}
