use chrono::NaiveDate;
use liquidations_api::ProtocolVersion;

use crate::events::LiquidationEvent;

/// Row filter for liquidation tables. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct LiquidationFilter {
    /// Inclusive calendar-day range (UTC); the end day counts through 23:59:59
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub versions: Option<Vec<ProtocolVersion>>,
    pub min_usd: Option<f64>,
    pub max_usd: Option<f64>,
}

impl LiquidationFilter {
    pub fn matches(&self, event: &LiquidationEvent) -> bool {
        if let Some((start, end)) = self.date_range {
            let day = event.datetime.date_naive();
            if day < start || day > end {
                return false;
            }
        }
        if let Some(versions) = &self.versions {
            if !versions.contains(&event.version) {
                return false;
            }
        }
        if self.min_usd.is_some_and(|min| event.collateral_amount_usd < min) {
            return false;
        }
        if self.max_usd.is_some_and(|max| event.collateral_amount_usd > max) {
            return false;
        }
        true
    }

    pub fn apply(&self, events: &[LiquidationEvent]) -> Vec<LiquidationEvent> {
        events.iter().filter(|e| self.matches(e)).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::fixtures::{account, liquidation};

    // 2024-03-01T00:00:00Z
    const MARCH_1: i64 = 1_709_251_200;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_end_day_is_inclusive() {
        let events = vec![
            liquidation("before", account(1), MARCH_1 - 1, 1.0, 1.0),
            liquidation("first", account(1), MARCH_1, 1.0, 1.0),
            liquidation("last-second", account(1), MARCH_1 + 2 * 86_400 - 1, 1.0, 1.0),
            liquidation("after", account(1), MARCH_1 + 2 * 86_400, 1.0, 1.0),
        ];
        let filter = LiquidationFilter {
            date_range: Some((date(2024, 3, 1), date(2024, 3, 2))),
            ..Default::default()
        };

        let ids: Vec<_> = filter.apply(&events).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["first", "last-second"]);
    }

    #[test]
    fn test_version_and_usd_bounds() {
        let mut v2 = liquidation("v2", account(1), 10, 1.0, 500.0);
        v2.version = ProtocolVersion::V2;
        let events = vec![
            v2,
            liquidation("cheap", account(1), 10, 1.0, 99.0),
            liquidation("mid", account(1), 10, 1.0, 100.0),
            liquidation("dear", account(1), 10, 1.0, 1000.5),
        ];
        let filter = LiquidationFilter {
            versions: Some(vec![ProtocolVersion::V3]),
            min_usd: Some(100.0),
            max_usd: Some(1000.0),
            ..Default::default()
        };

        let ids: Vec<_> = filter.apply(&events).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["mid"]);
        assert_eq!(LiquidationFilter::default().apply(&events).len(), 4);
    }
}
