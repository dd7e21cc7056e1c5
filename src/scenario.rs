//! Price stress-test scenarios.
use crate::market::Market;
use crate::timeline::MarketTimeline;
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A price scenario, multiplying one market's prices by a factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "factor", rename_all = "snake_case")]
pub enum Scenario {
    /// Prices as synthesised
    Baseline,
    /// Day-ahead prices multiplied by the factor
    DayAheadInflated(f64),
    /// Future-base prices multiplied by the factor
    FutureBaseInflated(f64),
    /// Future-peak prices multiplied by the factor
    FuturePeakInflated(f64),
}

impl Scenario {
    /// The market whose prices are inflated and the factor, if any
    pub fn inflation(&self) -> Option<(Market, f64)> {
        match *self {
            Self::Baseline => None,
            Self::DayAheadInflated(factor) => Some((Market::DayAhead, factor)),
            Self::FutureBaseInflated(factor) => Some((Market::FutureBase, factor)),
            Self::FuturePeakInflated(factor) => Some((Market::FuturePeak, factor)),
        }
    }

    /// Check that the factor is finite and positive
    pub fn validate(&self) -> Result<()> {
        if let Some((_, factor)) = self.inflation() {
            ensure!(
                factor.is_finite() && factor > 0.0,
                "Invalid factor for scenario {self}: must be finite and greater than zero"
            );
        }

        Ok(())
    }

    /// Apply the scenario to a copy of the market prices
    pub fn apply(&self, prices: &MarketTimeline) -> MarketTimeline {
        let mut prices = prices.clone();
        if let Some((market, factor)) = self.inflation() {
            prices.scale(market, factor);
        }

        prices
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inflation() {
            None => write!(f, "baseline"),
            Some((market, factor)) => write!(f, "{market}_x{factor}"),
        }
    }
}

/// The standard stress-test sweep
pub fn default_sweep() -> Vec<Scenario> {
    vec![
        Scenario::Baseline,
        Scenario::DayAheadInflated(2.0),
        Scenario::FutureBaseInflated(3.0),
        Scenario::FuturePeakInflated(3.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Deserialize)]
    struct Scenarios {
        scenarios: Vec<Scenario>,
    }

    #[test]
    fn test_deserialise_scenarios() {
        let toml = r#"
            scenarios = [
                { kind = "baseline" },
                { kind = "day_ahead_inflated", factor = 2.0 },
                { kind = "future_peak_inflated", factor = 3 },
            ]
        "#;
        let scenarios: Scenarios = toml::from_str(toml).unwrap();
        assert_eq!(
            scenarios.scenarios,
            [
                Scenario::Baseline,
                Scenario::DayAheadInflated(2.0),
                Scenario::FuturePeakInflated(3.0)
            ]
        );
    }

    #[rstest]
    #[case(Scenario::Baseline, "baseline")]
    #[case(Scenario::DayAheadInflated(2.0), "day_ahead_x2")]
    #[case(Scenario::FutureBaseInflated(3.0), "future_base_x3")]
    #[case(Scenario::FuturePeakInflated(1.5), "future_peak_x1.5")]
    fn test_scenario_display(#[case] scenario: Scenario, #[case] expected: &str) {
        assert_eq!(scenario.to_string(), expected);
    }

    #[rstest]
    #[case(Scenario::Baseline, true)]
    #[case(Scenario::DayAheadInflated(2.0), true)]
    #[case(Scenario::DayAheadInflated(0.0), false)]
    #[case(Scenario::FutureBaseInflated(-1.0), false)]
    #[case(Scenario::FuturePeakInflated(f64::NAN), false)]
    fn test_scenario_validate(#[case] scenario: Scenario, #[case] valid: bool) {
        assert_eq!(scenario.validate().is_ok(), valid);
    }

    #[test]
    fn test_default_sweep() {
        let names: Vec<_> = default_sweep().iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            ["baseline", "day_ahead_x2", "future_base_x3", "future_peak_x3"]
        );
    }
}
