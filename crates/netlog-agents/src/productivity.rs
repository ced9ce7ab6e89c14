//! Time-spent to cost conversion for session durations.
//!
//! **Interaction**: Used by the analyst's local statistics and by `netlog stats`.

use serde::Serialize;

use crate::config::RateTable;

/// Unit the `duration` column is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Seconds,
    Milliseconds,
}

impl DurationUnit {
    /// Averages above 1000 are taken to be milliseconds.
    pub fn detect(avg: f64) -> Self {
        if avg > 1000.0 {
            Self::Milliseconds
        } else {
            Self::Seconds
        }
    }

    pub fn to_seconds(self, value: f64) -> f64 {
        match self {
            Self::Seconds => value,
            Self::Milliseconds => value / 1000.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Seconds => "seconds",
            Self::Milliseconds => "milliseconds",
        }
    }
}

/// Cost of time spent, in several currencies and everyday equivalents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductivityLoss {
    pub total_seconds: f64,
    pub hours: u64,
    /// Minutes past the whole hours.
    pub minutes: u64,
    pub pln: f64,
    pub usd: f64,
    pub eur: f64,
    pub gold_grams: f64,
    pub btc: f64,
    pub coffee_cups: f64,
    pub streaming_months: f64,
}

/// Prices `seconds` of lost time at `rates.hourly_rate_pln`.
///
/// Negative input is treated as zero.
pub fn calculate_loss(seconds: f64, rates: &RateTable) -> ProductivityLoss {
    let seconds = seconds.max(0.0);
    let total_hours = seconds / 3600.0;
    let pln = total_hours * rates.hourly_rate_pln;
    let whole_seconds = seconds as u64;
    ProductivityLoss {
        total_seconds: seconds,
        hours: whole_seconds / 3600,
        minutes: (whole_seconds % 3600) / 60,
        pln,
        usd: pln / rates.usd_rate,
        eur: pln / rates.eur_rate,
        gold_grams: pln / rates.gold_gram_pln,
        btc: pln / rates.btc_pln,
        coffee_cups: pln / rates.coffee_cup_pln,
        streaming_months: pln / rates.streaming_month_pln,
    }
}

impl ProductivityLoss {
    /// One-line summary, e.g. `2h 30m ≈ 375.00 PLN (92.59 USD, 87.21 EUR)`.
    pub fn summary(&self) -> String {
        format!(
            "{}h {}m ≈ {:.2} PLN ({:.2} USD, {:.2} EUR)",
            self.hours, self.minutes, self.pln, self.usd, self.eur
        )
    }

    /// Everyday equivalents of the PLN amount.
    pub fn equivalents(&self) -> String {
        format!(
            "{:.2} g of gold, {:.6} BTC, {:.0} cups of coffee, {:.1} months of streaming",
            self.gold_grams, self.btc, self.coffee_cups, self.streaming_months
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn detects_milliseconds_above_one_thousand() {
        assert_eq!(DurationUnit::detect(1500.0), DurationUnit::Milliseconds);
        assert_eq!(DurationUnit::detect(1000.0), DurationUnit::Seconds);
        assert_eq!(DurationUnit::detect(12.5), DurationUnit::Seconds);
        assert!(close(DurationUnit::Milliseconds.to_seconds(2500.0), 2.5));
    }

    #[test]
    fn two_and_a_half_hours_at_default_rates() {
        let loss = calculate_loss(9000.0, &RateTable::default());
        assert_eq!(loss.hours, 2);
        assert_eq!(loss.minutes, 30);
        assert!(close(loss.pln, 375.0));
        assert!(close(loss.usd, 375.0 / 4.05));
        assert!(close(loss.eur, 375.0 / 4.30));
        assert!(close(loss.coffee_cups, 25.0));
        assert!(close(loss.streaming_months, 6.25));
        assert!(loss.summary().starts_with("2h 30m ≈ 375.00 PLN"));
    }

    #[test]
    fn negative_time_costs_nothing() {
        let loss = calculate_loss(-5.0, &RateTable::default());
        assert_eq!(loss.hours, 0);
        assert!(close(loss.pln, 0.0));
    }
}
