//! Pure conversion arithmetic.

use super::error::ValidationError;
use super::history::CalculationEntry;
use super::rate::{MarketRate, RateStatus};
use chrono::{DateTime, SecondsFormat, Utc};

pub const SATS_PER_BTC: f64 = 100_000_000.0;

/// Spread above which the office rate is flagged as expensive.
pub const SPREAD_WARNING_PCT: f64 = 2.0;

/// Percentage deviation of the office rate from the market rate.
pub fn spread(office_rate: f64, market_rate: f64) -> f64 {
    if market_rate == 0.0 {
        return 0.0;
    }
    (office_rate - market_rate) / market_rate * 100.0
}

pub fn btc_amount(gel: f64, office_rate: f64) -> f64 {
    if office_rate == 0.0 {
        return 0.0;
    }
    gel / office_rate
}

pub fn satoshis(btc_amount: f64) -> u64 {
    (btc_amount * SATS_PER_BTC).floor() as u64
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Checks user input, returning the amount and office rate on success.
pub fn validate(gel: Option<f64>, office_rate: Option<f64>) -> Result<(f64, f64), ValidationError> {
    let gel = positive(gel)
        .ok_or_else(|| ValidationError("GEL amount must be greater than zero".to_string()))?;
    let office_rate = positive(office_rate)
        .ok_or_else(|| ValidationError("Office rate must be greater than zero".to_string()))?;
    Ok((gel, office_rate))
}

/// Result of converting an amount at the office rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub gel: f64,
    pub office_rate: f64,
    pub market_rate: f64,
    pub btc_amount: f64,
    pub sats: u64,
    pub spread: f64,
    /// Age of the market rate in milliseconds when the calculation ran
    pub rate_age_ms: i64,
    pub source: String,
    pub status: RateStatus,
    pub calculated_at: DateTime<Utc>,
}

impl Calculation {
    pub fn spread_warning(&self) -> bool {
        self.spread > SPREAD_WARNING_PCT
    }

    pub fn to_entry(&self) -> CalculationEntry {
        CalculationEntry {
            id: self.calculated_at.timestamp_millis(),
            date: self
                .calculated_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            gel: self.gel,
            office_rate: self.office_rate,
            market_rate: self.market_rate,
            btc_amount: self.btc_amount,
            spread: self.spread,
            source: self.source.clone(),
        }
    }
}

/// Converts validated input against a market rate.
pub fn calculate(
    gel: f64,
    office_rate: f64,
    market: &MarketRate,
    now: DateTime<Utc>,
) -> Calculation {
    let btc = btc_amount(gel, office_rate);
    Calculation {
        gel,
        office_rate,
        market_rate: market.snapshot.rate,
        btc_amount: btc,
        sats: satoshis(btc),
        spread: spread(office_rate, market.snapshot.rate),
        rate_age_ms: market.snapshot.age_ms(now.timestamp_millis()),
        source: market.snapshot.source.clone(),
        status: market.status.clone(),
        calculated_at: now,
    }
}
