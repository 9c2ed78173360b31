//! Deterministic synthetic price data.
//!
//! Used when no cache exists and for tests. Every series is seeded from the
//! BLAKE3 hash of its symbol, so the same symbol and range always produce the
//! same prices. Output is clearly fake and tagged [`DataSource::Synthetic`].

use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::{PricePoint, PriceSeries, SeriesError};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DEFAULT_DRIFT: f64 = 0.0005;
pub const DEFAULT_VOLATILITY: f64 = 0.02;
pub const DEFAULT_DAYS: usize = 730;

/// Geometric random walk with normal daily log returns. Calendar days, no
/// weekend gaps.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticProvider {
    pub drift: f64,
    pub volatility: f64,
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self {
            drift: DEFAULT_DRIFT,
            volatility: DEFAULT_VOLATILITY,
        }
    }
}

impl SyntheticProvider {
    /// Series for `symbol` covering `days` calendar days from `start`.
    ///
    /// Fails only when the parameters push prices out of finite range.
    pub fn generate(
        &self,
        symbol: &str,
        start: NaiveDate,
        days: usize,
    ) -> Result<PriceSeries, SeriesError> {
        let mut rng = rng_for(symbol);
        let closes = random_walk(&mut rng, start_price(symbol), self.drift, self.volatility, days);
        to_series(symbol, start, &closes, &mut rng)
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        if end < start {
            return Err(DataError::NoDataInRange {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }
        let days = (end - start).num_days() as usize + 1;
        let series = self
            .generate(symbol, start, days)
            .map_err(|source| DataError::Validation {
                symbol: symbol.to_string(),
                source,
            })?;
        Ok(FetchResult {
            series,
            source: DataSource::Synthetic,
        })
    }
}

/// Two series where `asset1 ≈ hedge_ratio * asset2 + c` with stationary
/// AR(1) noise of standard deviation `noise_sd`.
///
/// `asset2` is a default random walk starting at its usual price.
pub fn cointegrated_pair(
    asset1: &str,
    asset2: &str,
    start: NaiveDate,
    days: usize,
    hedge_ratio: f64,
    noise_sd: f64,
) -> Result<(PriceSeries, PriceSeries), SeriesError> {
    let mut rng = rng_for(&format!("{asset1}|{asset2}"));
    let base = random_walk(
        &mut rng,
        start_price(asset2),
        DEFAULT_DRIFT,
        DEFAULT_VOLATILITY,
        days,
    );

    // Offset keeps asset1 positive even if asset2 falls far.
    let offset = start_price(asset2) * hedge_ratio.abs().max(1.0);
    let phi = 0.5_f64;
    let innovation_sd = noise_sd * (1.0 - phi * phi).sqrt();
    let mut noise = 0.0;
    let linked: Vec<f64> = base
        .iter()
        .map(|&p2| {
            noise = phi * noise + innovation_sd * gaussian(&mut rng);
            (hedge_ratio * p2 + offset + noise).max(0.01)
        })
        .collect();

    Ok((
        to_series(asset1, start, &linked, &mut rng)?,
        to_series(asset2, start, &base, &mut rng)?,
    ))
}

/// Seed prices for well-known symbols, 100 otherwise.
pub fn start_price(symbol: &str) -> f64 {
    let base = symbol.split('/').next().unwrap_or(symbol);
    match base.to_ascii_uppercase().as_str() {
        "BTC" => 40_000.0,
        "ETH" => 2_000.0,
        "SOL" => 100.0,
        _ => 100.0,
    }
}

fn rng_for(key: &str) -> StdRng {
    StdRng::from_seed(*blake3::hash(key.as_bytes()).as_bytes())
}

/// Standard normal draw (Box-Muller).
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn random_walk(rng: &mut StdRng, start: f64, drift: f64, vol: f64, days: usize) -> Vec<f64> {
    let mut log_price = 0.0;
    (0..days)
        .map(|_| {
            log_price += drift + vol * gaussian(rng);
            start * log_price.exp()
        })
        .collect()
}

/// Wrap closes in consistent OHLCV bars on consecutive days.
fn to_series(
    symbol: &str,
    start: NaiveDate,
    closes: &[f64],
    rng: &mut StdRng,
) -> Result<PriceSeries, SeriesError> {
    let mut points = Vec::with_capacity(closes.len());
    let mut prev_close: Option<f64> = None;
    for (i, &close) in closes.iter().enumerate() {
        let open = prev_close.unwrap_or(close) * (1.0 + rng.gen_range(-0.01..0.01));
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.02));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.02));
        points.push(PricePoint {
            date: start + Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: rng.gen_range(1_000_000.0..5_000_000.0),
        });
        prev_close = Some(close);
    }
    PriceSeries::new(symbol, points)
}
