//! Seeded random-walk quote feed for demos and paper-trading dry runs.
//!
//! Each tick moves the price by a uniform ±2%, floored at 0.01. The walk for
//! a symbol depends only on the feed seed and the symbol name.

use crate::domain::bar::Bar;
use crate::domain::error::TradesimError;
use crate::ports::data_port::DataPort;
use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MAX_MOVE: f64 = 0.02;
const PRICE_FLOOR: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct SyntheticFeed {
    symbols: Vec<String>,
    seed: u64,
    bars: usize,
    start: NaiveDateTime,
}

impl SyntheticFeed {
    pub fn new(symbols: Vec<String>, seed: u64, bars: usize, start: NaiveDateTime) -> Self {
        Self {
            symbols,
            seed,
            bars,
            start,
        }
    }

    /// Unbounded tick stream for `symbol`.
    pub fn ticks(&self, symbol: &str) -> SyntheticTicks {
        SyntheticTicks {
            rng: StdRng::seed_from_u64(symbol_seed(self.seed, symbol)),
            price: base_price(symbol),
            next: self.start,
        }
    }
}

/// Starting prices for a few familiar tickers; everything else starts at 100.
fn base_price(symbol: &str) -> f64 {
    match symbol {
        "AAPL" => 150.0,
        "MSFT" => 300.0,
        "GOOGL" => 2500.0,
        "TSLA" => 200.0,
        "NVDA" => 400.0,
        _ => 100.0,
    }
}

/// FNV-1a over the symbol, mixed with the feed seed.
fn symbol_seed(seed: u64, symbol: &str) -> u64 {
    symbol
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64 ^ seed, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
        })
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct SyntheticTicks {
    rng: StdRng,
    price: f64,
    next: NaiveDateTime,
}

impl Iterator for SyntheticTicks {
    type Item = Bar;

    fn next(&mut self) -> Option<Bar> {
        let change: f64 = self.rng.gen_range(-MAX_MOVE..=MAX_MOVE);
        self.price = (self.price * (1.0 + change)).max(PRICE_FLOOR);
        let close = round_cents(self.price).max(PRICE_FLOOR);
        let bar = Bar {
            timestamp: self.next,
            open: round_cents(close * self.rng.gen_range(0.995..=1.005)).max(PRICE_FLOOR),
            high: round_cents(close * 1.01),
            low: round_cents(close * 0.99).max(PRICE_FLOOR),
            close,
            volume: f64::from(self.rng.gen_range(1_000_u32..=10_000)),
        };
        self.next += Duration::days(1);
        Some(bar)
    }
}

impl DataPort for SyntheticFeed {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, TradesimError> {
        if !self.symbols.iter().any(|s| s == symbol) {
            return Err(TradesimError::DataSource {
                reason: format!("synthetic feed has no symbol {}", symbol),
            });
        }
        Ok(self.ticks(symbol).take(self.bars).collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, TradesimError> {
        let mut symbols = self.symbols.clone();
        symbols.sort();
        Ok(symbols)
    }
}
