//! Spread signal generation with entry/exit hysteresis.
//!
//! The generator is a pure decision function over `(deviation, has_position)`.
//! It holds only its two thresholds.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_ENTRY_THRESHOLD: f64 = 2.0;
pub const DEFAULT_EXIT_THRESHOLD: f64 = 0.5;

/// Trading action for a pair on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Buy,
    Sell,
    Close,
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Close => "CLOSE",
            Signal::Hold => "HOLD",
        };
        write!(f, "{s}")
    }
}

/// A signal together with the deviation that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalDecision {
    pub signal: Signal,
    pub deviation: f64,
    /// Strength in `[0, 1]`.
    pub confidence: f64,
}

/// Which way a fresh entry would go, ignoring position state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Spread below its band: buy asset1, sell asset2.
    Long,
    /// Spread above its band: sell asset1, buy asset2.
    Short,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    #[error("thresholds must be finite (entry = {entry}, exit = {exit})")]
    NonFinite { entry: f64, exit: f64 },

    #[error("exit threshold {exit} must be non-negative and below entry threshold {entry}")]
    Inverted { entry: f64, exit: f64 },
}

fn validate(entry: f64, exit: f64) -> Result<(), ThresholdError> {
    if !entry.is_finite() || !exit.is_finite() {
        return Err(ThresholdError::NonFinite { entry, exit });
    }
    if exit < 0.0 || exit >= entry {
        return Err(ThresholdError::Inverted { entry, exit });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalGenerator {
    entry_threshold: f64,
    exit_threshold: f64,
}

impl Default for SignalGenerator {
    fn default() -> Self {
        Self {
            entry_threshold: DEFAULT_ENTRY_THRESHOLD,
            exit_threshold: DEFAULT_EXIT_THRESHOLD,
        }
    }
}

impl SignalGenerator {
    pub fn new(entry_threshold: f64, exit_threshold: f64) -> Result<Self, ThresholdError> {
        validate(entry_threshold, exit_threshold)?;
        Ok(Self {
            entry_threshold,
            exit_threshold,
        })
    }

    pub fn entry_threshold(&self) -> f64 {
        self.entry_threshold
    }

    pub fn exit_threshold(&self) -> f64 {
        self.exit_threshold
    }

    /// Replace both thresholds. Meant for tuning between runs; the engine
    /// owns its own copy, so this cannot affect a simulation in progress.
    pub fn update_thresholds(&mut self, entry: f64, exit: f64) -> Result<(), ThresholdError> {
        validate(entry, exit)?;
        self.entry_threshold = entry;
        self.exit_threshold = exit;
        Ok(())
    }

    /// Decide the action for one pair on one date.
    ///
    /// Precedence: CLOSE (open and inside the exit band), then BUY, then SELL
    /// (both only when flat), else HOLD.
    pub fn generate(&self, deviation: f64, has_position: bool) -> SignalDecision {
        let abs = deviation.abs();

        let (signal, confidence) = if has_position && abs < self.exit_threshold {
            (Signal::Close, 1.0 - abs / self.exit_threshold)
        } else if !has_position && deviation < -self.entry_threshold {
            (Signal::Buy, self.entry_confidence(abs))
        } else if !has_position && deviation > self.entry_threshold {
            (Signal::Sell, self.entry_confidence(abs))
        } else {
            (Signal::Hold, 0.0)
        };

        SignalDecision {
            signal,
            deviation,
            confidence: clamp_unit(confidence),
        }
    }

    /// Decide for many `(deviation, has_position)` inputs at once.
    pub fn generate_batch(&self, inputs: &[(f64, bool)]) -> Vec<SignalDecision> {
        inputs.iter().map(|&(d, open)| self.generate(d, open)).collect()
    }

    pub fn should_enter(&self, deviation: f64) -> bool {
        deviation.abs() > self.entry_threshold
    }

    pub fn should_exit(&self, deviation: f64) -> bool {
        deviation.abs() < self.exit_threshold
    }

    pub fn direction(&self, deviation: f64) -> Direction {
        if deviation < -self.entry_threshold {
            Direction::Long
        } else if deviation > self.entry_threshold {
            Direction::Short
        } else {
            Direction::Neutral
        }
    }

    fn entry_confidence(&self, abs_deviation: f64) -> f64 {
        (abs_deviation - self.entry_threshold) / self.entry_threshold
    }
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}
