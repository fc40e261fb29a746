//! Adaptive per-kind weights that bias which values get mutated and how
//! broadly.

use std::collections::BTreeMap;

use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::{pick_inclusive, JfuzzError, JfuzzResult, ValueKind, MAX_FUZZ_FACTOR};

/// Weights are stored in tenths so repeated `reinforce` steps never drift.
const MAX_TENTHS: u16 = 100;
const STEP_TENTHS: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehaviorWeights {
    tenths: BTreeMap<ValueKind, u16>,
}

impl Default for BehaviorWeights {
    fn default() -> Self {
        Self {
            tenths: ValueKind::ALL.iter().map(|k| (*k, MAX_TENTHS)).collect(),
        }
    }
}

impl BehaviorWeights {
    pub fn weight(&self, kind: ValueKind) -> f64 {
        f64::from(self.tenths(kind)) / 10.0
    }

    /// Sets a weight, rounded to the nearest tenth. Rejects values outside
    /// `[0, 10]`.
    pub fn set(&mut self, kind: ValueKind, weight: f64) -> JfuzzResult<()> {
        if !(0.0..=10.0).contains(&weight) {
            return Err(JfuzzError::InvalidArgument(format!(
                "behavior weight for {kind} must be between 0 and 10 (got {weight})"
            )));
        }
        self.tenths.insert(kind, (weight * 10.0).round() as u16);
        Ok(())
    }

    /// Raises `kind` by 0.1 (capped at 10) and lowers every other kind by
    /// 0.1 (floored at 0).
    pub fn reinforce(&mut self, kind: ValueKind) {
        for (k, w) in self.tenths.iter_mut() {
            if *k == kind {
                *w = (*w + STEP_TENTHS).min(MAX_TENTHS);
            } else {
                *w = w.saturating_sub(STEP_TENTHS);
            }
        }
    }

    fn tenths(&self, kind: ValueKind) -> u16 {
        self.tenths.get(&kind).copied().unwrap_or(MAX_TENTHS)
    }
}

/// Weight gating plus factor scaling; a pass-through when behavior mode is
/// off.
#[derive(Debug, Clone)]
pub struct BehaviorModel {
    enabled: bool,
    weights: BehaviorWeights,
}

impl BehaviorModel {
    pub fn new(enabled: bool, weights: BehaviorWeights) -> Self {
        Self { enabled, weights }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn weights(&self) -> &BehaviorWeights {
        &self.weights
    }

    pub fn reinforce(&mut self, kind: ValueKind) {
        self.weights.reinforce(kind);
    }

    /// Draws 1..=10 and selects the value when the draw is at most the
    /// kind's weight.
    pub fn is_selected(&self, rng: &mut ChaCha20Rng, kind: ValueKind) -> bool {
        if !self.enabled {
            return true;
        }
        let draw = pick_inclusive(rng, 1, 10) as u16;
        draw * 10 <= self.weights.tenths(kind)
    }

    /// Full weight keeps the session factor; anything lower scales the
    /// widest menu down to `floor(6 * weight / 10)`.
    pub fn effective_factor(&self, kind: ValueKind, fuzz_factor: u8) -> u8 {
        if !self.enabled {
            return fuzz_factor;
        }
        let tenths = self.weights.tenths(kind);
        if tenths == MAX_TENTHS {
            fuzz_factor
        } else {
            (u16::from(MAX_FUZZ_FACTOR) * tenths / MAX_TENTHS) as u8
        }
    }
}

/// Initial weights as they appear in `jfuzz.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    #[serde(default = "default_weight")]
    pub int: f64,
    #[serde(default = "default_weight")]
    pub bool: f64,
    #[serde(default = "default_weight")]
    pub text: f64,
    #[serde(default = "default_weight")]
    pub null: f64,
}

fn default_weight() -> f64 {
    10.0
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            int: default_weight(),
            bool: default_weight(),
            text: default_weight(),
            null: default_weight(),
        }
    }
}

impl BehaviorConfig {
    pub fn to_weights(&self) -> JfuzzResult<BehaviorWeights> {
        let mut weights = BehaviorWeights::default();
        weights.set(ValueKind::Int, self.int)?;
        weights.set(ValueKind::Bool, self.bool)?;
        weights.set(ValueKind::Text, self.text)?;
        weights.set(ValueKind::Null, self.null)?;
        Ok(weights)
    }
}
