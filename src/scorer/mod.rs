//! Online logistic scorer over the five-element features.
//!
//! The scorer is a plain `ModelState` value: callers pass it in, `update`
//! mutates it, and persistence happens at an explicit boundary
//! (`state::persist_model_state_to_path`).

pub mod state;

use crate::calendar::GateLabel;
use crate::model::element::Element;
use crate::model::merged::MergedRow;

pub use state::ModelState;

/// Weight of the RSI signal in the raw score.
pub const RSI_SIGNAL_WEIGHT: f64 = 0.1;
/// Bias steps are scaled down relative to weight steps.
pub const BIAS_STEP_SCALE: f64 = 0.2;
/// Probabilities at or above this predict "up".
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Result of one online update, for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateOutcome {
    pub grad: f64,
    pub predicted_up: bool,
    pub hit: bool,
}

/// Unknown or missing gates contribute nothing.
pub fn gate_adjustment(gate: Option<&GateLabel>) -> f64 {
    gate.map(GateLabel::adjustment).unwrap_or(0.0)
}

/// Standard logistic function.
pub fn probability(score: f64) -> f64 {
    1.0 / (1.0 + (-score).exp())
}

impl ModelState {
    /// `bias + Σ w·x + gate adjustment + 0.1·rsi_signal`, accumulated in that order.
    pub fn score(&self, row: &MergedRow) -> f64 {
        let mut s = self.bias;
        for element in Element::ALL {
            s += self.weights.get(element) * row.elements().get(element);
        }
        s += gate_adjustment(row.gate());
        s += RSI_SIGNAL_WEIGHT * f64::from(row.rsi_signal);
        s
    }

    pub fn probability(&self, row: &MergedRow) -> f64 {
        probability(self.score(row))
    }

    /// One online gradient step toward `actual_label` (+1 up, anything else
    /// down), then the EMA accuracy and day counter.
    pub fn update(
        &mut self,
        row: &MergedRow,
        probability: f64,
        actual_label: i8,
    ) -> UpdateOutcome {
        let y = if actual_label > 0 { 1.0 } else { 0.0 };
        let grad = probability - y;

        self.bias -= self.learning_rate * grad * BIAS_STEP_SCALE;
        for element in Element::ALL {
            let x = row.elements().get(element);
            *self.weights.get_mut(element) -= self.learning_rate * grad * x;
        }

        let predicted_up = probability >= DECISION_THRESHOLD;
        let hit = predicted_up == (y == 1.0);
        let hit_value = if hit { 1.0 } else { 0.0 };
        self.ema_accuracy =
            (1.0 - self.ema_alpha) * self.ema_accuracy + self.ema_alpha * hit_value;
        self.days_seen += 1;

        UpdateOutcome {
            grad,
            predicted_up,
            hit,
        }
    }

    /// Score, then update on the same row. Returns the pre-update probability.
    pub fn train_step(&mut self, row: &MergedRow, actual_label: i8) -> (f64, UpdateOutcome) {
        let p = self.probability(row);
        let outcome = self.update(row, p, actual_label);
        (p, outcome)
    }
}
