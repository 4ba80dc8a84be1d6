use std::collections::VecDeque;

pub const RSI_PERIOD: usize = 14;
pub const RSI_UPPER: f64 = 55.0;
pub const RSI_LOWER: f64 = 45.0;

/// Floor applied to a zero average loss so the ratio stays finite.
const LOSS_FLOOR: f64 = 1e-12;

/// RSI over simple rolling means of close-to-close gains and losses.
///
/// Unlike Wilder smoothing, every value only depends on the last `period`
/// deltas. The first value appears once `period` deltas have been seen,
/// i.e. on the `period + 1`-th close.
#[derive(Debug, Clone)]
pub struct RollingRsi {
    period: usize,
    prev_close: Option<f64>,
    gains: VecDeque<f64>,
    losses: VecDeque<f64>,
}

impl RollingRsi {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "RSI period must be > 0");
        Self {
            period,
            prev_close: None,
            gains: VecDeque::with_capacity(period),
            losses: VecDeque::with_capacity(period),
        }
    }

    /// Push a close, return the RSI if the window is full.
    pub fn push(&mut self, close: f64) -> Option<f64> {
        let prev = self.prev_close.replace(close)?;
        let delta = close - prev;
        if self.gains.len() == self.period {
            self.gains.pop_front();
            self.losses.pop_front();
        }
        self.gains.push_back(delta.max(0.0));
        self.losses.push_back((-delta).max(0.0));
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        if self.gains.len() < self.period {
            return None;
        }
        let n = self.period as f64;
        let avg_gain = self.gains.iter().sum::<f64>() / n;
        let mut avg_loss = self.losses.iter().sum::<f64>() / n;
        if avg_loss == 0.0 {
            avg_loss = LOSS_FLOOR;
        }
        let rs = avg_gain / avg_loss;
        Some(100.0 - (100.0 / (1.0 + rs)))
    }

    pub fn is_ready(&self) -> bool {
        self.gains.len() >= self.period
    }
}

/// Three-way signal from an RSI value: strictly above the upper band is +1,
/// strictly below the lower band is -1, anything else (including an
/// undefined RSI) is 0.
pub fn rsi_signal(rsi: Option<f64>, lower: f64, upper: f64) -> i8 {
    match rsi {
        Some(v) if v > upper => 1,
        Some(v) if v < lower => -1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_period_plus_one_closes() {
        let mut rsi = RollingRsi::new(3);
        assert_eq!(rsi.push(10.0), None);
        assert_eq!(rsi.push(11.0), None);
        assert_eq!(rsi.push(12.0), None);
        assert!(!rsi.is_ready());
        assert!(rsi.push(11.0).is_some());
        assert!(rsi.is_ready());
    }

    #[test]
    fn only_gains_saturates_near_100() {
        let mut rsi = RollingRsi::new(3);
        let mut last = None;
        for c in [1.0, 2.0, 3.0, 4.0, 5.0] {
            last = rsi.push(c);
        }
        let v = last.unwrap();
        assert!(v > 99.999 && v <= 100.0);
    }

    #[test]
    fn window_drops_old_deltas() {
        let mut rsi = RollingRsi::new(2);
        rsi.push(10.0);
        rsi.push(5.0); // -5
        rsi.push(6.0); // +1 -> gains [0,1] losses [5,0]
        let v = rsi.push(7.0).unwrap(); // window [+1, +1]
        assert!(v > 99.999);
    }

    #[test]
    fn balanced_moves_give_50() {
        let mut rsi = RollingRsi::new(2);
        rsi.push(10.0);
        rsi.push(11.0);
        let v = rsi.push(10.0).unwrap();
        assert!((v - 50.0).abs() < 1e-9);
    }

    #[test]
    fn signal_thresholds_are_strict() {
        assert_eq!(rsi_signal(Some(55.0), RSI_LOWER, RSI_UPPER), 0);
        assert_eq!(rsi_signal(Some(55.1), RSI_LOWER, RSI_UPPER), 1);
        assert_eq!(rsi_signal(Some(45.0), RSI_LOWER, RSI_UPPER), 0);
        assert_eq!(rsi_signal(Some(44.9), RSI_LOWER, RSI_UPPER), -1);
        assert_eq!(rsi_signal(None, RSI_LOWER, RSI_UPPER), 0);
    }

    #[test]
    #[should_panic(expected = "RSI period must be > 0")]
    fn zero_period_panics() {
        RollingRsi::new(0);
    }
}
