/// Local stand-in for the sequence model: exponentially weighted mean of
/// the window's log returns, reported as a simple return.
#[derive(Debug, Clone, Copy)]
pub struct EwmaReturnPredictor {
    alpha: f64,
}

impl EwmaReturnPredictor {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    pub fn predict(&self, closes: &[f64]) -> f64 {
        let mut prev: Option<f64> = None;
        let mut mu: Option<f64> = None;
        for p in closes {
            if !p.is_finite() || *p <= f64::EPSILON {
                continue;
            }
            if let Some(pp) = prev {
                let r = (p / pp).ln();
                mu = Some(match mu {
                    None => r,
                    Some(m) => (1.0 - self.alpha) * m + self.alpha * r,
                });
            }
            prev = Some(*p);
        }
        let predicted = mu.map(f64::exp_m1).unwrap_or(0.0);
        if predicted.is_finite() {
            predicted
        } else {
            0.0
        }
    }
}

impl Default for EwmaReturnPredictor {
    fn default() -> Self {
        Self::new(0.1)
    }
}
