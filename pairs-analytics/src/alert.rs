use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Spread z-score breach of an absolute threshold.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Display)]
#[display("ALERT: Z-Score breached ({zscore:.2})")]
pub struct Alert {
    pub zscore: f64,
    pub threshold: f64,
}

impl Alert {
    /// True if the spread is above its rolling mean, ie/ `y` is rich relative to `x`.
    pub fn is_upper(&self) -> bool {
        self.zscore > 0.0
    }
}

/// Alert iff `|zscore| > threshold`. A `NaN` z-score never alerts.
pub fn check_zscore_alert(zscore: f64, threshold: f64) -> Option<Alert> {
    (zscore.abs() > threshold).then_some(Alert { zscore, threshold })
}
