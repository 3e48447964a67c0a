use hifitime::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ssr::UpdateInterval;

const fn default_validity_factor() -> f64 {
    2.0
}

const fn default_min_validity() -> f64 {
    5.0
}

const fn default_max_sequence_len() -> usize {
    32
}

const fn default_require_code_bias() -> bool {
    false
}

/// Correction stream handling
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CorrectionOpts {
    /// A correction remains valid for this many update intervals
    #[cfg_attr(feature = "serde", serde(default = "default_validity_factor"))]
    pub validity_factor: f64,
    /// Lower bound of the validity window (s)
    #[cfg_attr(feature = "serde", serde(default = "default_min_validity"))]
    pub min_validity_s: f64,
    /// Multi-message sequences longer than this are discarded
    #[cfg_attr(feature = "serde", serde(default = "default_max_sequence_len"))]
    pub max_sequence_len: usize,
    /// Skip signals that have no code bias correction
    #[cfg_attr(feature = "serde", serde(default = "default_require_code_bias"))]
    pub require_code_bias: bool,
}

impl Default for CorrectionOpts {
    fn default() -> Self {
        Self {
            validity_factor: default_validity_factor(),
            min_validity_s: default_min_validity(),
            max_sequence_len: default_max_sequence_len(),
            require_code_bias: default_require_code_bias(),
        }
    }
}

impl CorrectionOpts {
    /// Validity of a correction broadcasted with this [UpdateInterval]
    pub fn validity(&self, interval: UpdateInterval) -> Duration {
        let seconds = (interval.seconds() as f64 * self.validity_factor).max(self.min_validity_s);
        Duration::from_seconds(seconds)
    }
}
