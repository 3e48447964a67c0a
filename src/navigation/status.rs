#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sequential filter state
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FilterStatus {
    /// Not initialized yet
    #[default]
    Cold,
    /// Initialized, position covariance still large
    Converging,
    /// Position covariance remained small enough for several epochs.
    /// Ambiguity resolution is only attempted in this state.
    Converged,
    /// A cycle slip or too many outliers were detected recently
    Degraded,
}

impl FilterStatus {
    pub fn is_initialized(&self) -> bool {
        *self != Self::Cold
    }
}

impl std::fmt::Display for FilterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Cold => write!(f, "cold"),
            Self::Converging => write!(f, "converging"),
            Self::Converged => write!(f, "converged"),
            Self::Degraded => write!(f, "degraded"),
        }
    }
}
