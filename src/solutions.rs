//! Epoch solutions
use crate::{
    navigation::FilterStatus,
    prelude::{Epoch, Vector3, SV},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Carrier phase ambiguity state of one satellite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AmbiguityStatus {
    /// Estimated as real numbers
    Float,
    /// Integer fix accepted at this epoch
    Fixed,
    /// Not estimated (code only, or reset by a cycle slip)
    Unresolved,
}

impl std::fmt::Display for AmbiguityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Float => write!(f, "float"),
            Self::Fixed => write!(f, "fixed"),
            Self::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// Overall quality of an [EpochResult]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SolutionQuality {
    /// Integer ambiguities fixed, position conditioned on them
    Fixed,
    /// Float solution
    Float,
    /// Filter is degraded, or this epoch update was rejected
    Degraded,
}

impl std::fmt::Display for SolutionQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Float => write!(f, "float"),
            Self::Degraded => write!(f, "degraded"),
        }
    }
}

/// Solution of one epoch
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EpochResult {
    /// Sampling [Epoch]
    pub epoch: Epoch,
    /// Receiver position, ECEF (m)
    pub position_ecef_m: (f64, f64, f64),
    /// Position covariance (m²)
    pub covariance_m2: [[f64; 3]; 3],
    /// Receiver clock offset (m)
    pub clock_m: f64,
    /// Ambiguity state per satellite, in ascending order
    pub ambiguities: Vec<(SV, AmbiguityStatus)>,
    pub quality: SolutionQuality,
    pub status: FilterStatus,
    /// Number of satellites that contributed
    pub satellites: usize,
    /// Ratio test value, when ambiguity resolution was attempted
    pub ar_ratio: Option<f64>,
}

impl EpochResult {
    /// Position as [Vector3]
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(
            self.position_ecef_m.0,
            self.position_ecef_m.1,
            self.position_ecef_m.2,
        )
    }

    /// Position covariance trace (m²)
    pub fn covariance_trace(&self) -> f64 {
        self.covariance_m2[0][0] + self.covariance_m2[1][1] + self.covariance_m2[2][2]
    }

    /// [AmbiguityStatus] of this satellite
    pub fn ambiguity(&self, sv: SV) -> Option<AmbiguityStatus> {
        self.ambiguities
            .iter()
            .find(|(s, _)| *s == sv)
            .map(|(_, status)| *status)
    }

    pub fn is_fixed(&self) -> bool {
        self.quality == SolutionQuality::Fixed
    }
}
