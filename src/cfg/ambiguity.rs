//! Cycle slip screening and ambiguity resolution settings
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const fn default_max_gap() -> f64 {
    60.0
}

const fn default_gf_threshold() -> f64 {
    0.05
}

const fn default_gf_window() -> usize {
    6
}

const fn default_gf_degree() -> usize {
    2
}

const fn default_mw_threshold() -> f64 {
    4.0
}

const fn default_mw_min_samples() -> usize {
    3
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CycleSlipOpts {
    /// Maximal gap between two phase observations (s)
    #[cfg_attr(feature = "serde", serde(default = "default_max_gap"))]
    pub max_gap_s: f64,
    /// Geometry free jump against its polynomial prediction (m)
    #[cfg_attr(feature = "serde", serde(default = "default_gf_threshold"))]
    pub gf_threshold_m: f64,
    /// Number of past geometry free samples used by the prediction
    #[cfg_attr(feature = "serde", serde(default = "default_gf_window"))]
    pub gf_window: usize,
    /// Degree of the geometry free prediction polynomial
    #[cfg_attr(feature = "serde", serde(default = "default_gf_degree"))]
    pub gf_degree: usize,
    /// Melbourne-Wübbena jump against its running average (wide lane cycles)
    #[cfg_attr(feature = "serde", serde(default = "default_mw_threshold"))]
    pub mw_threshold_cycles: f64,
    /// Samples needed before the Melbourne-Wübbena test applies
    #[cfg_attr(feature = "serde", serde(default = "default_mw_min_samples"))]
    pub mw_min_samples: usize,
}

impl Default for CycleSlipOpts {
    fn default() -> Self {
        Self {
            max_gap_s: default_max_gap(),
            gf_threshold_m: default_gf_threshold(),
            gf_window: default_gf_window(),
            gf_degree: default_gf_degree(),
            mw_threshold_cycles: default_mw_threshold(),
            mw_min_samples: default_mw_min_samples(),
        }
    }
}

const fn default_ratio_threshold() -> f64 {
    3.0
}

const fn default_min_ambiguities() -> usize {
    4
}

const fn default_min_elevation() -> f64 {
    15.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AmbiguityOpts {
    /// Ratio test threshold (second best / best residuals)
    #[cfg_attr(feature = "serde", serde(default = "default_ratio_threshold"))]
    pub ratio_threshold: f64,
    /// Minimal number of single differences to attempt a fix
    #[cfg_attr(feature = "serde", serde(default = "default_min_ambiguities"))]
    pub min_ambiguities: usize,
    /// Minimal elevation (degrees) of satellites taking part in the fix
    #[cfg_attr(feature = "serde", serde(default = "default_min_elevation"))]
    pub min_elevation_deg: f64,
}

impl Default for AmbiguityOpts {
    fn default() -> Self {
        Self {
            ratio_threshold: default_ratio_threshold(),
            min_ambiguities: default_min_ambiguities(),
            min_elevation_deg: default_min_elevation(),
        }
    }
}
