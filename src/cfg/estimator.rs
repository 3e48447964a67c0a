//! Filter tuning
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const fn default_position_sigma() -> f64 {
    30.0
}

const fn default_clock_sigma() -> f64 {
    100.0
}

const fn default_isb_sigma() -> f64 {
    30.0
}

const fn default_tropo_sigma() -> f64 {
    0.3
}

const fn default_iono_sigma() -> f64 {
    10.0
}

const fn default_ambiguity_sigma() -> f64 {
    30.0
}

const fn default_code_bias_sigma() -> f64 {
    1.0
}

const fn default_clock_psd() -> f64 {
    1.0E4
}

const fn default_isb_psd() -> f64 {
    1.0E-7
}

const fn default_tropo_psd() -> f64 {
    1.0E-8
}

const fn default_iono_psd() -> f64 {
    1.0E-4
}

const fn default_outlier_sigma() -> f64 {
    6.0
}

const fn default_max_outlier_rate() -> f64 {
    0.3
}

const fn default_convergence_trace() -> f64 {
    2.5E-3
}

const fn default_convergence_epochs() -> usize {
    5
}

const fn default_recovery_epochs() -> usize {
    3
}

const fn default_max_outage() -> f64 {
    60.0
}

const fn default_max_iterations() -> usize {
    10
}

/// Sequential filter tuning.
/// Initial sigmas are expressed in meters, power spectral densities in m².s⁻¹.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EstimatorOpts {
    /// Initial position sigma (per axis), after the initial fix
    #[cfg_attr(feature = "serde", serde(default = "default_position_sigma"))]
    pub position_sigma_m: f64,
    /// Initial receiver clock sigma
    #[cfg_attr(feature = "serde", serde(default = "default_clock_sigma"))]
    pub clock_sigma_m: f64,
    /// Initial inter-system bias sigma
    #[cfg_attr(feature = "serde", serde(default = "default_isb_sigma"))]
    pub isb_sigma_m: f64,
    /// Initial zenith wet delay sigma
    #[cfg_attr(feature = "serde", serde(default = "default_tropo_sigma"))]
    pub tropo_sigma_m: f64,
    /// Initial slant ionosphere sigma
    #[cfg_attr(feature = "serde", serde(default = "default_iono_sigma"))]
    pub iono_sigma_m: f64,
    /// Initial ambiguity sigma, converted to cycles per signal
    #[cfg_attr(feature = "serde", serde(default = "default_ambiguity_sigma"))]
    pub ambiguity_sigma_m: f64,
    /// Initial differential code bias sigma
    #[cfg_attr(feature = "serde", serde(default = "default_code_bias_sigma"))]
    pub code_bias_sigma_m: f64,
    /// Receiver clock random walk
    #[cfg_attr(feature = "serde", serde(default = "default_clock_psd"))]
    pub clock_psd: f64,
    /// Inter-system bias random walk
    #[cfg_attr(feature = "serde", serde(default = "default_isb_psd"))]
    pub isb_psd: f64,
    /// Zenith wet delay random walk
    #[cfg_attr(feature = "serde", serde(default = "default_tropo_psd"))]
    pub tropo_psd: f64,
    /// Slant ionosphere random walk
    #[cfg_attr(feature = "serde", serde(default = "default_iono_psd"))]
    pub iono_psd: f64,
    /// Normalized innovation above which an observation is rejected
    #[cfg_attr(feature = "serde", serde(default = "default_outlier_sigma"))]
    pub outlier_sigma: f64,
    /// Rate of rejected observations that degrades the filter
    #[cfg_attr(feature = "serde", serde(default = "default_max_outlier_rate"))]
    pub max_outlier_rate: f64,
    /// Position covariance trace (m²) below which the filter is converging
    #[cfg_attr(feature = "serde", serde(default = "default_convergence_trace"))]
    pub convergence_trace_m2: f64,
    /// Consecutive epochs below [Self::convergence_trace_m2] to declare convergence
    #[cfg_attr(feature = "serde", serde(default = "default_convergence_epochs"))]
    pub convergence_epochs: usize,
    /// Consecutive clean epochs to exit the degraded state
    #[cfg_attr(feature = "serde", serde(default = "default_recovery_epochs"))]
    pub recovery_epochs: usize,
    /// Satellite states are dropped when not observed for that long (s)
    #[cfg_attr(feature = "serde", serde(default = "default_max_outage"))]
    pub max_outage_s: f64,
    /// Maximal number of iterations of the initial least squares fix
    #[cfg_attr(feature = "serde", serde(default = "default_max_iterations"))]
    pub max_iterations: usize,
}

impl Default for EstimatorOpts {
    fn default() -> Self {
        Self {
            position_sigma_m: default_position_sigma(),
            clock_sigma_m: default_clock_sigma(),
            isb_sigma_m: default_isb_sigma(),
            tropo_sigma_m: default_tropo_sigma(),
            iono_sigma_m: default_iono_sigma(),
            ambiguity_sigma_m: default_ambiguity_sigma(),
            code_bias_sigma_m: default_code_bias_sigma(),
            clock_psd: default_clock_psd(),
            isb_psd: default_isb_psd(),
            tropo_psd: default_tropo_psd(),
            iono_psd: default_iono_psd(),
            outlier_sigma: default_outlier_sigma(),
            max_outlier_rate: default_max_outlier_rate(),
            convergence_trace_m2: default_convergence_trace(),
            convergence_epochs: default_convergence_epochs(),
            recovery_epochs: default_recovery_epochs(),
            max_outage_s: default_max_outage(),
            max_iterations: default_max_iterations(),
        }
    }
}

const fn default_phase_a() -> f64 {
    0.003
}

const fn default_phase_b() -> f64 {
    0.003
}

const fn default_code_phase_ratio() -> f64 {
    100.0
}

const fn default_use_ura() -> bool {
    true
}

/// Elevation dependent observation weighting:
/// σ² = a² + b² / sin²(e) for phase, scaled by the code/phase ratio for code,
/// plus the satellite URA when available.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeightOpts {
    #[cfg_attr(feature = "serde", serde(default = "default_phase_a"))]
    pub phase_a_m: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_phase_b"))]
    pub phase_b_m: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_code_phase_ratio"))]
    pub code_phase_ratio: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_use_ura"))]
    pub use_ura: bool,
}

impl Default for WeightOpts {
    fn default() -> Self {
        Self {
            phase_a_m: default_phase_a(),
            phase_b_m: default_phase_b(),
            code_phase_ratio: default_code_phase_ratio(),
            use_ura: default_use_ura(),
        }
    }
}

impl WeightOpts {
    /// Phase variance (m²) at this elevation
    pub(crate) fn phase_variance(&self, elevation_rad: f64) -> f64 {
        let sin_e = elevation_rad.sin().max(0.05);
        self.phase_a_m.powi(2) + self.phase_b_m.powi(2) / sin_e.powi(2)
    }

    /// Code variance (m²) at this elevation
    pub(crate) fn code_variance(&self, elevation_rad: f64) -> f64 {
        self.code_phase_ratio.powi(2) * self.phase_variance(elevation_rad)
    }
}
