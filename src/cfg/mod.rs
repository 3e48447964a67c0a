use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod ambiguity;
mod corrections;
mod estimator;
mod method;
mod profile;

pub use ambiguity::{AmbiguityOpts, CycleSlipOpts};
pub use corrections::CorrectionOpts;
pub use estimator::{EstimatorOpts, WeightOpts};
pub use method::Method;
pub use profile::Profile;

/// Configuration Error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("unknown navigation method")]
    UnknownNavigationMethod,
    #[error("invalid user profile")]
    InvalidUserProfile,
}

fn default_min_elevation() -> f64 {
    10.0
}

fn default_earth_rotation() -> bool {
    true
}

fn default_tropo() -> bool {
    true
}

fn default_iono() -> bool {
    true
}

fn default_isb() -> bool {
    true
}

fn default_code_bias() -> bool {
    true
}

fn default_phase() -> bool {
    true
}

/// Physical modeling and estimated parameters
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Modeling {
    /// Compensate for Earth rotation during signal propagation (Sagnac)
    #[cfg_attr(feature = "serde", serde(default = "default_earth_rotation"))]
    pub earth_rotation: bool,
    /// A-priori hydrostatic troposphere and estimated zenith wet delay
    #[cfg_attr(feature = "serde", serde(default = "default_tropo"))]
    pub tropo_delay: bool,
    /// Estimate one slant ionosphere delay per satellite
    #[cfg_attr(feature = "serde", serde(default = "default_iono"))]
    pub iono_delay: bool,
    /// Estimate inter-system clock offsets, in multi constellation context
    #[cfg_attr(feature = "serde", serde(default = "default_isb"))]
    pub inter_system_bias: bool,
    /// Estimate differential code biases that corrections do not provide
    #[cfg_attr(feature = "serde", serde(default = "default_code_bias"))]
    pub code_bias: bool,
    /// Use carrier phase observations
    #[cfg_attr(feature = "serde", serde(default = "default_phase"))]
    pub phase: bool,
}

impl Default for Modeling {
    fn default() -> Self {
        Self {
            earth_rotation: default_earth_rotation(),
            tropo_delay: default_tropo(),
            iono_delay: default_iono(),
            inter_system_bias: default_isb(),
            code_bias: default_code_bias(),
            phase: default_phase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Positioning [Method]
    #[cfg_attr(feature = "serde", serde(default))]
    pub method: Method,
    /// [Profile] defines the type of application.
    #[cfg_attr(feature = "serde", serde(default))]
    pub profile: Profile,
    /// A-priori receiver position, ECEF (m). The initial
    /// least squares fix is skipped when defined.
    #[cfg_attr(feature = "serde", serde(default))]
    pub apriori_position: Option<(f64, f64, f64)>,
    /// Elevation mask (degrees)
    #[cfg_attr(feature = "serde", serde(default = "default_min_elevation"))]
    pub min_elevation_deg: f64,
    /// Minimal SNR (dB-Hz) for a signal to contribute
    #[cfg_attr(feature = "serde", serde(default))]
    pub min_snr_dbhz: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub modeling: Modeling,
    #[cfg_attr(feature = "serde", serde(default))]
    pub estimator: EstimatorOpts,
    #[cfg_attr(feature = "serde", serde(default))]
    pub weight: WeightOpts,
    #[cfg_attr(feature = "serde", serde(default))]
    pub cycle_slip: CycleSlipOpts,
    #[cfg_attr(feature = "serde", serde(default))]
    pub ambiguity: AmbiguityOpts,
    #[cfg_attr(feature = "serde", serde(default))]
    pub corrections: CorrectionOpts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            method: Method::default(),
            profile: Profile::default(),
            apriori_position: None,
            min_elevation_deg: default_min_elevation(),
            min_snr_dbhz: None,
            modeling: Modeling::default(),
            estimator: EstimatorOpts::default(),
            weight: WeightOpts::default(),
            cycle_slip: CycleSlipOpts::default(),
            ambiguity: AmbiguityOpts::default(),
            corrections: CorrectionOpts::default(),
        }
    }
}

impl Config {
    /// Returns [Config] for static positioning, with desired [Method].
    /// You can then customize [Self] as you will.
    pub fn static_preset(method: Method) -> Self {
        let mut s = Self::default();
        s.profile = Profile::Static;
        s.method = method;
        s.min_elevation_deg = 10.0;
        s
    }

    /// Returns [Config] for roaming applications, with desired [Method]
    /// and rover [Profile]. You can then customize [Self] as you will.
    pub fn kinematic_preset(profile: Profile, method: Method) -> Self {
        let mut s = Self::default();
        s.profile = profile;
        s.method = method;
        s.min_elevation_deg = 15.0;
        s.estimator.max_outage_s = 30.0;
        s
    }

    /// Copies and returns [Config] with a-priori position
    pub fn with_apriori_position(&self, ecef_m: (f64, f64, f64)) -> Self {
        let mut s = self.clone();
        s.apriori_position = Some(ecef_m);
        s
    }

    /// Copies and returns [Config] with desired [Method]
    pub fn with_method(&self, method: Method) -> Self {
        let mut s = self.clone();
        s.method = method;
        s
    }
}
