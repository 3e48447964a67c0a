#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod adapter;
mod carrier;
mod cfg;
mod constants;
mod corrections;
mod error;
mod geodesy;
mod navigation;
mod resolver;
mod solutions;

// public modules
pub mod ssr;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::adapter::{
        BufferedAdapter, EphemerisState, EpochObservations, ObservationAdapter,
        SatelliteObservation, SignalObservation,
    };
    pub use crate::carrier::{Carrier, Signal};
    pub use crate::cfg::{
        AmbiguityOpts, Config, CorrectionOpts, CycleSlipOpts, EstimatorOpts, Method, Modeling,
        Profile, WeightOpts,
    };
    pub use crate::cfg::Error as ConfigError;
    pub use crate::corrections::{
        ClockState, Correction, CorrectionKey, CorrectionKind, CorrectionRecord,
        CorrectionSnapshot, CorrectionStore, OrbitState,
    };
    pub use crate::error::Error;
    pub use crate::navigation::{ComponentId, Estimator, FilterStatus, SlipCause, StateError, StateVector};
    pub use crate::resolver::PositionResolver;
    pub use crate::solutions::{AmbiguityStatus, EpochResult, SolutionQuality};
    pub use crate::ssr::{Decoder, DecodingError};
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch, TimeScale};
    pub use nalgebra::Vector3;
}

// pub export
pub use error::Error;
