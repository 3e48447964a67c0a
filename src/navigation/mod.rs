//! Sequential state estimation
mod ambiguity;
mod estimator;
mod kalman;
mod lambda;
mod lsq;
mod model;
mod slip;
mod state;
mod status;

pub use estimator::Estimator;
pub use slip::SlipCause;
pub use state::{ComponentId, StateError, StateVector};
pub use status::FilterStatus;
