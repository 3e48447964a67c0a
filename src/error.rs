use thiserror::Error;

use crate::{navigation::StateError, prelude::Epoch};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Not enough satellites contributed to this epoch.
    /// The epoch is skipped and the filter state is left untouched.
    #[error("not enough satellites: {needed} needed, {available} available")]
    InsufficientGeometry { needed: usize, available: usize },

    /// Innovation covariance (or updated covariance) is not positive definite:
    /// the update is rejected, prior state is retained.
    #[error("numeric instability")]
    NumericInstability,

    /// Integer candidate did not pass the ratio test.
    /// Internal to the ambiguity resolution, the float solution is kept.
    #[error("ambiguity fix rejected: ratio={ratio:.2}")]
    AmbiguityRejected { ratio: f64 },

    /// Ambiguity factorization failed
    #[error("ambiguity factorization error")]
    AmbiguityFactorization,

    /// Integer search did not complete
    #[error("ambiguity search error")]
    AmbiguitySearch,

    /// Matrix inversion error during ambiguity solving process
    #[error("ambiguity inverse error")]
    AmbiguityInverse,

    /// Least squares geometry is singular
    #[error("failed to invert matrix")]
    MatrixInversion,

    #[error("internal error: filter is not initialized")]
    UninitializedFilter,

    /// Epochs must be processed in chronological order
    #[error("{0}: epoch is not posterior to the filter state")]
    OutdatedEpoch(Epoch),

    #[error("state vector error: {0}")]
    StateVector(#[from] StateError),
}
