//! Dynamic state vector: estimates and covariance indexed by component.
use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use crate::{
    carrier::Signal,
    prelude::{Constellation, SV},
};

/// Identity of one estimated component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentId {
    /// Receiver ECEF X (m)
    PositionX,
    /// Receiver ECEF Y (m)
    PositionY,
    /// Receiver ECEF Z (m)
    PositionZ,
    /// Receiver clock offset (m)
    Clock,
    /// Clock offset of this constellation with respect to the reference one (m)
    InterSystemBias(Constellation),
    /// Zenith wet delay (m)
    TropoWet,
    /// Slant ionosphere delay on the reference frequency (m)
    Iono(SV),
    /// Carrier phase ambiguity (cycles)
    Ambiguity(SV, Signal),
    /// Differential code bias (m)
    CodeBias(SV, Signal),
}

impl ComponentId {
    /// Satellite this component is attached to
    pub fn sv(&self) -> Option<SV> {
        match self {
            Self::Iono(sv) | Self::Ambiguity(sv, _) | Self::CodeBias(sv, _) => Some(*sv),
            _ => None,
        }
    }

    pub fn is_position(&self) -> bool {
        matches!(self, Self::PositionX | Self::PositionY | Self::PositionZ)
    }

    pub fn is_ambiguity(&self) -> bool {
        matches!(self, Self::Ambiguity(_, _))
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::PositionX => write!(f, "x"),
            Self::PositionY => write!(f, "y"),
            Self::PositionZ => write!(f, "z"),
            Self::Clock => write!(f, "clock"),
            Self::InterSystemBias(c) => write!(f, "isb({})", c),
            Self::TropoWet => write!(f, "zwd"),
            Self::Iono(sv) => write!(f, "iono({})", sv),
            Self::Ambiguity(sv, signal) => write!(f, "amb({}/{})", sv, signal),
            Self::CodeBias(sv, signal) => write!(f, "dcb({}/{})", sv, signal),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("component {0} already exists")]
    DuplicateComponent(ComponentId),
    #[error("unknown component {0}")]
    UnknownComponent(ComponentId),
    #[error("invalid variance {0}")]
    InvalidVariance(f64),
    #[error("cross covariance of {0} is not positive semi-definite")]
    InvalidCrossCovariance(ComponentId),
    #[error("dimension mismatch: {expected} expected, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

/// [StateVector] stores the estimate `x` and its covariance `P`.
/// Components are appended on insertion and compacted on removal,
/// so the slot of a component is stable in between.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    ids: Vec<ComponentId>,
    slots: HashMap<ComponentId, usize>,
    x: DVector<f64>,
    p: DMatrix<f64>,
}

fn check_variance(variance: f64) -> Result<(), StateError> {
    if variance.is_finite() && variance >= 0.0 {
        Ok(())
    } else {
        Err(StateError::InvalidVariance(variance))
    }
}

impl Default for StateVector {
    fn default() -> Self {
        Self::new()
    }
}

impl StateVector {
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            slots: HashMap::new(),
            x: DVector::zeros(0),
            p: DMatrix::zeros(0, 0),
        }
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &ComponentId) -> bool {
        self.slots.contains_key(id)
    }

    /// Slot of this component
    pub fn slot(&self, id: &ComponentId) -> Option<usize> {
        self.slots.get(id).copied()
    }

    /// Components, in slot order
    pub fn ids(&self) -> &[ComponentId] {
        &self.ids
    }

    pub fn x(&self) -> &DVector<f64> {
        &self.x
    }

    pub fn p(&self) -> &DMatrix<f64> {
        &self.p
    }

    /// Appends a new component, uncorrelated to the others.
    pub fn add_component(
        &mut self,
        id: ComponentId,
        value: f64,
        variance: f64,
    ) -> Result<usize, StateError> {
        self.add_component_seeded(id, value, variance, &[])
    }

    /// Appends a new component with initial cross covariance
    /// to existing components.
    pub fn add_component_seeded(
        &mut self,
        id: ComponentId,
        value: f64,
        variance: f64,
        cross: &[(ComponentId, f64)],
    ) -> Result<usize, StateError> {
        if self.contains(&id) {
            return Err(StateError::DuplicateComponent(id));
        }
        check_variance(variance)?;

        for (other, _) in cross.iter() {
            if !self.contains(other) {
                return Err(StateError::UnknownComponent(*other));
            }
        }

        if !cross.is_empty() {
            self.check_cross_covariance(id, variance, cross)?;
        }

        let n = self.len();

        let mut x = DVector::zeros(n + 1);
        x.rows_mut(0, n).copy_from(&self.x);
        x[n] = value;

        let mut p = DMatrix::zeros(n + 1, n + 1);
        p.view_mut((0, 0), (n, n)).copy_from(&self.p);
        p[(n, n)] = variance;

        for (other, covariance) in cross.iter() {
            let slot = self.slots[other];
            p[(n, slot)] = *covariance;
            p[(slot, n)] = *covariance;
        }

        self.x = x;
        self.p = p;
        self.ids.push(id);
        self.slots.insert(id, n);
        Ok(n)
    }

    /// The bordered covariance stays positive semi-definite when the
    /// Schur complement `variance - c' P⁻¹ c` over the seeded block is not negative.
    fn check_cross_covariance(
        &self,
        id: ComponentId,
        variance: f64,
        cross: &[(ComponentId, f64)],
    ) -> Result<(), StateError> {
        let slots = cross
            .iter()
            .map(|(other, _)| self.slots[other])
            .collect::<Vec<_>>();

        let k = slots.len();
        let block = DMatrix::from_fn(k, k, |i, j| self.p[(slots[i], slots[j])]);
        let c = DVector::from_iterator(k, cross.iter().map(|(_, cov)| *cov));

        let cholesky = block
            .cholesky()
            .ok_or(StateError::InvalidCrossCovariance(id))?;

        let schur = variance - c.dot(&cholesky.solve(&c));

        if schur < -1.0E-9 * variance.max(1.0) {
            return Err(StateError::InvalidCrossCovariance(id));
        }

        Ok(())
    }

    /// Removes this component (marginalization): its row and column
    /// are dropped, other estimates and covariances are preserved.
    /// Returns the last estimate and variance.
    pub fn remove_component(&mut self, id: &ComponentId) -> Result<(f64, f64), StateError> {
        let slot = self.slot(id).ok_or(StateError::UnknownComponent(*id))?;
        let removed = (self.x[slot], self.p[(slot, slot)]);

        let x = std::mem::replace(&mut self.x, DVector::zeros(0));
        self.x = x.remove_row(slot);

        let p = std::mem::replace(&mut self.p, DMatrix::zeros(0, 0));
        self.p = p.remove_row(slot).remove_column(slot);

        self.ids.remove(slot);
        self.slots.remove(id);

        for (i, id) in self.ids.iter().enumerate().skip(slot) {
            self.slots.insert(*id, i);
        }

        Ok(removed)
    }

    /// Removes all components attached to this satellite
    pub fn remove_satellite(&mut self, sv: SV) -> Vec<ComponentId> {
        let ids = self
            .ids
            .iter()
            .filter(|id| id.sv() == Some(sv))
            .copied()
            .collect::<Vec<_>>();

        for id in ids.iter() {
            let _ = self.remove_component(id);
        }

        ids
    }

    /// Re-initializes this component: correlations are cleared.
    pub fn reset_component(
        &mut self,
        id: &ComponentId,
        value: f64,
        variance: f64,
    ) -> Result<(), StateError> {
        check_variance(variance)?;
        let slot = self.slot(id).ok_or(StateError::UnknownComponent(*id))?;

        self.p.row_mut(slot).fill(0.0);
        self.p.column_mut(slot).fill(0.0);
        self.p[(slot, slot)] = variance;
        self.x[slot] = value;
        Ok(())
    }

    pub fn get(&self, id: &ComponentId) -> Option<f64> {
        self.slot(id).map(|slot| self.x[slot])
    }

    pub fn set(&mut self, id: &ComponentId, value: f64) -> Result<(), StateError> {
        let slot = self.slot(id).ok_or(StateError::UnknownComponent(*id))?;
        self.x[slot] = value;
        Ok(())
    }

    pub fn variance(&self, id: &ComponentId) -> Option<f64> {
        self.slot(id).map(|slot| self.p[(slot, slot)])
    }

    /// Covariance sub matrix of these components, in requested order
    pub fn covariance_of(&self, ids: &[ComponentId]) -> Result<DMatrix<f64>, StateError> {
        let slots = ids
            .iter()
            .map(|id| self.slot(id).ok_or(StateError::UnknownComponent(*id)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DMatrix::from_fn(slots.len(), slots.len(), |i, j| {
            self.p[(slots[i], slots[j])]
        }))
    }

    /// Estimates of these components, in requested order
    pub fn values_of(&self, ids: &[ComponentId]) -> Result<DVector<f64>, StateError> {
        let values = ids
            .iter()
            .map(|id| self.get(id).ok_or(StateError::UnknownComponent(*id)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DVector::from_vec(values))
    }

    /// Returns (component, estimate, variance) for all components
    pub fn dump(&self) -> Vec<(ComponentId, f64, f64)> {
        self.ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, self.x[i], self.p[(i, i)]))
            .collect()
    }

    /// Replaces estimate and covariance
    pub(crate) fn replace(&mut self, x: DVector<f64>, p: DMatrix<f64>) -> Result<(), StateError> {
        let n = self.len();
        if x.nrows() != n {
            return Err(StateError::DimensionMismatch {
                expected: n,
                found: x.nrows(),
            });
        }
        if p.nrows() != n || p.ncols() != n {
            return Err(StateError::DimensionMismatch {
                expected: n,
                found: p.nrows(),
            });
        }
        self.x = x;
        self.p = p;
        Ok(())
    }

    /// Adds `q` to the variance of this component
    pub(crate) fn add_process_noise(&mut self, slot: usize, q: f64) {
        self.p[(slot, slot)] += q;
    }
}
