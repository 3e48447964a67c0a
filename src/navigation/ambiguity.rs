//! Integer ambiguity resolution on between satellite single differences
use itertools::Itertools;
use log::debug;
use nalgebra::{DMatrix, Matrix3, Vector3};

use crate::{
    cfg::AmbiguityOpts,
    error::Error,
    navigation::{
        lambda::lambda,
        state::{ComponentId, StateError, StateVector},
    },
};

/// Ambiguity eligible to integer resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    /// [ComponentId::Ambiguity]
    pub id: ComponentId,
    pub elevation_rad: f64,
}

/// Fixed solution, conditioned on the accepted integer candidate
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FixedSolution {
    pub position_m: Vector3<f64>,
    pub covariance_m2: Matrix3<f64>,
    pub clock_m: f64,
    pub ratio: f64,
    /// Ambiguities taking part in the fix
    pub fixed: Vec<ComponentId>,
}

/// Between satellite single differences, formed per constellation and
/// signal against the highest satellite. Returns (reference, other) pairs.
fn single_differences(candidates: &[Candidate], opts: &AmbiguityOpts) -> Vec<(ComponentId, ComponentId)> {
    let min_elevation = opts.min_elevation_deg.to_radians();

    let mut eligible = candidates
        .iter()
        .filter_map(|cd| match cd.id {
            ComponentId::Ambiguity(sv, signal) if cd.elevation_rad >= min_elevation => {
                Some(((sv.constellation, signal), cd))
            },
            _ => None,
        })
        .collect::<Vec<_>>();

    eligible.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut pairs = Vec::new();

    for (_, group) in &eligible.iter().chunk_by(|(key, _)| *key) {
        let group = group.map(|(_, cd)| *cd).collect::<Vec<_>>();
        if group.len() < 2 {
            continue;
        }

        let reference = group
            .iter()
            .max_by(|a, b| a.elevation_rad.total_cmp(&b.elevation_rad))
            .map(|cd| cd.id);

        if let Some(reference) = reference {
            for cd in group.iter() {
                if cd.id != reference {
                    pairs.push((reference, cd.id));
                }
            }
        }
    }

    pairs
}

/// Attempts to fix the single difference ambiguities of the float `state`.
/// Returns None when not enough ambiguities are eligible, or
/// [Error::AmbiguityRejected] when the ratio test fails.
/// The float state is never modified.
pub(crate) fn resolve(
    state: &StateVector,
    candidates: &[Candidate],
    opts: &AmbiguityOpts,
) -> Result<Option<FixedSolution>, Error> {
    let pairs = single_differences(candidates, opts);

    if pairs.len() < opts.min_ambiguities.max(1) {
        debug!("ambiguity resolution: {} single difference(s), not attempted", pairs.len());
        return Ok(None);
    }

    let n = state.len();
    let mut d = DMatrix::<f64>::zeros(pairs.len(), n);

    for (row, (reference, other)) in pairs.iter().enumerate() {
        let ref_slot = state
            .slot(reference)
            .ok_or(Error::StateVector(StateError::UnknownComponent(*reference)))?;
        let slot = state
            .slot(other)
            .ok_or(Error::StateVector(StateError::UnknownComponent(*other)))?;
        d[(row, slot)] = 1.0;
        d[(row, ref_slot)] = -1.0;
    }

    let x = state.x();
    let p = state.p();

    let a = &d * x;
    let dp = &d * p;
    let qa = &dp * d.transpose();

    let (f, s) = lambda(&a, &qa, 2)?;

    let ratio = s[1] / s[0].max(1.0E-12);

    if ratio < opts.ratio_threshold {
        return Err(Error::AmbiguityRejected { ratio });
    }

    let cholesky = qa.cholesky().ok_or(Error::AmbiguityInverse)?;

    // Qa⁻¹ D P
    let gain = cholesky.solve(&dp);
    let residual = a - f.column(0);

    let x_fixed = x - gain.transpose() * residual;
    let p_fixed = p - dp.transpose() * &gain;

    let slots = [
        ComponentId::PositionX,
        ComponentId::PositionY,
        ComponentId::PositionZ,
    ]
    .iter()
    .map(|id| state.slot(id).ok_or(Error::StateVector(StateError::UnknownComponent(*id))))
    .collect::<Result<Vec<_>, _>>()?;

    let position_m = Vector3::new(x_fixed[slots[0]], x_fixed[slots[1]], x_fixed[slots[2]]);
    let covariance_m2 = Matrix3::from_fn(|i, j| p_fixed[(slots[i], slots[j])]);

    let clock_m = match state.slot(&ComponentId::Clock) {
        Some(slot) => x_fixed[slot],
        None => 0.0,
    };

    let mut fixed = pairs
        .iter()
        .flat_map(|(reference, other)| [*reference, *other])
        .collect::<Vec<_>>();

    fixed.sort();
    fixed.dedup();

    Ok(Some(FixedSolution {
        position_m,
        covariance_m2,
        clock_m,
        ratio,
        fixed,
    }))
}

#[cfg(test)]
mod test {
    use super::{resolve, Candidate};
    use crate::{
        carrier::{Carrier, Signal},
        cfg::AmbiguityOpts,
        error::Error,
        navigation::state::{ComponentId, StateVector},
        prelude::{Constellation, SV},
    };

    fn ambiguity(prn: u8) -> ComponentId {
        ComponentId::Ambiguity(SV::new(Constellation::GPS, prn), Signal::new(Carrier::L1, 'C'))
    }

    fn float_state(offsets: &[f64]) -> StateVector {
        let mut state = StateVector::new();
        state.add_component(ComponentId::PositionX, 10.0, 1.0E-2).unwrap();
        state.add_component(ComponentId::PositionY, 20.0, 1.0E-2).unwrap();
        state.add_component(ComponentId::PositionZ, 30.0, 1.0E-2).unwrap();
        for (i, offset) in offsets.iter().enumerate() {
            let prn = i as u8 + 1;
            state
                .add_component(ambiguity(prn), 100.0 * prn as f64 + offset, 1.0E-3)
                .unwrap();
        }
        state
    }

    fn candidates(n: usize) -> Vec<Candidate> {
        (0..n)
            .map(|i| Candidate {
                id: ambiguity(i as u8 + 1),
                elevation_rad: (30.0 + 5.0 * i as f64).to_radians(),
            })
            .collect()
    }

    #[test]
    fn near_integer_fix() {
        let state = float_state(&[0.01, -0.02, 0.015, 0.0, -0.01]);
        let opts = AmbiguityOpts::default();

        let fixed = resolve(&state, &candidates(5), &opts).unwrap().unwrap();
        assert!(fixed.ratio > opts.ratio_threshold);
        assert_eq!(fixed.fixed.len(), 5);

        // uncorrelated position is not affected
        assert!((fixed.position_m[0] - 10.0).abs() < 1.0E-9);
        assert!((fixed.position_m[2] - 30.0).abs() < 1.0E-9);
    }

    #[test]
    fn ambiguous_candidates() {
        let state = float_state(&[0.5, 0.0, 0.5, 0.0, 0.5]);
        let opts = AmbiguityOpts::default();

        match resolve(&state, &candidates(5), &opts) {
            Err(Error::AmbiguityRejected { ratio }) => assert!(ratio < opts.ratio_threshold),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn not_enough_ambiguities() {
        let state = float_state(&[0.0, 0.0, 0.0]);
        let opts = AmbiguityOpts::default();
        assert_eq!(resolve(&state, &candidates(3), &opts), Ok(None));

        // below the elevation mask
        let mut low = candidates(5);
        for cd in low.iter_mut() {
            cd.elevation_rad = 5.0_f64.to_radians();
        }
        let state = float_state(&[0.0; 5]);
        assert_eq!(resolve(&state, &low, &opts), Ok(None));
    }

    #[test]
    fn conditional_position() {
        let mut state = StateVector::new();
        state.add_component(ComponentId::PositionX, 0.0, 1.0E-2).unwrap();
        state.add_component(ComponentId::PositionY, 0.0, 1.0E-2).unwrap();
        state.add_component(ComponentId::PositionZ, 0.0, 1.0E-2).unwrap();
        state.add_component(ambiguity(1), 10.0, 1.0E-2).unwrap();
        state
            .add_component_seeded(ambiguity(2), 3.1, 1.0E-2, &[(ComponentId::PositionX, 5.0E-3)])
            .unwrap();

        let mut opts = AmbiguityOpts::default();
        opts.min_ambiguities = 1;

        let cds = vec![
            Candidate {
                id: ambiguity(1),
                elevation_rad: 1.2,
            },
            Candidate {
                id: ambiguity(2),
                elevation_rad: 0.8,
            },
        ];

        let fixed = resolve(&state, &cds, &opts).unwrap().unwrap();
        assert!((fixed.ratio - 81.0).abs() < 1.0E-6, "ratio={}", fixed.ratio);
        assert!((fixed.position_m[0] + 0.025).abs() < 1.0E-9);
        assert!(fixed.covariance_m2[(0, 0)] < 1.0E-2);
        assert_eq!(fixed.position_m[1], 0.0);
    }
}
