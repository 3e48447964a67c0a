//! Code only least squares fix, used to initialize the filter
use std::collections::BTreeMap;

use log::{debug, error};
use nalgebra::{DMatrix, DVector, Vector3};

use crate::{
    cfg::Modeling,
    error::Error,
    geodesy::azimuth_elevation,
    navigation::model::{geometric_range, slant_troposphere, zenith_delays},
    prelude::{Constellation, SV},
};

/// One code equation
#[derive(Debug, Clone, Copy)]
pub(crate) struct CodeEquation {
    pub sv: SV,
    /// Corrected satellite position, ECEF (m)
    pub sv_position_m: Vector3<f64>,
    /// Corrected satellite clock (m)
    pub sv_clock_m: f64,
    /// Pseudo range (m), biases applied
    pub pseudo_range_m: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LsqSolution {
    pub position_m: Vector3<f64>,
    /// Receiver clock (m), against the reference constellation
    pub clock_m: f64,
    /// Inter-system biases (m)
    pub isb_m: BTreeMap<Constellation, f64>,
    pub iterations: usize,
}

/// Iterative least squares, starting from `initial` (or the Earth center).
/// `reference` is the constellation the receiver clock refers to;
/// other constellations get their own clock column when `isb` is set.
pub(crate) fn solve(
    equations: &[CodeEquation],
    reference: Constellation,
    initial: Option<Vector3<f64>>,
    modeling: &Modeling,
    max_iterations: usize,
) -> Result<LsqSolution, Error> {
    let mut others = equations
        .iter()
        .map(|eq| eq.sv.constellation)
        .filter(|c| *c != reference)
        .collect::<Vec<_>>();

    others.sort();
    others.dedup();

    if !modeling.inter_system_bias && !others.is_empty() {
        others.clear();
    }

    let ncols = 4 + others.len();
    if equations.len() < ncols {
        return Err(Error::InsufficientGeometry {
            needed: ncols,
            available: equations.len(),
        });
    }

    let mut x = DVector::<f64>::zeros(ncols);
    if let Some(initial) = initial {
        x[0] = initial[0];
        x[1] = initial[1];
        x[2] = initial[2];
    }

    for iteration in 0..max_iterations.max(1) {
        let rx = Vector3::new(x[0], x[1], x[2]);

        // the troposphere is only meaningful close to the surface
        let zenith = if modeling.tropo_delay && rx.norm() > 6.0E6 {
            Some(zenith_delays(&rx))
        } else {
            None
        };

        let mut h = DMatrix::<f64>::zeros(equations.len(), ncols);
        let mut b = DVector::<f64>::zeros(equations.len());

        for (i, eq) in equations.iter().enumerate() {
            let (range, rotated) = geometric_range(&rx, &eq.sv_position_m, modeling.earth_rotation);
            let unit = (rotated - rx) / range;

            let tropo = match zenith {
                Some((zhd, zwd)) => {
                    let (_, elevation) = azimuth_elevation(&rx, &rotated);
                    slant_troposphere(elevation.max(0.0), zhd, zwd)
                },
                None => 0.0,
            };

            let mut modeled = range + x[3] - eq.sv_clock_m + tropo;

            h[(i, 0)] = -unit[0];
            h[(i, 1)] = -unit[1];
            h[(i, 2)] = -unit[2];
            h[(i, 3)] = 1.0;

            if let Some(col) = others.iter().position(|c| *c == eq.sv.constellation) {
                h[(i, 4 + col)] = 1.0;
                modeled += x[4 + col];
            }

            b[i] = eq.pseudo_range_m - modeled;
        }

        let ht = h.transpose();
        let ht_h_inv = match (&ht * &h).try_inverse() {
            Some(inv) => inv,
            None => {
                error!("least squares: singular geometry");
                return Err(Error::MatrixInversion);
            },
        };

        let dx = ht_h_inv * ht * b;
        x += &dx;

        let correction = (dx[0].powi(2) + dx[1].powi(2) + dx[2].powi(2)).sqrt();
        debug!("least squares iteration #{} |dx|={:.4E}m", iteration + 1, correction);

        if correction < 1.0E-4 {
            return Ok(LsqSolution {
                position_m: Vector3::new(x[0], x[1], x[2]),
                clock_m: x[3],
                isb_m: others
                    .iter()
                    .enumerate()
                    .map(|(col, c)| (*c, x[4 + col]))
                    .collect(),
                iterations: iteration + 1,
            });
        }
    }

    error!("least squares did not converge");
    Err(Error::NumericInstability)
}

#[cfg(test)]
mod test {
    use super::{solve, CodeEquation};
    use crate::{
        cfg::Modeling,
        geodesy::azimuth_elevation,
        navigation::model::{geometric_range, slant_troposphere, zenith_delays},
        prelude::{Constellation, Vector3, SV},
    };

    fn equations(rx: &Vector3<f64>, clock_m: f64, isb_m: f64, modeling: &Modeling) -> Vec<CodeEquation> {
        let svs = [
            (Constellation::GPS, Vector3::new(2.2E7, 1.2E7, 8.0E6)),
            (Constellation::GPS, Vector3::new(1.8E7, -1.5E7, 1.2E7)),
            (Constellation::GPS, Vector3::new(2.0E7, 3.0E6, 1.8E7)),
            (Constellation::GPS, Vector3::new(1.5E7, 5.0E6, -2.0E7)),
            (Constellation::GPS, Vector3::new(2.3E7, -5.0E6, 1.0E7)),
            (Constellation::GPS, Vector3::new(1.7E7, 1.0E7, -1.5E7)),
            (Constellation::Galileo, Vector3::new(2.5E7, -6.0E6, -9.0E6)),
            (Constellation::Galileo, Vector3::new(1.9E7, 1.9E7, -4.0E6)),
        ];

        let (zhd, zwd) = zenith_delays(rx);

        svs.iter()
            .enumerate()
            .map(|(i, (constellation, position))| {
                let (range, rotated) = geometric_range(rx, position, modeling.earth_rotation);
                let (_, el) = azimuth_elevation(rx, &rotated);
                let sv_clock_m = 100.0 * i as f64;
                let mut pr = range + clock_m - sv_clock_m + slant_troposphere(el.max(0.0), zhd, zwd);
                if *constellation == Constellation::Galileo {
                    pr += isb_m;
                }
                CodeEquation {
                    sv: SV::new(*constellation, i as u8 + 1),
                    sv_position_m: *position,
                    sv_clock_m,
                    pseudo_range_m: pr,
                }
            })
            .collect()
    }

    #[test]
    fn multi_constellation_fix() {
        let modeling = Modeling::default();
        let rx = Vector3::new(6378137.0, 0.0, 0.0);
        let eqs = equations(&rx, 1234.5, -12.0, &modeling);

        let solution = solve(&eqs, Constellation::GPS, None, &modeling, 20).unwrap();

        assert!((solution.position_m - rx).norm() < 1.0E-3, "error={}", (solution.position_m - rx).norm());
        assert!((solution.clock_m - 1234.5).abs() < 1.0E-3);
        assert!((solution.isb_m[&Constellation::Galileo] + 12.0).abs() < 1.0E-3);
    }

    #[test]
    fn not_enough_equations() {
        let modeling = Modeling::default();
        let rx = Vector3::new(6378137.0, 0.0, 0.0);
        let eqs = equations(&rx, 0.0, 0.0, &modeling);
        assert!(solve(&eqs[..4], Constellation::GPS, None, &modeling, 20).is_ok());
        assert!(solve(&eqs[..3], Constellation::GPS, None, &modeling, 20).is_err());
    }
}
