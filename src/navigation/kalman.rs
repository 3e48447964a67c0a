use log::error;
use nalgebra::{DMatrix, DVector};

use crate::error::Error;

/// Observation model linearized around the predicted state
#[derive(Debug, Clone)]
pub(crate) struct Observations {
    /// Design matrix (rows, states)
    pub h: DMatrix<f64>,
    /// Innovations (observed - computed)
    pub v: DVector<f64>,
    /// Observation variances
    pub r: DVector<f64>,
}

/// One sparse observation row: (slot, partial) pairs, innovation, variance
pub(crate) type SparseRow = (Vec<(usize, f64)>, f64, f64);

impl Observations {
    /// Builds the model of `nstates` states from these rows, at once
    pub fn from_rows<I: IntoIterator<Item = SparseRow>>(nstates: usize, rows: I) -> Self {
        let rows = rows.into_iter().collect::<Vec<_>>();
        let nrows = rows.len();

        let mut h = DMatrix::zeros(nrows, nstates);
        for (i, (partials, _, _)) in rows.iter().enumerate() {
            for (slot, value) in partials.iter() {
                h[(i, *slot)] = *value;
            }
        }

        Self {
            h,
            v: DVector::from_iterator(nrows, rows.iter().map(|(_, v, _)| *v)),
            r: DVector::from_iterator(nrows, rows.iter().map(|(_, _, r)| *r)),
        }
    }

    pub fn len(&self) -> usize {
        self.v.nrows()
    }
}

/// Makes `p` exactly symmetric
pub(crate) fn symmetrize(p: &mut DMatrix<f64>) {
    let n = p.nrows();
    for i in 0..n {
        for j in i + 1..n {
            let mean = 0.5 * (p[(i, j)] + p[(j, i)]);
            p[(i, j)] = mean;
            p[(j, i)] = mean;
        }
    }
}

/// Innovation covariance S = H P H' + R
pub(crate) fn innovation_covariance(p: &DMatrix<f64>, obs: &Observations) -> DMatrix<f64> {
    let mut s = &obs.h * p * obs.h.transpose();
    for i in 0..obs.len() {
        s[(i, i)] += obs.r[i];
    }
    s
}

/// Normalized innovations |v_i| / sqrt(S_ii)
pub(crate) fn normalized_innovations(p: &DMatrix<f64>, obs: &Observations) -> Vec<f64> {
    let s = innovation_covariance(p, obs);
    (0..obs.len())
        .map(|i| {
            let sigma = s[(i, i)].max(f64::EPSILON).sqrt();
            obs.v[i].abs() / sigma
        })
        .collect()
}

/// Kalman measurement update, Joseph form.
/// Returns the updated (x, P), or [Error::NumericInstability]
/// when the innovation covariance is not positive definite.
pub(crate) fn update(
    x: &DVector<f64>,
    p: &DMatrix<f64>,
    obs: &Observations,
) -> Result<(DVector<f64>, DMatrix<f64>), Error> {
    let n = x.nrows();
    let s = innovation_covariance(p, obs);

    let cholesky = match s.cholesky() {
        Some(cholesky) => cholesky,
        None => {
            error!("innovation covariance is not positive definite");
            return Err(Error::NumericInstability);
        },
    };

    // K' = S⁻¹ H P
    let hp = &obs.h * p;
    let k = cholesky.solve(&hp).transpose();

    let x_k = x + &k * &obs.v;

    let i_kh = DMatrix::<f64>::identity(n, n) - &k * &obs.h;
    let r = DMatrix::from_diagonal(&obs.r);
    let mut p_k = &i_kh * p * i_kh.transpose() + &k * r * k.transpose();

    symmetrize(&mut p_k);

    for i in 0..n {
        let tolerance = 1.0E-9 * (1.0 + p[(i, i)]);
        if !p_k[(i, i)].is_finite() || p_k[(i, i)] < -tolerance || !x_k[i].is_finite() {
            error!("updated covariance is not positive");
            return Err(Error::NumericInstability);
        }
        // rounding
        if p_k[(i, i)] < 0.0 {
            p_k[(i, i)] = 0.0;
        }
    }

    Ok((x_k, p_k))
}
