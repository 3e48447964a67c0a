//! Integer least squares ambiguity search: LAMBDA decorrelation
//! followed by the modified (MLAMBDA) search.
use log::error;
use nalgebra::{DMatrix, DVector};

use crate::error::Error;

const MAX_SEARCH: usize = 10_000;

fn round(x: f64) -> f64 {
    (x + 0.5).floor()
}

fn sign(x: f64) -> f64 {
    if x <= 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Q = L' diag(D) L factorization
fn ld_factorization(q: &DMatrix<f64>) -> Result<(DMatrix<f64>, DVector<f64>), Error> {
    let n = q.nrows();
    let mut a = q.clone();
    let mut l = DMatrix::<f64>::zeros(n, n);
    let mut d = DVector::<f64>::zeros(n);

    for i in (0..n).rev() {
        d[i] = a[(i, i)];
        if d[i] <= 0.0 {
            error!("ambiguity covariance factorization error");
            return Err(Error::AmbiguityFactorization);
        }
        let sqrt_d = d[i].sqrt();
        for j in 0..=i {
            l[(i, j)] = a[(i, j)] / sqrt_d;
        }
        for j in 0..i {
            for k in 0..=j {
                a[(j, k)] -= l[(i, k)] * l[(i, j)];
            }
        }
        let l_ii = l[(i, i)];
        for j in 0..=i {
            l[(i, j)] /= l_ii;
        }
    }

    Ok((l, d))
}

/// Integer Gauss transformation
fn gauss_transform(l: &mut DMatrix<f64>, z: &mut DMatrix<f64>, i: usize, j: usize) {
    let n = l.nrows();
    let mu = round(l[(i, j)]);
    if mu != 0.0 {
        for k in i..n {
            l[(k, j)] -= mu * l[(k, i)];
        }
        for k in 0..n {
            z[(k, j)] -= mu * z[(k, i)];
        }
    }
}

fn permute(
    l: &mut DMatrix<f64>,
    d: &mut DVector<f64>,
    z: &mut DMatrix<f64>,
    j: usize,
    delta: f64,
) {
    let n = l.nrows();
    let eta = d[j] / delta;
    let lambda = d[j + 1] * l[(j + 1, j)] / delta;

    d[j] = eta * d[j + 1];
    d[j + 1] = delta;

    for k in 0..j {
        let a0 = l[(j, k)];
        let a1 = l[(j + 1, k)];
        l[(j, k)] = -l[(j + 1, j)] * a0 + a1;
        l[(j + 1, k)] = eta * a0 + lambda * a1;
    }

    l[(j + 1, j)] = lambda;

    for k in j + 2..n {
        l.swap((k, j), (k, j + 1));
    }

    z.swap_columns(j, j + 1);
}

/// Decorrelation: z = Z' a and Qz = Z' Q Z = L' diag(D) L
fn reduction(l: &mut DMatrix<f64>, d: &mut DVector<f64>, z: &mut DMatrix<f64>) {
    let n = l.nrows();
    if n < 2 {
        return;
    }

    let mut j = n as isize - 2;
    let mut k = n as isize - 2;

    while j >= 0 {
        let ju = j as usize;
        if j <= k {
            for i in ju + 1..n {
                gauss_transform(l, z, i, ju);
            }
        }
        let delta = d[ju] + l[(ju + 1, ju)].powi(2) * d[ju + 1];
        if delta + 1.0E-6 < d[ju + 1] {
            permute(l, d, z, ju, delta);
            k = j;
            j = n as isize - 2;
        } else {
            j -= 1;
        }
    }
}

/// Returns the `m` best integer candidates (columns) and their
/// squared residuals, sorted in ascending order.
fn search(
    l: &DMatrix<f64>,
    d: &DVector<f64>,
    zs: &DVector<f64>,
    m: usize,
) -> Result<(DMatrix<f64>, DVector<f64>), Error> {
    let n = l.nrows();

    let mut s_mat = DMatrix::<f64>::zeros(n, n);
    let mut dist = DVector::<f64>::zeros(n);
    let mut zb = DVector::<f64>::zeros(n);
    let mut z = DVector::<f64>::zeros(n);
    let mut step = DVector::<f64>::zeros(n);

    let mut zn = DMatrix::<f64>::zeros(n, m);
    let mut s = DVector::<f64>::zeros(m);

    let mut nn = 0;
    let mut imax = 0;
    let mut maxdist = 1.0E99;

    let mut k = n - 1;
    dist[k] = 0.0;
    zb[k] = zs[k];
    z[k] = round(zb[k]);
    let mut y = zb[k] - z[k];
    step[k] = sign(y);

    let mut count = 0;

    while count < MAX_SEARCH {
        count += 1;
        let newdist = dist[k] + y * y / d[k];

        if newdist < maxdist {
            if k != 0 {
                k -= 1;
                dist[k] = newdist;
                for i in 0..=k {
                    s_mat[(k, i)] = s_mat[(k + 1, i)] + (z[k + 1] - zb[k + 1]) * l[(k + 1, i)];
                }
                zb[k] = zs[k] + s_mat[(k, k)];
                z[k] = round(zb[k]);
                y = zb[k] - z[k];
                step[k] = sign(y);
            } else {
                if nn < m {
                    if nn == 0 || newdist > s[imax] {
                        imax = nn;
                    }
                    zn.set_column(nn, &z);
                    s[nn] = newdist;
                    nn += 1;
                } else {
                    if newdist < s[imax] {
                        zn.set_column(imax, &z);
                        s[imax] = newdist;
                        imax = 0;
                        for i in 0..m {
                            if s[imax] < s[i] {
                                imax = i;
                            }
                        }
                    }
                    maxdist = s[imax];
                }
                z[0] += step[0];
                y = zb[0] - z[0];
                step[0] = -step[0] - sign(step[0]);
            }
        } else if k == n - 1 {
            break;
        } else {
            k += 1;
            z[k] += step[k];
            y = zb[k] - z[k];
            step[k] = -step[k] - sign(step[k]);
        }
    }

    if count >= MAX_SEARCH {
        error!("ambiguity search: loop count overflow");
        return Err(Error::AmbiguitySearch);
    }

    if nn < m {
        error!("ambiguity search: only {} candidate(s) found", nn);
        return Err(Error::AmbiguitySearch);
    }

    // sort by residuals
    for i in 0..m.saturating_sub(1) {
        for j in i + 1..m {
            if s[i] < s[j] {
                continue;
            }
            s.swap_rows(i, j);
            zn.swap_columns(i, j);
        }
    }

    Ok((zn, s))
}

/// Resolves integer ambiguities from the float estimate `a` and its
/// covariance `q`. Returns the `m` best candidates (one per column)
/// and their squared residuals, best first.
pub(crate) fn lambda(
    a: &DVector<f64>,
    q: &DMatrix<f64>,
    m: usize,
) -> Result<(DMatrix<f64>, DVector<f64>), Error> {
    let n = a.nrows();
    if n == 0 || m == 0 || q.nrows() != n || q.ncols() != n {
        return Err(Error::AmbiguityFactorization);
    }

    let (mut l, mut d) = ld_factorization(q)?;
    let mut z = DMatrix::<f64>::identity(n, n);

    reduction(&mut l, &mut d, &mut z);

    let zs = z.transpose() * a;
    let (e, s) = search(&l, &d, &zs, m)?;

    // F = Z'⁻¹ E
    let f = z
        .transpose()
        .lu()
        .solve(&e)
        .ok_or(Error::AmbiguityInverse)?;

    Ok((f, s))
}

#[cfg(test)]
mod test {
    use super::{lambda, ld_factorization};
    use nalgebra::{DMatrix, DVector};

    #[test]
    fn factorization() {
        let q = DMatrix::from_row_slice(3, 3, &[4.0, 2.0, 1.0, 2.0, 5.0, 3.0, 1.0, 3.0, 6.0]);
        let (l, d) = ld_factorization(&q).unwrap();

        let rebuilt = l.transpose() * DMatrix::from_diagonal(&d) * &l;
        for i in 0..3 {
            assert!((l[(i, i)] - 1.0).abs() < 1.0E-12);
            for j in 0..3 {
                assert!((rebuilt[(i, j)] - q[(i, j)]).abs() < 1.0E-9);
            }
        }
    }

    #[test]
    fn non_positive_covariance() {
        let q = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        let a = DVector::from_vec(vec![0.2, 0.3]);
        assert!(lambda(&a, &q, 2).is_err());
    }

    #[test]
    fn mlambda_search_1() {
        let a = DVector::from_vec(vec![
            1585184.171,
            -6716599.430,
            3915742.905,
            7627233.455,
            9565990.879,
            989457273.200,
        ]);

        #[rustfmt::skip]
        let q = DMatrix::from_row_slice(6, 6, &[
            0.227134, 0.112202, 0.112202, 0.112202, 0.112202, 0.103473,
            0.112202, 0.227134, 0.112202, 0.112202, 0.112202, 0.103473,
            0.112202, 0.112202, 0.227134, 0.112202, 0.112202, 0.103473,
            0.112202, 0.112202, 0.112202, 0.227134, 0.112202, 0.103473,
            0.112202, 0.112202, 0.112202, 0.112202, 0.227134, 0.103473,
            0.103473, 0.103473, 0.103473, 0.103473, 0.103473, 0.434339,
        ]);

        #[rustfmt::skip]
        let expected = DMatrix::from_row_slice(6, 2, &[
            1585184.0, 1585184.0,
            -6716599.0, -6716600.0,
            3915743.0, 3915743.0,
            7627234.0, 7627233.0,
            9565991.0, 9565991.0,
            989457273.0, 989457273.0,
        ]);

        let (f, s) = lambda(&a, &q, 2).unwrap();

        for i in 0..6 {
            for j in 0..2 {
                assert!(
                    (f[(i, j)] - expected[(i, j)]).abs() < 1.0E-4,
                    "F({},{})={}",
                    i,
                    j,
                    f[(i, j)]
                );
            }
        }

        assert!((s[0] - 3.507984).abs() < 1.0E-4, "s0={}", s[0]);
        assert!((s[1] - 3.708456).abs() < 1.0E-4, "s1={}", s[1]);
    }

    #[test]
    fn mlambda_search_2() {
        let a = DVector::from_vec(vec![
            -13324172.755747,
            -10668894.713608,
            -7157225.010770,
            -6149367.974367,
            -7454133.571066,
            -5969200.494550,
            8336734.058423,
            6186974.084502,
            -17549093.883655,
            -13970158.922370,
        ]);

        #[rustfmt::skip]
        let q = DMatrix::from_row_slice(10, 10, &[
            0.446320, 0.223160, 0.223160, 0.223160, 0.223160, 0.572775, 0.286388, 0.286388, 0.286388, 0.286388,
            0.223160, 0.446320, 0.223160, 0.223160, 0.223160, 0.286388, 0.572775, 0.286388, 0.286388, 0.286388,
            0.223160, 0.223160, 0.446320, 0.223160, 0.223160, 0.286388, 0.286388, 0.572775, 0.286388, 0.286388,
            0.223160, 0.223160, 0.223160, 0.446320, 0.223160, 0.286388, 0.286388, 0.286388, 0.572775, 0.286388,
            0.223160, 0.223160, 0.223160, 0.223160, 0.446320, 0.286388, 0.286388, 0.286388, 0.286388, 0.572775,
            0.572775, 0.286388, 0.286388, 0.286388, 0.286388, 0.735063, 0.367531, 0.367531, 0.367531, 0.367531,
            0.286388, 0.572775, 0.286388, 0.286388, 0.286388, 0.367531, 0.735063, 0.367531, 0.367531, 0.367531,
            0.286388, 0.286388, 0.572775, 0.286388, 0.286388, 0.367531, 0.367531, 0.735063, 0.367531, 0.367531,
            0.286388, 0.286388, 0.286388, 0.572775, 0.286388, 0.367531, 0.367531, 0.367531, 0.735063, 0.367531,
            0.286388, 0.286388, 0.286388, 0.286388, 0.572775, 0.367531, 0.367531, 0.367531, 0.367531, 0.735063,
        ]);

        #[rustfmt::skip]
        let expected = DMatrix::from_row_slice(10, 2, &[
            -13324188.0, -13324188.0,
            -10668901.0, -10668908.0,
            -7157236.0, -7157236.0,
            -6149379.0, -6149379.0,
            -7454143.0, -7454143.0,
            -5969220.0, -5969220.0,
            8336726.0, 8336717.0,
            6186960.0, 6186960.0,
            -17549108.0, -17549108.0,
            -13970171.0, -13970171.0,
        ]);

        let (f, s) = lambda(&a, &q, 2).unwrap();

        for i in 0..10 {
            for j in 0..2 {
                assert!(
                    (f[(i, j)] - expected[(i, j)]).abs() < 1.0E-4,
                    "F({},{})={}",
                    i,
                    j,
                    f[(i, j)]
                );
            }
        }

        assert!((s[0] - 1506.435789).abs() < 1.0E-4, "s0={}", s[0]);
        assert!((s[1] - 1612.811795).abs() < 1.0E-4, "s1={}", s[1]);
    }

    #[test]
    fn near_integer_float() {
        let a = DVector::from_vec(vec![3.02, -7.01, 12.98]);
        let q = DMatrix::from_row_slice(3, 3, &[0.01, 0.002, 0.0, 0.002, 0.01, 0.001, 0.0, 0.001, 0.01]);

        let (f, s) = lambda(&a, &q, 2).unwrap();
        assert_eq!(f.column(0).iter().copied().collect::<Vec<_>>(), vec![3.0, -7.0, 13.0]);
        assert!(s[1] / s[0] > 3.0);
    }
}
