//! Scalar numerics needed by the transport solver: Bessel functions of the first kind of
//! order 0 and 1 (power series, good to ~1e-13 for |x| < 6) and a bracketed root finder.
use crate::Chemistry::chem_errors::ChemistryError;
use log::debug;

const SERIES_TERMS: usize = 60;

/// J_n(x) for n = 0, 1 by the ascending series sum_k (-1)^k (x/2)^(2k+n) / (k! (k+n)!)
fn bessel_series(order: u32, x: f64) -> f64 {
    let half = 0.5 * x;
    let q = -half * half;
    let mut term = if order == 0 { 1.0 } else { half };
    let mut sum = term;
    for k in 1..SERIES_TERMS {
        let k = k as f64;
        term *= q / (k * (k + order as f64));
        sum += term;
        if term.abs() < 1e-17 * sum.abs().max(1e-300) {
            break;
        }
    }
    sum
}

pub fn bessel_j0(x: f64) -> f64 {
    bessel_series(0, x)
}

pub fn bessel_j1(x: f64) -> f64 {
    bessel_series(1, x)
}

/// result of a bracketed root search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root {
    pub x: f64,
    pub iterations: usize,
}

/// Bisection on `[a, b]`. Fails when `f(a)` and `f(b)` have the same sign or when the
/// half-width tolerance is not met within `max_iter` steps.
pub fn find_root<F>(
    f: F,
    a: f64,
    b: f64,
    tol: f64,
    max_iter: usize,
    context: &str,
) -> Result<Root, ChemistryError>
where
    F: Fn(f64) -> f64,
{
    let (mut lo, mut hi) = (a, b);
    let (mut f_lo, f_hi) = (f(lo), f(hi));
    if f_lo == 0.0 {
        return Ok(Root { x: lo, iterations: 0 });
    }
    if f_hi == 0.0 {
        return Ok(Root { x: hi, iterations: 0 });
    }
    if f_lo.signum() == f_hi.signum() || !f_lo.is_finite() || !f_hi.is_finite() {
        return Err(ChemistryError::Numerics {
            context: context.to_owned(),
            reason: format!(
                "root not bracketed in [{}, {}]: f = {} and {}",
                a, b, f_lo, f_hi
            ),
        });
    }
    for iteration in 1..=max_iter {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);
        if f_mid == 0.0 || 0.5 * (hi - lo) < tol {
            debug!("{}: root {} after {} iterations", context, mid, iteration);
            return Ok(Root {
                x: mid,
                iterations: iteration,
            });
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    Err(ChemistryError::Numerics {
        context: context.to_owned(),
        reason: format!("no convergence after {} iterations", max_iter),
    })
}

/// first positive zero of J0
pub fn first_bessel_zero() -> Result<f64, ChemistryError> {
    Ok(find_root(bessel_j0, 2.0, 3.0, 1e-15, 200, "first zero of J0")?.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bessel_values() {
        assert_relative_eq!(bessel_j0(0.0), 1.0);
        assert_relative_eq!(bessel_j1(0.0), 0.0);
        assert_relative_eq!(bessel_j0(1.0), 0.7651976865579666, epsilon = 1e-14);
        assert_relative_eq!(bessel_j1(1.0), 0.4400505857449335, epsilon = 1e-14);
        assert_relative_eq!(bessel_j0(5.0), -0.1775967713143383, epsilon = 1e-13);
        assert_relative_eq!(bessel_j1(2.0), 0.5767248077568734, epsilon = 1e-14);
    }

    #[test]
    fn test_first_bessel_zero() {
        assert_relative_eq!(first_bessel_zero().unwrap(), 2.404825557695773, epsilon = 1e-12);
    }

    #[test]
    fn test_find_root() {
        let root = find_root(|x| x * x - 2.0, 0.0, 2.0, 1e-14, 200, "sqrt2").unwrap();
        assert_relative_eq!(root.x, 2f64.sqrt(), epsilon = 1e-13);
        assert!(root.iterations > 0);
        let err = find_root(|x| x * x + 1.0, -1.0, 1.0, 1e-14, 200, "no root").unwrap_err();
        assert!(matches!(err, ChemistryError::Numerics { .. }));
        let err = find_root(|x| x - 0.3, 0.0, 1.0, 1e-30, 5, "slow").unwrap_err();
        assert!(err.to_string().contains("no convergence"));
    }
}
