//!
//! Not-a-knot B-splines. The inner knots next to the domain boundary are removed so that
//! every basis function of a level lives on the same knot vector
//! `-p, ..., 0, 1 + m, ..., 2^l - m - 1, 2^l, ..., 2^l + p` (in mesh widths, `m = (p - 1) / 2`).
//!
use crate::errors::SGError;

use super::{base::{check_derivative_order, validate_degree, Basis, BasisFunction, LocalCoordinate}, bspline::cardinal_bspline_deriv};

pub(super) const MAX_KNOTS: usize = 9;

///
/// Knot `j` of the not-a-knot knot vector of degree `p` on a level with `h_inv` intervals.
///
#[inline]
pub(super) fn knot(j: u64, h_inv: u64, p: u64) -> f64
{
    let m = (p - 1) / 2;
    if j <= p
    {
        j as f64 - p as f64
    }
    else if j <= h_inv
    {
        (j + m - p) as f64
    }
    else
    {
        (j - 1) as f64
    }
}

///
/// Cox-de Boor recursion for the B-spline on `knots` (of length `p + 2`).
///
pub(super) fn cox_de_boor(u: f64, knots: &[f64], p: usize) -> f64
{
    if p == 0
    {
        return if knots[0] <= u && u < knots[1] { 1.0 } else { 0.0 };
    }
    let mut r = 0.0;
    if knots[p] > knots[0]
    {
        r += (u - knots[0]) / (knots[p] - knots[0]) * cox_de_boor(u, &knots[..p + 1], p - 1);
    }
    if knots[p + 1] > knots[1]
    {
        r += (knots[p + 1] - u) / (knots[p + 1] - knots[1]) * cox_de_boor(u, &knots[1..], p - 1);
    }
    r
}

pub(super) fn cox_de_boor_deriv(u: f64, knots: &[f64], p: usize, order: usize) -> f64
{
    if order == 0
    {
        return cox_de_boor(u, knots, p);
    }
    if order > p
    {
        return 0.0;
    }
    let pf = p as f64;
    let mut r = 0.0;
    if knots[p] > knots[0]
    {
        r += pf / (knots[p] - knots[0]) * cox_de_boor_deriv(u, &knots[..p + 1], p - 1, order - 1);
    }
    if knots[p + 1] > knots[1]
    {
        r -= pf / (knots[p + 1] - knots[1]) * cox_de_boor_deriv(u, &knots[1..], p - 1, order - 1);
    }
    r
}

///
/// Derivative of the Lagrange polynomial that is 1 at node `index` and 0 at the other
/// nodes `0, 1, ..., h_inv`.
///
pub(super) fn lagrange_deriv(u: f64, index: u64, h_inv: u64, order: usize) -> f64
{
    // coefficients in increasing powers
    let mut coeffs = vec![1.0];
    for k in (0..=h_inv).filter(|&k| k != index)
    {
        let scale = 1.0 / (index as f64 - k as f64);
        let mut next = vec![0.0; coeffs.len() + 1];
        for (power, &c) in coeffs.iter().enumerate()
        {
            next[power + 1] += c * scale;
            next[power] -= c * k as f64 * scale;
        }
        coeffs = next;
    }
    for _ in 0..order
    {
        coeffs = coeffs.iter().enumerate().skip(1).map(|(power, &c)| c * power as f64).collect();
    }
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * u + c)
}

#[derive(Copy, Clone, Debug)]
pub struct NakBsplineBasis
{
    degree: usize,
}

impl NakBsplineBasis
{
    ///
    /// Even degrees are rounded down to the next odd degree, degrees 0 and above 7 are rejected.
    ///
    pub fn new(degree: usize) -> Result<Self, SGError>
    {
        Ok(Self { degree: validate_degree(degree)? })
    }

    fn local_knots(&self, local: &LocalCoordinate) -> ([f64; MAX_KNOTS], usize)
    {
        let p = self.degree as u64;
        let mut knots = [0.0; MAX_KNOTS];
        let len = self.degree + 2;
        for (j, k) in knots.iter_mut().take(len).enumerate()
        {
            *k = knot(local.index + j as u64, local.h_inv, p);
        }
        (knots, len)
    }

    fn eval_local(&self, level: u32, index: u32, x: f64, order: usize) -> f64
    {
        let p = self.degree;
        if level == 0
        {
            return match order
            {
                0 => if index == 0 { 1.0 - x } else { x },
                1 => if index == 0 { -1.0 } else { 1.0 },
                _ => 0.0,
            };
        }
        let local = LocalCoordinate::mirrored(level, index, x);
        let value = if local.h_inv < p as u64
        {
            lagrange_deriv(local.position(), local.index, local.h_inv, order)
        }
        else if local.index > p as u64 && local.index + (p as u64) < local.h_inv
        {
            cardinal_bspline_deriv(local.t + (p + 1) as f64 / 2.0, p, order)
        }
        else
        {
            let (knots, len) = self.local_knots(&local);
            cox_de_boor_deriv(local.position(), &knots[..len], p, order)
        };
        value * local.chain_factor(order)
    }
}

impl Basis for NakBsplineBasis
{
    #[inline]
    fn eval(&self, level: u32, index: u32, x: f64) -> f64
    {
        self.eval_local(level, index, x, 0)
    }

    fn eval_deriv(&self, level: u32, index: u32, x: f64, order: usize) -> Result<f64, SGError>
    {
        check_derivative_order(order, 2)?;
        Ok(self.eval_local(level, index, x, order))
    }

    fn degree(&self) -> usize
    {
        self.degree
    }

    fn basis_type(&self) -> BasisFunction
    {
        BasisFunction::NakBspline
    }

    fn support(&self, level: u32, index: u32) -> (f64, f64)
    {
        let local = LocalCoordinate::mirrored(level, index, 0.0);
        if level == 0 || local.h_inv < self.degree as u64
        {
            return (0.0, 1.0);
        }
        let (knots, len) = self.local_knots(&local);
        let h = 1.0 / local.h_inv as f64;
        let (lower, upper) = (f64::max(0.0, knots[0] * h), f64::min(1.0, knots[len - 1] * h));
        if local.mirrored
        {
            (1.0 - upper, 1.0 - lower)
        }
        else
        {
            (lower, upper)
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use approx::assert_relative_eq;

    fn x(level: u32, index: u32, t: f64) -> f64
    {
        (t + index as f64) / (1_u64 << level) as f64
    }

    #[test]
    fn check_cubic_values()
    {
        let basis = NakBsplineBasis::new(3).unwrap();
        for (level, index, t, expected) in [
            (2, 0, 0.5, 0.140625),
            (2, 1, 0.0, 0.55),
            (3, 0, 0.0, 1.0 / 3.0),
            (3, 1, 0.0, 0.4583333333333333),
            (3, 2, 0.5, 0.36979166666666663),
            (1, 1, 0.5, 0.75),
            (3, 7, 0.25, 0.5423177083333334),
        ]
        {
            assert_relative_eq!(basis.eval(level, index, x(level, index, t)), expected, epsilon = 1e-13);
        }
    }

    #[test]
    fn check_higher_degree_values()
    {
        let quintic = NakBsplineBasis::new(5).unwrap();
        assert_relative_eq!(quintic.eval(3, 3, x(3, 3, 0.5)), 0.3675316220238095, epsilon = 1e-13);
        assert_relative_eq!(quintic.eval(2, 1, x(2, 1, 0.3)), 0.69615, epsilon = 1e-13);
        assert_relative_eq!(quintic.eval(3, 4, x(3, 4, -2.0)), 0.15092592592592594, epsilon = 1e-13);
        let septic = NakBsplineBasis::new(7).unwrap();
        assert_relative_eq!(septic.eval(2, 1, x(2, 1, 0.25)), 0.751953125, epsilon = 1e-13);
    }

    #[test]
    fn check_interior_matches_uniform_bspline()
    {
        let nak = NakBsplineBasis::new(3).unwrap();
        let uniform = super::super::bspline::BsplineBasis::new(3).unwrap();
        for k in 0..=50
        {
            let x = k as f64 / 50.0;
            assert_relative_eq!(nak.eval(5, 9, x), uniform.eval(5, 9, x), epsilon = 1e-14);
        }
    }

    #[test]
    fn check_compact_support()
    {
        for degree in [1, 3, 5, 7]
        {
            let basis = NakBsplineBasis::new(degree).unwrap();
            let level = 4;
            let h_inv = 1 << level;
            for index in [1, 3, h_inv - 3, h_inv - 1]
            {
                let (lower, upper) = basis.support(level, index);
                for k in 0..=320
                {
                    let x = k as f64 / 320.0;
                    if x < lower || x > upper
                    {
                        assert_eq!(basis.eval(level, index, x), 0.0, "degree {} index {} x {}", degree, index, x);
                    }
                }
            }
        }
    }

    #[test]
    fn check_mirror_symmetry()
    {
        let basis = NakBsplineBasis::new(5).unwrap();
        for k in 0..=20
        {
            let x = k as f64 / 20.0;
            assert_relative_eq!(basis.eval(3, 1, x), basis.eval(3, 7, 1.0 - x), epsilon = 1e-14);
            assert_relative_eq!(basis.eval_deriv(3, 1, x, 1).unwrap(), -basis.eval_deriv(3, 7, 1.0 - x, 1).unwrap(), epsilon = 1e-12);
        }
    }

    #[test]
    fn check_derivatives_by_finite_differences()
    {
        let eps = 1e-6;
        for degree in [3, 5, 7]
        {
            let basis = NakBsplineBasis::new(degree).unwrap();
            for (level, index, x) in [(1, 1, 0.3), (2, 1, 0.31), (3, 7, 0.83), (4, 5, 0.29)]
            {
                let fd1 = (basis.eval(level, index, x + eps) - basis.eval(level, index, x - eps)) / (2.0 * eps);
                assert_relative_eq!(basis.eval_deriv(level, index, x, 1).unwrap(), fd1, epsilon = 1e-5, max_relative = 1e-6);
                let fd2 = (basis.eval_deriv(level, index, x + eps, 1).unwrap() - basis.eval_deriv(level, index, x - eps, 1).unwrap()) / (2.0 * eps);
                assert_relative_eq!(basis.eval_deriv(level, index, x, 2).unwrap(), fd2, epsilon = 1e-3, max_relative = 1e-6);
            }
        }
    }

    #[test]
    fn check_degree_errors()
    {
        assert_eq!(NakBsplineBasis::new(0).unwrap_err(), SGError::UnsupportedDegree(0));
        assert_eq!(NakBsplineBasis::new(8).unwrap_err(), SGError::UnsupportedDegree(8));
        assert_eq!(NakBsplineBasis::new(6).unwrap().degree(), 5);
        let basis = NakBsplineBasis::new(3).unwrap();
        assert_eq!(basis.eval_deriv(2, 1, 0.3, 3), Err(SGError::UnsupportedDerivative { order: 3 }));
    }
}
