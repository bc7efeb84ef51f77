//!
//! Lagrange not-a-knot splines. The function of node `(l, i)` is a spline of the not-a-knot
//! space of level `l` that vanishes at every node of a coarser level and carries the
//! coefficient 1 on the not-a-knot B-spline `i`. Away from the boundary it is the uniform
//! kernel `sum_k c_k B_p(t - k + (p + 1) / 2)`, `|k| <= (p - 1) / 2`.
//!
use crate::errors::SGError;

use super::{base::{check_derivative_order, validate_degree, Basis, BasisFunction, LocalCoordinate},
    bspline::cardinal_bspline_deriv, nak_bspline::{cox_de_boor, cox_de_boor_deriv, knot, lagrange_deriv, MAX_KNOTS}};

const LINEAR_KERNEL: [f64; 1] = [1.0];
const CUBIC_KERNEL: [f64; 3] = [-0.25, 1.0, -0.25];
const QUINTIC_KERNEL: [f64; 5] = [1.0 / 66.0, -13.0 / 33.0, 1.0, -13.0 / 33.0, 1.0 / 66.0];
const SEPTIC_KERNEL: [f64; 7] = [-1.0 / 2416.0, 15.0 / 302.0, -1191.0 / 2416.0, 1.0, -1191.0 / 2416.0, 15.0 / 302.0, -1.0 / 2416.0];

///
/// Linear combination of the not-a-knot B-splines `first, first + 1, ...`.
///
#[derive(Clone, Debug, PartialEq)]
struct EdgeSpline
{
    first: u64,
    coefficients: Vec<f64>,
}

#[inline]
fn knot_window(first: u64, h_inv: u64, p: usize) -> [f64; MAX_KNOTS]
{
    let mut knots = [0.0; MAX_KNOTS];
    for (j, k) in knots.iter_mut().take(p + 2).enumerate()
    {
        *k = knot(first + j as u64, h_inv, p as u64);
    }
    knots
}

///
/// Gaussian elimination with partial pivoting on the augmented matrix `rows`.
///
fn solve(mut rows: Vec<Vec<f64>>, degree: usize) -> Result<Vec<f64>, SGError>
{
    let n = rows.len();
    for col in 0..n
    {
        let pivot = (col..n).max_by(|&a, &b| rows[a][col].abs().total_cmp(&rows[b][col].abs()))
            .ok_or(SGError::SingularBasisSystem(degree))?;
        if rows[pivot][col].abs() < f64::EPSILON
        {
            return Err(SGError::SingularBasisSystem(degree));
        }
        rows.swap(col, pivot);
        let (upper, lower) = rows.split_at_mut(col + 1);
        let pivot_row = &upper[col];
        for row in lower.iter_mut()
        {
            let factor = row[col] / pivot_row[col];
            for (value, source) in row[col..].iter_mut().zip(&pivot_row[col..])
            {
                *value -= factor * *source;
            }
        }
    }
    let mut solution = vec![0.0; n];
    for row in (0..n).rev()
    {
        let tail: f64 = (row + 1..n).map(|k| rows[row][k] * solution[k]).sum();
        solution[row] = (rows[row][n] - tail) / rows[row][row];
    }
    Ok(solution)
}

///
/// Builds the edge function of `index` on a level with `h_inv` intervals. The B-splines
/// `(index - 1) / 2 ..= index + (p - 1) / 2` are used, extended to the right until there is
/// exactly one more B-spline than even nodes inside their joint support.
///
fn edge_spline(p: usize, h_inv: u64, index: u64) -> Result<EdgeSpline, SGError>
{
    let pu = p as u64;
    let first = index / 2;
    let even_nodes = |last: u64| -> Vec<u64>
    {
        let (lower, upper) = (knot(first, h_inv, pu), knot(last + pu + 1, h_inv, pu));
        (0..=h_inv).step_by(2).filter(|&k| lower < k as f64 && (k as f64) < upper).collect()
    };
    let mut last = u64::min(index + (pu - 1) / 2, h_inv);
    let mut nodes = even_nodes(last);
    while ((last - first) as usize) < nodes.len() && last < h_inv
    {
        last += 1;
        nodes = even_nodes(last);
    }
    let n = (last - first + 1) as usize;
    if n != nodes.len() + 1
    {
        return Err(SGError::SingularBasisSystem(p));
    }
    let mut rows = Vec::with_capacity(n);
    for &k in &nodes
    {
        let mut row: Vec<f64> = (first..=last).map(|j| cox_de_boor(k as f64, &knot_window(j, h_inv, p)[..p + 2], p)).collect();
        row.push(0.0);
        rows.push(row);
    }
    let mut normalization = vec![0.0; n + 1];
    normalization[(index - first) as usize] = 1.0;
    normalization[n] = 1.0;
    rows.push(normalization);
    Ok(EdgeSpline { first, coefficients: solve(rows, p)? })
}

#[derive(Clone, Debug)]
pub struct LagrangeNakSplineBasis
{
    degree: usize,
    /// `edges[l][i / 2]` holds the edge function of node `(l, i)`. Levels past the last row
    /// share its coefficients.
    edges: Vec<Vec<EdgeSpline>>,
}

impl LagrangeNakSplineBasis
{
    ///
    /// Even degrees are rounded down to the next odd degree, degrees 0 and above 7 are rejected.
    /// The edge functions of every level are solved for up front.
    ///
    pub fn new(degree: usize) -> Result<Self, SGError>
    {
        let degree = validate_degree(degree)?;
        let p = degree as u64;
        let reach = Self::reach(degree);
        let mut edges = vec![Vec::new()];
        let mut level = 1;
        loop
        {
            let h_inv = 1_u64 << level;
            let mut row = Vec::new();
            if h_inv >= p
            {
                for index in (1..=u64::min(reach, h_inv / 2)).step_by(2)
                {
                    row.push(edge_spline(degree, h_inv, index)?);
                }
            }
            edges.push(row);
            // deeper levels no longer see the right end of the domain
            if h_inv >= reach + (p - 1) / 2 + p + 1
            {
                break;
            }
            level += 1;
        }
        log::debug!("lagrange not-a-knot splines of degree {} solved up to level {}", degree, level);
        Ok(Self { degree, edges })
    }

    /// Largest index that still gets an edge function.
    #[inline]
    fn reach(degree: usize) -> u64
    {
        if degree == 7 { 9 } else { degree as u64 }
    }

    fn kernel(&self) -> &'static [f64]
    {
        match self.degree
        {
            1 => &LINEAR_KERNEL,
            3 => &CUBIC_KERNEL,
            5 => &QUINTIC_KERNEL,
            _ => &SEPTIC_KERNEL,
        }
    }

    #[inline]
    fn is_interior(&self, local: &LocalCoordinate) -> bool
    {
        let reach = Self::reach(self.degree);
        local.index > reach && local.index + reach < local.h_inv
    }

    fn edge(&self, level: u32, index: u64) -> Option<&EdgeSpline>
    {
        let row = usize::min(level as usize, self.edges.len() - 1);
        self.edges[row].get((index / 2) as usize)
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
        else if self.is_interior(&local)
        {
            let shift = (p - 1) as f64 / 2.0 + (p + 1) as f64 / 2.0;
            self.kernel().iter().enumerate()
                .map(|(k, c)| c * cardinal_bspline_deriv(local.t - k as f64 + shift, p, order))
                .sum::<f64>()
        }
        else
        {
            match self.edge(level, local.index)
            {
                Some(edge) => edge.coefficients.iter().zip(edge.first..)
                    .map(|(c, j)| c * cox_de_boor_deriv(local.position(), &knot_window(j, local.h_inv, p)[..p + 2], p, order))
                    .sum::<f64>(),
                None => 0.0,
            }
        };
        value * local.chain_factor(order)
    }
}

impl Basis for LagrangeNakSplineBasis
{
    #[inline]
    fn eval(&self, level: u32, index: u32, x: f64) -> f64
    {
        self.eval_local(level, index, x, 0)
    }

    fn eval_deriv(&self, level: u32, index: u32, x: f64, order: usize) -> Result<f64, SGError>
    {
        check_derivative_order(order, 3)?;
        Ok(self.eval_local(level, index, x, order))
    }

    fn degree(&self) -> usize
    {
        self.degree
    }

    fn basis_type(&self) -> BasisFunction
    {
        BasisFunction::LagrangeNakSpline
    }

    fn support(&self, level: u32, index: u32) -> (f64, f64)
    {
        let local = LocalCoordinate::mirrored(level, index, 0.0);
        let p = self.degree as u64;
        if level == 0 || local.h_inv < p
        {
            return (0.0, 1.0);
        }
        let h = 1.0 / local.h_inv as f64;
        if self.is_interior(&local)
        {
            let (lower, upper) = ((index as f64 - p as f64) * h, (index as f64 + p as f64) * h);
            return (f64::max(0.0, lower), f64::min(1.0, upper));
        }
        let (lower, upper) = match self.edge(level, local.index)
        {
            Some(edge) =>
            {
                let last = edge.first + edge.coefficients.len() as u64 - 1;
                (knot(edge.first, local.h_inv, p), knot(last + p + 1, local.h_inv, p))
            }
            None => return (0.0, 0.0),
        };
        let (lower, upper) = (f64::max(0.0, lower * h), f64::min(1.0, upper * h));
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
        let basis = LagrangeNakSplineBasis::new(3).unwrap();
        for (level, index, x, expected) in [
            (2, 1, 0.25, 9.0 / 26.0),
            (3, 1, 0.125, 9.0 / 28.0),
            (3, 7, 0.875, 9.0 / 28.0),
            (3, 3, 0.375, 19.0 / 32.0),
            (3, 3, 0.3125, 0.37890625),
            (3, 3, 0.625, -1.0 / 24.0),
            (4, 3, 0.1875, 19.0 / 32.0),
            (4, 7, 0.4375, 7.0 / 12.0),
            (4, 7, 0.5625, -1.0 / 24.0),
        ]
        {
            assert_relative_eq!(basis.eval(level, index, x), expected, epsilon = 1e-13);
        }
    }

    #[test]
    fn check_higher_degree_values()
    {
        let quintic = LagrangeNakSplineBasis::new(5).unwrap();
        for (level, index, x, expected) in [
            (2, 1, 0.125, 1.09375),
            (3, 1, 0.125, 0.07805729633643342),
            (3, 3, 0.3, 0.13401206295227128),
            (4, 5, 0.34375, 0.24649031935223634),
            (4, 7, 0.4375, 167.0 / 440.0),
        ]
        {
            assert_relative_eq!(quintic.eval(level, index, x), expected, epsilon = 1e-12);
        }
        let septic = LagrangeNakSplineBasis::new(7).unwrap();
        for (level, index, x, expected) in [
            (3, 3, 1.0 / 3.0, 0.022192783985826737),
            (4, 7, 0.4375, 0.26604749333371847),
            (4, 7, 0.46875, 0.1702052698266707),
            (5, 1, 0.05, 0.0045167422173346666),
            (5, 9, 0.28125, 0.2499836195094623),
            (5, 9, 0.1, -0.00011308528476008656),
            (6, 11, x(6, 11, 0.0), 757223.0 / 3044160.0),
        ]
        {
            assert_relative_eq!(septic.eval(level, index, x), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn check_vanishes_at_coarse_nodes()
    {
        for degree in [1, 3, 5, 7]
        {
            let basis = LagrangeNakSplineBasis::new(degree).unwrap();
            for level in 1..=6
            {
                let h_inv = 1_u32 << level;
                for index in (1..h_inv).step_by(2)
                {
                    for node in (0..=h_inv).step_by(2)
                    {
                        let value = basis.eval(level, index, node as f64 / h_inv as f64);
                        assert!(value.abs() < 1e-12, "degree {} level {} index {} node {} value {}", degree, level, index, node, value);
                    }
                    assert!(basis.eval(level, index, x(level, index, 0.0)) > 0.0);
                }
            }
        }
    }

    #[test]
    fn check_linear_is_hat()
    {
        let basis = LagrangeNakSplineBasis::new(1).unwrap();
        for (level, index, t) in [(1, 1, -0.5), (2, 1, 0.25), (3, 5, -0.75), (3, 7, 0.5)]
        {
            assert_relative_eq!(basis.eval(level, index, x(level, index, t)), 1.0 - f64::abs(t), epsilon = 1e-14);
        }
    }

    #[test]
    fn check_compact_support()
    {
        for degree in [3, 5, 7]
        {
            let basis = LagrangeNakSplineBasis::new(degree).unwrap();
            let level = 5;
            let h_inv = 1 << level;
            for index in [1, 3, 5, 9, 13, h_inv - 3, h_inv - 1]
            {
                let (lower, upper) = basis.support(level, index);
                assert!(lower < upper);
                for k in 0..=640
                {
                    let x = k as f64 / 640.0;
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
        let basis = LagrangeNakSplineBasis::new(5).unwrap();
        for k in 0..=20
        {
            let x = k as f64 / 20.0;
            assert_relative_eq!(basis.eval(4, 3, x), basis.eval(4, 13, 1.0 - x), epsilon = 1e-14);
            assert_relative_eq!(basis.eval_deriv(4, 3, x, 1).unwrap(), -basis.eval_deriv(4, 13, 1.0 - x, 1).unwrap(), epsilon = 1e-11);
        }
    }

    #[test]
    fn check_derivatives_by_finite_differences()
    {
        let eps = 1e-6;
        for degree in [3, 5, 7]
        {
            let basis = LagrangeNakSplineBasis::new(degree).unwrap();
            for (level, index, x) in [(1, 1, 0.3), (2, 1, 0.31), (3, 3, 0.29), (3, 7, 0.83), (5, 9, 0.27), (5, 15, 0.44)]
            {
                let fd1 = (basis.eval(level, index, x + eps) - basis.eval(level, index, x - eps)) / (2.0 * eps);
                assert_relative_eq!(basis.eval_deriv(level, index, x, 1).unwrap(), fd1, epsilon = 1e-5, max_relative = 1e-6);
                let fd2 = (basis.eval_deriv(level, index, x + eps, 1).unwrap() - basis.eval_deriv(level, index, x - eps, 1).unwrap()) / (2.0 * eps);
                assert_relative_eq!(basis.eval_deriv(level, index, x, 2).unwrap(), fd2, epsilon = 1e-3, max_relative = 1e-6);
            }
        }
    }

    #[test]
    fn check_third_derivatives()
    {
        let cubic = LagrangeNakSplineBasis::new(3).unwrap();
        for (level, index, x, expected) in [
            (2, 1, 0.2, 77.53846153846153),
            (3, 1, 0.3125, -384.0),
            (3, 3, 0.3125, -1824.0),
            (3, 5, 0.6875, 1824.0),
            // uniform kernel, half a mesh width right of the node
            (4, 7, 0.46875, 4.0 * 4096.0),
        ]
        {
            assert_relative_eq!(cubic.eval_deriv(level, index, x, 3).unwrap(), expected, epsilon = 1e-9);
        }
        let quintic = LagrangeNakSplineBasis::new(5).unwrap();
        assert_relative_eq!(quintic.eval_deriv(3, 3, 0.3, 3).unwrap(), -295.1009578807974, max_relative = 1e-11);
        assert_relative_eq!(quintic.eval_deriv(4, 5, 0.3, 3).unwrap(), -5173.8006085853285, max_relative = 1e-11);
        assert_relative_eq!(quintic.eval_deriv(4, 11, 0.7, 3).unwrap(), 5173.800608585308, max_relative = 1e-11);
        let septic = LagrangeNakSplineBasis::new(7).unwrap();
        assert_relative_eq!(septic.eval_deriv(2, 1, 0.3, 3).unwrap(), 268.8, max_relative = 1e-12);
        let eps = 1e-6;
        for (level, index, x) in [(3, 1, 0.21), (5, 9, 0.27), (5, 23, 0.71)]
        {
            let fd3 = (septic.eval_deriv(level, index, x + eps, 2).unwrap() - septic.eval_deriv(level, index, x - eps, 2).unwrap()) / (2.0 * eps);
            assert_relative_eq!(septic.eval_deriv(level, index, x, 3).unwrap(), fd3, max_relative = 1e-5);
        }
    }

    #[test]
    fn check_integrals()
    {
        let cubic = LagrangeNakSplineBasis::new(3).unwrap();
        assert_relative_eq!(cubic.integral(2, 1).unwrap(), 9.0 / 104.0, epsilon = 1e-14);
        assert_relative_eq!(cubic.integral(3, 1).unwrap(), 11.0 / 224.0, epsilon = 1e-14);
        assert_relative_eq!(cubic.integral(3, 3).unwrap(), 17.0 / 384.0, epsilon = 1e-14);
        assert_relative_eq!(cubic.integral(3, 5).unwrap(), 17.0 / 384.0, epsilon = 1e-14);
        // kernel coefficients sum to 1/2
        assert_relative_eq!(cubic.integral(4, 7).unwrap(), 1.0 / 32.0, epsilon = 1e-14);
        for degree in [5, 7]
        {
            let basis = LagrangeNakSplineBasis::new(degree).unwrap();
            for (level, index) in [(3, 1), (4, 5), (5, 9), (5, 17)]
            {
                let n = 4096;
                let simpson: f64 = (0..n).map(|k|
                {
                    let (a, b) = (k as f64 / n as f64, (k + 1) as f64 / n as f64);
                    (b - a) / 6.0 * (basis.eval(level, index, a) + 4.0 * basis.eval(level, index, 0.5 * (a + b)) + basis.eval(level, index, b))
                }).sum();
                assert_relative_eq!(basis.integral(level, index).unwrap(), simpson, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn check_edge_solve()
    {
        let edge = edge_spline(3, 8, 3).unwrap();
        assert_eq!(edge.first, 1);
        for (c, expected) in edge.coefficients.iter().zip([1.0 / 12.0, -7.0 / 12.0, 1.0, -0.25])
        {
            assert_relative_eq!(*c, expected, epsilon = 1e-14);
        }
        let singular = vec![vec![1.0, 2.0, 0.0], vec![2.0, 4.0, 1.0]];
        assert_eq!(solve(singular, 3), Err(SGError::SingularBasisSystem(3)));
    }

    #[test]
    fn check_degree_errors()
    {
        assert_eq!(LagrangeNakSplineBasis::new(0).unwrap_err(), SGError::UnsupportedDegree(0));
        assert_eq!(LagrangeNakSplineBasis::new(8).unwrap_err(), SGError::UnsupportedDegree(8));
        assert_eq!(LagrangeNakSplineBasis::new(4).unwrap().degree(), 3);
        let basis = LagrangeNakSplineBasis::new(5).unwrap();
        assert_eq!(basis.eval_deriv(3, 1, 0.3, 4), Err(SGError::UnsupportedDerivative { order: 4 }));
        assert_eq!(basis.basis_type(), BasisFunction::LagrangeNakSpline);
    }
}
