use crate::errors::SGError;

use super::{
    base::{check_derivative_order, validate_degree, Basis, BasisFunction, LocalCoordinate},
    bspline::cardinal_bspline_deriv,
};

///
/// Derivative of the left boundary spline `sum_j (2 - j) b(u - j + (p + 1) / 2)`, taken over
/// every cardinal spline that is nonzero on `u >= 0`. It extrapolates the hierarchical splines
/// linearly beyond the boundary and is supported on `[0, (p + 3) / 2]`.
///
fn boundary_spline_deriv(u: f64, p: usize, order: usize) -> f64
{
    let half = (p + 1) / 2;
    (0..=half).map(|k| (k + 1) as f64 * cardinal_bspline_deriv(u - 1.0 + k as f64 + half as f64, p, order)).sum::<f64>()
}

///
/// Uniform B-splines of odd degree for grids without boundary nodes. The outermost function
/// of every level is replaced by the boundary spline, the single function of level 1 is constant.
///
#[derive(Copy, Clone, Debug)]
pub struct BsplineModifiedBasis
{
    degree: usize,
}

impl BsplineModifiedBasis
{
    pub fn new(degree: usize) -> Result<Self, SGError>
    {
        Ok(Self { degree: validate_degree(degree)? })
    }

    #[inline]
    fn half(&self) -> usize
    {
        (self.degree + 1) / 2
    }

    fn eval_local(&self, level: u32, local: &LocalCoordinate, order: usize) -> f64
    {
        if level <= 1
        {
            return if order == 0 { 1.0 } else { 0.0 };
        }
        let value = if local.index == 1
        {
            boundary_spline_deriv(local.position(), self.degree, order)
        }
        else
        {
            cardinal_bspline_deriv(local.t + self.half() as f64, self.degree, order)
        };
        value * local.chain_factor(order)
    }
}

impl Basis for BsplineModifiedBasis
{
    #[inline]
    fn eval(&self, level: u32, index: u32, x: f64) -> f64
    {
        self.eval_local(level, &LocalCoordinate::mirrored(level, index, x), 0)
    }

    fn eval_deriv(&self, level: u32, index: u32, x: f64, order: usize) -> Result<f64, SGError>
    {
        check_derivative_order(order, 2)?;
        Ok(self.eval_local(level, &LocalCoordinate::mirrored(level, index, x), order))
    }

    fn degree(&self) -> usize
    {
        self.degree
    }

    fn basis_type(&self) -> BasisFunction
    {
        BasisFunction::BsplineModified
    }

    fn support(&self, level: u32, index: u32) -> (f64, f64)
    {
        if level <= 1
        {
            return (0.0, 1.0);
        }
        let h_inv = 1_u64 << level;
        let h = 1.0 / h_inv as f64;
        let outer = (self.half() + 1) as f64 * h;
        if index == 1
        {
            (0.0, f64::min(1.0, outer))
        }
        else if index as u64 == h_inv - 1
        {
            (f64::max(0.0, 1.0 - outer), 1.0)
        }
        else
        {
            let half = self.half() as f64;
            (f64::max(0.0, (index as f64 - half) * h), f64::min(1.0, (index as f64 + half) * h))
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn check_boundary_spline_values()
    {
        // cubic boundary spline: 2 - u on [0, 1], then 2 - u + (u - 1)^3 / 6
        for u in [0.0, 0.25, 0.5, 0.99]
        {
            assert_relative_eq!(boundary_spline_deriv(u, 3, 0), 2.0 - u, epsilon = 1e-14);
        }
        for u in [1.0, 1.5, 1.75]
        {
            let expected = u * u * u / 6.0 - u * u / 2.0 - u / 2.0 + 11.0 / 6.0;
            assert_relative_eq!(boundary_spline_deriv(u, 3, 0), expected, epsilon = 1e-14);
        }
        assert_relative_eq!(boundary_spline_deriv(2.5, 3, 0), 1.0 / 48.0, epsilon = 1e-14);
        assert_relative_eq!(boundary_spline_deriv(0.5, 5, 0), 1.5002604166666664, epsilon = 1e-13);
        assert_relative_eq!(boundary_spline_deriv(2.5, 5, 0), 0.06223958333333333, epsilon = 1e-13);
        assert_relative_eq!(boundary_spline_deriv(1.5, 7, 0), 0.6007843501984127, epsilon = 1e-13);
        assert_relative_eq!(boundary_spline_deriv(3.5, 7, 0), 0.0033807663690476187, epsilon = 1e-13);
        assert_eq!(boundary_spline_deriv(3.0, 3, 0), 0.0);
        assert_eq!(boundary_spline_deriv(2.0, 1, 0), 0.0);
    }

    #[test]
    fn check_values()
    {
        let basis = BsplineModifiedBasis::new(3).unwrap();
        assert_eq!(basis.eval(1, 1, 0.1), 1.0);
        assert_eq!(basis.eval(1, 1, 0.9), 1.0);
        assert_relative_eq!(basis.eval(3, 1, 0.0625), 1.5, epsilon = 1e-14);
        assert_relative_eq!(basis.eval(3, 1, 0.125), 1.0, epsilon = 1e-14);
        assert_relative_eq!(basis.eval(3, 7, 0.875), 1.0, epsilon = 1e-14);
        assert_relative_eq!(basis.eval(3, 7, 0.9375), 1.5, epsilon = 1e-14);
        // interior functions are the plain centered cardinal splines
        assert_relative_eq!(basis.eval(3, 3, 0.375), 2.0 / 3.0, epsilon = 1e-14);
        assert_relative_eq!(basis.eval(3, 3, 0.25), 1.0 / 6.0, epsilon = 1e-14);
        assert_eq!(basis.eval(3, 3, 0.125), 0.0);
    }

    #[test]
    fn check_mirror_symmetry()
    {
        for degree in [1, 3, 5, 7]
        {
            let basis = BsplineModifiedBasis::new(degree).unwrap();
            for x in [0.0, 0.03, 0.1, 0.2, 0.31]
            {
                assert_relative_eq!(basis.eval(4, 1, x), basis.eval(4, 15, 1.0 - x), epsilon = 1e-13);
                assert_relative_eq!(
                    basis.eval_deriv(4, 1, x, 1).unwrap(),
                    -basis.eval_deriv(4, 15, 1.0 - x, 1).unwrap(),
                    epsilon = 1e-10
                );
            }
        }
    }

    #[test]
    fn check_compact_support()
    {
        for degree in [1, 3, 5, 7]
        {
            let basis = BsplineModifiedBasis::new(degree).unwrap();
            for (level, index) in [(2, 1), (2, 3), (4, 1), (4, 5), (4, 15)]
            {
                let (lower, upper) = basis.support(level, index);
                for k in 0..=256
                {
                    let x = k as f64 / 256.0;
                    if x < lower || x > upper
                    {
                        assert_eq!(basis.eval(level, index, x), 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn check_derivatives_by_finite_differences()
    {
        let eps = 1e-6;
        for degree in [3, 5, 7]
        {
            let basis = BsplineModifiedBasis::new(degree).unwrap();
            for (level, index, x) in [(2, 1, 0.3), (3, 7, 0.9), (4, 1, 0.11), (4, 6, 0.41), (1, 1, 0.5)]
            {
                let fd1 = (basis.eval(level, index, x + eps) - basis.eval(level, index, x - eps)) / (2.0 * eps);
                assert_relative_eq!(basis.eval_deriv(level, index, x, 1).unwrap(), fd1, epsilon = 1e-5, max_relative = 1e-6);
                let fd2 = (basis.eval_deriv(level, index, x + eps, 1).unwrap() - basis.eval_deriv(level, index, x - eps, 1).unwrap()) / (2.0 * eps);
                assert_relative_eq!(basis.eval_deriv(level, index, x, 2).unwrap(), fd2, epsilon = 1e-3, max_relative = 1e-6);
            }
        }
        let basis = BsplineModifiedBasis::new(3).unwrap();
        assert_relative_eq!(basis.eval_deriv(3, 1, 0.05, 1).unwrap(), -8.0, epsilon = 1e-12);
        assert_relative_eq!(basis.eval_deriv(3, 7, 0.95, 1).unwrap(), 8.0, epsilon = 1e-12);
        assert_eq!(basis.eval_deriv(3, 1, 0.05, 3), Err(SGError::UnsupportedDerivative { order: 3 }));
    }

    #[test]
    fn check_integrals()
    {
        let linear = BsplineModifiedBasis::new(1).unwrap();
        assert_relative_eq!(linear.integral(1, 1).unwrap(), 1.0, epsilon = 1e-14);
        assert_relative_eq!(linear.integral(3, 1).unwrap(), 2.0 / 8.0, epsilon = 1e-14);
        let cubic = BsplineModifiedBasis::new(3).unwrap();
        assert_relative_eq!(cubic.integral(3, 1).unwrap(), 25.0 / 12.0 / 8.0, epsilon = 1e-14);
        assert_relative_eq!(cubic.integral(3, 7).unwrap(), 25.0 / 12.0 / 8.0, epsilon = 1e-14);
        assert_relative_eq!(cubic.integral(3, 3).unwrap(), 1.0 / 8.0, epsilon = 1e-14);
        let quintic = BsplineModifiedBasis::new(5).unwrap();
        assert_relative_eq!(quintic.integral(4, 1).unwrap(), 13.0 / 6.0 / 16.0, epsilon = 1e-14);
        let septic = BsplineModifiedBasis::new(7).unwrap();
        assert_relative_eq!(septic.integral(4, 15).unwrap(), 90719.0 / 40320.0 / 16.0, epsilon = 1e-14);
        // level 2 cuts the septic boundary spline off at the far end of the domain
        assert_relative_eq!(septic.integral(2, 1).unwrap(), 90718.0 / 40320.0 / 4.0, epsilon = 1e-14);
    }

    #[test]
    fn check_degree_errors()
    {
        assert_eq!(BsplineModifiedBasis::new(0).unwrap_err(), SGError::UnsupportedDegree(0));
        assert_eq!(BsplineModifiedBasis::new(6).unwrap().degree(), 5);
        assert_eq!(BsplineModifiedBasis::new(3).unwrap().basis_type(), BasisFunction::BsplineModified);
    }
}
