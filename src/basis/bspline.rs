use crate::errors::SGError;

use super::base::{check_derivative_order, validate_degree, Basis, BasisFunction, LocalCoordinate};

///
/// Cardinal B-spline of degree `p` with knots `0, 1, ..., p + 1`.
///
pub(crate) fn cardinal_bspline(x: f64, p: usize) -> f64
{
    if p == 0
    {
        return if (0.0..1.0).contains(&x) { 1.0 } else { 0.0 };
    }
    if x <= 0.0 || x >= (p + 1) as f64
    {
        return 0.0;
    }
    let pf = p as f64;
    x / pf * cardinal_bspline(x, p - 1) + ((pf + 1.0 - x) / pf) * cardinal_bspline(x - 1.0, p - 1)
}

///
/// Derivative of order `order` of [`cardinal_bspline`], given by finite differences of the
/// lower degree splines.
///
pub(crate) fn cardinal_bspline_deriv(x: f64, p: usize, order: usize) -> f64
{
    if order == 0
    {
        return cardinal_bspline(x, p);
    }
    if order > p
    {
        return 0.0;
    }
    cardinal_bspline_deriv(x, p - 1, order - 1) - cardinal_bspline_deriv(x - 1.0, p - 1, order - 1)
}

///
/// Hierarchical uniform B-splines of odd degree, centered on the grid nodes.
///
#[derive(Copy, Clone, Debug)]
pub struct BsplineBasis
{
    degree: usize,
}

impl BsplineBasis
{
    ///
    /// Even degrees are rounded down to the next odd degree, degrees 0 and above 7 are rejected.
    ///
    pub fn new(degree: usize) -> Result<Self, SGError>
    {
        Ok(Self { degree: validate_degree(degree)? })
    }

    #[inline]
    fn shift(&self) -> f64
    {
        (self.degree + 1) as f64 / 2.0
    }
}

impl Basis for BsplineBasis
{
    #[inline]
    fn eval(&self, level: u32, index: u32, x: f64) -> f64
    {
        let local = LocalCoordinate::new(level, index, x);
        cardinal_bspline(local.t + self.shift(), self.degree)
    }

    fn eval_deriv(&self, level: u32, index: u32, x: f64, order: usize) -> Result<f64, SGError>
    {
        check_derivative_order(order, 2)?;
        let local = LocalCoordinate::new(level, index, x);
        Ok(cardinal_bspline_deriv(local.t + self.shift(), self.degree, order) * local.chain_factor(order))
    }

    fn degree(&self) -> usize
    {
        self.degree
    }

    fn basis_type(&self) -> BasisFunction
    {
        BasisFunction::Bspline
    }

    fn support(&self, level: u32, index: u32) -> (f64, f64)
    {
        let h = 1.0 / (1_u64 << level) as f64;
        (f64::max(0.0, (index as f64 - self.shift()) * h), f64::min(1.0, (index as f64 + self.shift()) * h))
    }
}
