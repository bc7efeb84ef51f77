use serde::{Deserialize, Serialize};

use crate::{errors::SGError, quadrature::gauss_legendre::gauss_legendre};

///
/// One dimensional hierarchical basis function family. `x` is the unit coordinate of the
/// evaluation point unless the family documents otherwise.
///
pub trait Basis : Send + Sync
{
    fn eval(&self, level: u32, index: u32, x: f64) -> f64;

    ///
    /// Derivative of order `order` with respect to `x`. Order 0 is the plain value.
    /// Orders a family cannot represent yield [`SGError::UnsupportedDerivative`].
    ///
    fn eval_deriv(&self, level: u32, index: u32, x: f64, order: usize) -> Result<f64, SGError>;

    fn degree(&self) -> usize;

    fn basis_type(&self) -> BasisFunction;

    ///
    /// Interval outside of which the function vanishes, clipped to `[0, 1]`.
    ///
    fn support(&self, level: u32, index: u32) -> (f64, f64);

    ///
    /// Integral over the unit interval. Each piece of the support between two neighboring
    /// grid nodes of `level` is integrated with a Gauss-Legendre rule that is exact for the
    /// family's degree.
    ///
    fn integral(&self, level: u32, index: u32) -> Result<f64, SGError>
    {
        let order = self.degree() / 2 + 1;
        integrate_pieces(|x| self.eval(level, index, x), self.support(level, index), level, order)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BasisFunction
{
    Linear = 0,
    LinearStretched = 1,
    Bspline = 2,
    NakBspline = 3,
    Wavelet = 4,
    LagrangeNakSpline = 5,
    BsplineModified = 6,
}

///
/// Position of `x` relative to the node `(level, index)` measured in mesh widths, i.e.
/// `t = x * 2^level - index`. When built with [`LocalCoordinate::mirrored`], nodes in the
/// right half of the domain are reflected onto the left half.
///
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct LocalCoordinate
{
    pub t: f64,
    pub index: u64,
    pub h_inv: u64,
    pub mirrored: bool,
}

impl LocalCoordinate
{
    #[inline]
    pub fn new(level: u32, index: u32, x: f64) -> Self
    {
        let h_inv = 1_u64 << level;
        Self { t: x * h_inv as f64 - index as f64, index: index as u64, h_inv, mirrored: false }
    }

    #[inline]
    pub fn mirrored(level: u32, index: u32, x: f64) -> Self
    {
        let local = Self::new(level, index, x);
        if local.index > local.h_inv / 2
        {
            Self { t: -local.t, index: local.h_inv - local.index, h_inv: local.h_inv, mirrored: true }
        }
        else
        {
            local
        }
    }

    /// Position in mesh widths from the left end of the (possibly mirrored) domain.
    #[inline]
    pub fn position(&self) -> f64
    {
        self.index as f64 + self.t
    }

    ///
    /// Chain rule factor `(±2^level)^order` converting a derivative in `t` into one in `x`.
    ///
    #[inline]
    pub fn chain_factor(&self, order: usize) -> f64
    {
        let sign = if self.mirrored && order % 2 == 1 { -1.0 } else { 1.0 };
        sign * (self.h_inv as f64).powi(order as i32)
    }
}

#[inline]
pub(crate) fn check_derivative_order(order: usize, max_order: usize) -> Result<(), SGError>
{
    if order > max_order
    {
        Err(SGError::UnsupportedDerivative { order })
    }
    else
    {
        Ok(())
    }
}

///
/// Reduces a requested spline degree to the supported odd degree, rejecting 0 and anything
/// above 7.
///
pub(crate) fn validate_degree(degree: usize) -> Result<usize, SGError>
{
    if degree == 0 || degree > 7
    {
        return Err(SGError::UnsupportedDegree(degree));
    }
    Ok(if degree % 2 == 0 { degree - 1 } else { degree })
}

///
/// Integrates `f` over `[lower, upper]` split at the nodes of `level`.
///
pub(crate) fn integrate_pieces<F: Fn(f64) -> f64>(f: F, (lower, upper): (f64, f64), level: u32, order: usize) -> Result<f64, SGError>
{
    let rule = gauss_legendre(order)?;
    let h_inv = (1_u64 << level) as f64;
    let mut left = lower;
    let mut sum = 0.0;
    while left < upper
    {
        let right = f64::min(upper, ((left * h_inv).floor() + 1.0) / h_inv);
        sum += rule.integrate(&f, left, right);
        left = right;
    }
    Ok(sum)
}

#[test]
fn check_local_coordinate()
{
    let local = LocalCoordinate::mirrored(3, 7, 0.8);
    assert!(local.mirrored);
    assert_eq!(local.index, 1);
    assert!((local.t - 0.6).abs() < 1e-14);
    assert!((local.position() - 1.6).abs() < 1e-14);
    assert_eq!(local.chain_factor(1), -8.0);
    assert_eq!(local.chain_factor(2), 64.0);
    assert!(!LocalCoordinate::mirrored(3, 4, 0.5).mirrored);
}

#[test]
fn check_degree_validation()
{
    assert_eq!(validate_degree(3), Ok(3));
    assert_eq!(validate_degree(4), Ok(3));
    assert_eq!(validate_degree(1), Ok(1));
    assert_eq!(validate_degree(0), Err(SGError::UnsupportedDegree(0)));
    assert_eq!(validate_degree(8), Err(SGError::UnsupportedDegree(8)));
}

#[test]
fn check_integrate_pieces()
{
    let integral = integrate_pieces(|x| x * x, (0.25, 1.0), 2, 2).unwrap();
    assert!((integral - (1.0 - 0.25_f64.powi(3)) / 3.0).abs() < 1e-14);
    assert_eq!(integrate_pieces(|x| x, (0.0, 1.0), 1, 0), Err(SGError::InvalidQuadratureOrder(0)));
    assert_eq!(integrate_pieces(|x| x, (0.0, 1.0), 1, 21), Err(SGError::InvalidQuadratureOrder(21)));
}
