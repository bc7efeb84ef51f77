use crate::errors::SGError;

use super::base::{check_derivative_order, integrate_pieces, Basis, BasisFunction, LocalCoordinate};

/// Half width of the truncated support in mesh widths.
const SUPPORT: f64 = 2.0;

///
/// Mexican hat wavelets `(1 - t^2) exp(-t^2)`, truncated to `|t| <= 2`.
///
#[derive(Copy, Clone, Debug, Default)]
pub struct WaveletBasis;

#[inline]
fn mexican_hat(t: f64, order: usize) -> f64
{
    if t.abs() > SUPPORT
    {
        return 0.0;
    }
    let t2 = t * t;
    let e = (-t2).exp();
    match order
    {
        0 => (1.0 - t2) * e,
        1 => e * (2.0 * t2 * t - 4.0 * t),
        _ => e * (-4.0 * t2 * t2 + 14.0 * t2 - 4.0),
    }
}

impl Basis for WaveletBasis
{
    #[inline]
    fn eval(&self, level: u32, index: u32, x: f64) -> f64
    {
        mexican_hat(LocalCoordinate::new(level, index, x).t, 0)
    }

    fn eval_deriv(&self, level: u32, index: u32, x: f64, order: usize) -> Result<f64, SGError>
    {
        check_derivative_order(order, 2)?;
        let local = LocalCoordinate::new(level, index, x);
        Ok(mexican_hat(local.t, order) * local.chain_factor(order))
    }

    /// Wavelets are not polynomial; the degree only selects the quadrature order.
    fn degree(&self) -> usize
    {
        0
    }

    fn basis_type(&self) -> BasisFunction
    {
        BasisFunction::Wavelet
    }

    fn support(&self, level: u32, index: u32) -> (f64, f64)
    {
        let h = 1.0 / (1_u64 << level) as f64;
        (f64::max(0.0, (index as f64 - SUPPORT) * h), f64::min(1.0, (index as f64 + SUPPORT) * h))
    }

    fn integral(&self, level: u32, index: u32) -> Result<f64, SGError>
    {
        integrate_pieces(|x| self.eval(level, index, x), self.support(level, index), level, 20)
    }
}
