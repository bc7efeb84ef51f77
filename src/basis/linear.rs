use crate::errors::SGError;

use super::base::{check_derivative_order, Basis, BasisFunction, LocalCoordinate};

///
/// Piecewise linear hat functions. Level 0 carries the two boundary functions `1 - x` and `x`.
///
#[derive(Copy, Clone, Debug, Default)]
pub struct LinearBasis;

impl Basis for LinearBasis
{
    #[inline]
    fn eval(&self, level: u32, index: u32, x: f64) -> f64
    {
        if level == 0
        {
            if index == 0
            {
                1.0 - x
            }
            else
            {
                x
            }
        }
        else
        {
            0.0_f64.max(1.0 - f64::abs((1_u64 << level) as f64 * x - index as f64))
        }
    }

    fn eval_deriv(&self, level: u32, index: u32, x: f64, order: usize) -> Result<f64, SGError>
    {
        check_derivative_order(order, 1)?;
        if order == 0
        {
            return Ok(self.eval(level, index, x));
        }
        if level == 0
        {
            return Ok(if index == 0 { -1.0 } else { 1.0 });
        }
        let local = LocalCoordinate::new(level, index, x);
        let slope = if -1.0 < local.t && local.t < 0.0
        {
            1.0
        }
        else if 0.0 <= local.t && local.t < 1.0
        {
            -1.0
        }
        else
        {
            0.0
        };
        Ok(slope * local.chain_factor(1))
    }

    fn degree(&self) -> usize
    {
        1
    }

    fn basis_type(&self) -> BasisFunction
    {
        BasisFunction::Linear
    }

    #[inline]
    fn support(&self, level: u32, index: u32) -> (f64, f64)
    {
        if level == 0
        {
            return (0.0, 1.0);
        }
        let h = 1.0 / (1_u64 << level) as f64;
        (f64::max(0.0, (index as f64 - 1.0) * h), f64::min(1.0, (index as f64 + 1.0) * h))
    }

    #[inline]
    fn integral(&self, level: u32, index: u32) -> Result<f64, SGError>
    {
        let h = 1.0 / (1_u64 << level) as f64;
        Ok(if level == 0
        {
            0.5
        }
        else if index == 0 || index as u64 == 1_u64 << level
        {
            0.5 * h
        }
        else
        {
            h
        })
    }
}
