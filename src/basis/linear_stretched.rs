use crate::{domain::stretching::Stretching, errors::SGError};

use super::base::{check_derivative_order, Basis, BasisFunction};

///
/// Hat functions on a stretched axis. Unlike the unit-coordinate families, `x` is the
/// physical coordinate and the hat spans the stretched positions of the hierarchical
/// neighbors of `(level, index)`.
///
#[derive(Copy, Clone, Debug)]
pub struct LinearStretchedBasis<'a>
{
    stretching: &'a Stretching,
    dim: usize,
}

impl<'a> LinearStretchedBasis<'a>
{
    pub fn new(stretching: &'a Stretching, dim: usize) -> Self
    {
        Self { stretching, dim }
    }

    #[inline]
    pub fn dim(&self) -> usize
    {
        self.dim
    }
}

impl Basis for LinearStretchedBasis<'_>
{
    fn eval(&self, level: u32, index: u32, x: f64) -> f64
    {
        let (center, left, right) = self.stretching.adjacent_positions(level, index, self.dim);
        if level == 0
        {
            let width = right - left;
            return if index == 0 { (right - x) / width } else { (x - left) / width };
        }
        if left <= x && x <= center
        {
            (x - left) / (center - left)
        }
        else if center < x && x <= right
        {
            (right - x) / (right - center)
        }
        else
        {
            0.0
        }
    }

    fn eval_deriv(&self, level: u32, index: u32, x: f64, order: usize) -> Result<f64, SGError>
    {
        check_derivative_order(order, 1)?;
        if order == 0
        {
            return Ok(self.eval(level, index, x));
        }
        let (center, left, right) = self.stretching.adjacent_positions(level, index, self.dim);
        if level == 0
        {
            let width = right - left;
            return Ok(if index == 0 { -1.0 / width } else { 1.0 / width });
        }
        Ok(if left < x && x < center
        {
            1.0 / (center - left)
        }
        else if center <= x && x < right
        {
            -1.0 / (right - center)
        }
        else
        {
            0.0
        })
    }

    fn degree(&self) -> usize
    {
        1
    }

    fn basis_type(&self) -> BasisFunction
    {
        BasisFunction::LinearStretched
    }

    /// Support in physical coordinates.
    fn support(&self, level: u32, index: u32) -> (f64, f64)
    {
        let (_, left, right) = self.stretching.adjacent_positions(level, index, self.dim);
        (left, right)
    }

    ///
    /// Integral relative to the axis width, so that scaling by the bounding box volume yields
    /// the physical integral.
    ///
    fn integral(&self, level: u32, index: u32) -> Result<f64, SGError>
    {
        let (_, left, right) = self.stretching.adjacent_positions(level, index, self.dim);
        Ok(0.5 * (right - left) / self.stretching.bounding_box().width(self.dim))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::domain::{bounding_box::BoundingBox1D, stretching::StretchingType};
    use approx::assert_relative_eq;

    #[test]
    fn check_uniform_stretching_matches_scaled_hat()
    {
        let stretching = Stretching::new(vec![BoundingBox1D::new(-1.0, 3.0)], &[StretchingType::None]).unwrap();
        let basis = LinearStretchedBasis::new(&stretching, 0);
        // node (2, 1) sits at 0.0 with neighbors -1.0 and 1.0
        assert_relative_eq!(basis.eval(2, 1, 0.0), 1.0);
        assert_relative_eq!(basis.eval(2, 1, 0.5), 0.5);
        assert_relative_eq!(basis.eval(2, 1, 1.5), 0.0);
        assert_relative_eq!(basis.eval(0, 1, 1.0), 0.5);
        assert_relative_eq!(basis.eval_deriv(2, 1, 0.5, 1).unwrap(), -1.0);
        assert_relative_eq!(basis.integral(2, 1).unwrap(), 0.25);
        assert_eq!(basis.eval_deriv(2, 1, 0.5, 2), Err(SGError::UnsupportedDerivative { order: 2 }));
    }

    #[test]
    fn check_stretched_hat_peaks_at_node()
    {
        let stretching = Stretching::new(vec![BoundingBox1D::new(1.0, 10.0)], &[StretchingType::Log]).unwrap();
        let basis = LinearStretchedBasis::new(&stretching, 0);
        for (level, index) in [(1, 1), (2, 3), (3, 5)]
        {
            let (center, left, right) = stretching.adjacent_positions(level, index, 0);
            assert!(left < center && center < right);
            assert_relative_eq!(basis.eval(level, index, center), 1.0, epsilon = 1e-12);
            assert_relative_eq!(basis.eval(level, index, left), 0.0, epsilon = 1e-12);
            assert_relative_eq!(basis.eval(level, index, right), 0.0, epsilon = 1e-12);
            assert_eq!(basis.support(level, index), (left, right));
        }
    }
}
