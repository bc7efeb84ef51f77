#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{basis::base::{Basis, BasisFunction}, errors::SGError, storage::SparseGridData};

///
/// Evaluates sparse grid functions `f(x) = sum_seq alpha[seq] * prod_d phi_d(l_d, i_d, x_d)`.
/// `alpha` holds `num_outputs` coefficients per grid point, laid out parallel to the
/// sequence numbers of the storage.
///
pub struct BasisEvaluation<'a>
{
    storage: &'a SparseGridData,
    basis: Vec<&'a dyn Basis>,
}

impl<'a> BasisEvaluation<'a>
{
    ///
    /// One basis per input dimension.
    ///
    pub fn new(storage: &'a SparseGridData, basis: Vec<&'a dyn Basis>) -> Result<Self, SGError>
    {
        if basis.len() != storage.num_inputs()
        {
            return Err(SGError::DimensionMismatch { expected: storage.num_inputs(), actual: basis.len() });
        }
        Ok(Self { storage, basis })
    }

    ///
    /// Same basis in every dimension.
    ///
    pub fn isotropic(storage: &'a SparseGridData, basis: &'a dyn Basis) -> Self
    {
        Self { storage, basis: vec![basis; storage.num_inputs()] }
    }

    #[inline]
    pub(crate) fn basis(&self, dim: usize) -> &dyn Basis
    {
        self.basis[dim]
    }

    ///
    /// Coordinates handed to the basis of each dimension: physical for stretched hats, unit
    /// otherwise.
    ///
    fn local_coordinates(&self, point: &[f64]) -> Result<Vec<f64>, SGError>
    {
        if point.len() != self.storage.num_inputs()
        {
            return Err(SGError::DimensionMismatch { expected: self.storage.num_inputs(), actual: point.len() });
        }
        if !self.storage.bounding_box.contains(point)
        {
            return Err(SGError::OutOfDomain);
        }
        let unit = self.storage.bounding_box.to_unit_coordinate(point);
        Ok(unit.into_iter().zip(point).enumerate().map(|(d, (u, &x))|
            if self.basis(d).basis_type() == BasisFunction::LinearStretched { x } else { u }).collect())
    }

    fn check_alpha(&self, alpha: &[f64]) -> Result<(), SGError>
    {
        if alpha.len() != self.storage.len() * self.storage.num_outputs()
        {
            return Err(SGError::NumberOfPointsAndValuesMismatch);
        }
        Ok(())
    }

    pub fn eval(&self, point: &[f64], alpha: &[f64]) -> Result<Vec<f64>, SGError>
    {
        self.check_alpha(alpha)?;
        let x = self.local_coordinates(point)?;
        let num_outputs = self.storage.num_outputs();
        let mut result = vec![0.0; num_outputs];
        for (seq, node) in self.storage.nodes().enumerate()
        {
            let mut value = 1.0;
            for d in 0..x.len()
            {
                value *= self.basis(d).eval(node.level[d] as u32, node.index[d], x[d]);
                if value == 0.0
                {
                    break;
                }
            }
            if value != 0.0
            {
                for (r, &a) in result.iter_mut().zip(&alpha[seq * num_outputs..(seq + 1) * num_outputs])
                {
                    *r += a * value;
                }
            }
        }
        Ok(result)
    }

    ///
    /// Evaluates many points, in parallel when the `rayon` feature is enabled.
    ///
    pub fn eval_batch(&self, points: &[Vec<f64>], alpha: &[f64]) -> Result<Vec<Vec<f64>>, SGError>
    {
        self.check_alpha(alpha)?;
        #[cfg(feature = "rayon")]
        {
            points.par_iter().map(|point| self.eval(point, alpha)).collect()
        }
        #[cfg(not(feature = "rayon"))]
        {
            points.iter().map(|point| self.eval(point, alpha)).collect()
        }
    }

    ///
    /// First partial derivatives with respect to the physical coordinates. The result holds
    /// one gradient per output.
    ///
    pub fn eval_gradient(&self, point: &[f64], alpha: &[f64]) -> Result<Vec<Vec<f64>>, SGError>
    {
        self.check_alpha(alpha)?;
        let x = self.local_coordinates(point)?;
        let dim = x.len();
        let num_outputs = self.storage.num_outputs();
        let scale: Vec<f64> = (0..dim).map(|d|
            if self.basis(d).basis_type() == BasisFunction::LinearStretched { 1.0 } else { 1.0 / self.storage.bounding_box.width(d) }).collect();
        let mut gradient = vec![vec![0.0; dim]; num_outputs];
        let mut values = vec![0.0; dim];
        let mut derivs = vec![0.0; dim];
        for (seq, node) in self.storage.nodes().enumerate()
        {
            for d in 0..dim
            {
                let (level, index) = (node.level[d] as u32, node.index[d]);
                values[d] = self.basis(d).eval(level, index, x[d]);
                derivs[d] = self.basis(d).eval_deriv(level, index, x[d], 1)? * scale[d];
            }
            for k in 0..dim
            {
                let partial: f64 = (0..dim).map(|d| if d == k { derivs[d] } else { values[d] }).product();
                if partial == 0.0
                {
                    continue;
                }
                for (g, &a) in gradient.iter_mut().zip(&alpha[seq * num_outputs..(seq + 1) * num_outputs])
                {
                    g[k] += a * partial;
                }
            }
        }
        Ok(gradient)
    }
}
