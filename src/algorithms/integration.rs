use crate::{basis::base::Basis, errors::SGError, storage::SparseGridData};

///
/// Integral of a sparse grid function over its bounding box: the tensor product of the 1-D
/// basis integrals, scaled by the box volume. One value per output.
///
pub fn integrate(storage: &SparseGridData, basis: &[&dyn Basis], alpha: &[f64]) -> Result<Vec<f64>, SGError>
{
    if basis.len() != storage.num_inputs()
    {
        return Err(SGError::DimensionMismatch { expected: storage.num_inputs(), actual: basis.len() });
    }
    let num_outputs = storage.num_outputs();
    if alpha.len() != storage.len() * num_outputs
    {
        return Err(SGError::NumberOfPointsAndValuesMismatch);
    }
    let volume = storage.bounding_box().volume();
    let mut integral = vec![0.0; num_outputs];
    for (seq, node) in storage.nodes().enumerate()
    {
        let weight: f64 = basis.iter().enumerate().map(|(d, b)| b.integral(node.level[d] as u32, node.index[d])).product::<Result<f64, SGError>>()?;
        for (r, &a) in integral.iter_mut().zip(&alpha[seq * num_outputs..(seq + 1) * num_outputs])
        {
            *r += a * weight;
        }
    }
    for r in integral.iter_mut()
    {
        *r *= volume;
    }
    Ok(integral)
}

///
/// [`integrate`] with the same basis in every dimension.
///
pub fn integrate_isotropic(storage: &SparseGridData, basis: &dyn Basis, alpha: &[f64]) -> Result<Vec<f64>, SGError>
{
    integrate(storage, &vec![basis; storage.num_inputs()], alpha)
}
