//!
//! Grid transfer between two nested full grids. Values carry `nr_space` unknowns per grid
//! point, stored contiguously.
//!
use crate::errors::SGError;

use super::full_grid::FullGrid;

fn check_length(grid: &FullGrid, values: &[f64], nr_space: usize) -> Result<(), SGError>
{
    let expected = grid.nr_elements() * nr_space;
    if values.len() != expected
    {
        return Err(SGError::SizeMismatch { expected, actual: values.len() });
    }
    Ok(())
}

///
/// Every axis of `coarse` must carry the same boundary flag as `fine` and either the same
/// level or one level less.
///
fn check_nested(fine: &FullGrid, coarse: &FullGrid) -> Result<(), SGError>
{
    if fine.dim() != coarse.dim()
    {
        return Err(SGError::DimensionMismatch { expected: fine.dim(), actual: coarse.dim() });
    }
    for dim in 0..fine.dim()
    {
        let nested = fine.level(dim) == coarse.level(dim) || fine.level(dim) == coarse.level(dim) + 1;
        if !nested || fine.has_boundary(dim) != coarse.has_boundary(dim)
        {
            return Err(SGError::GridsNotNested { dim });
        }
    }
    Ok(())
}

///
/// Coarse cell `k` (cell between coarse points `k` and `k + 1`) containing fine point `j`
/// on axis `dim`, together with the interpolation fraction inside that cell. Fractions
/// outside `[0, 1]` extrapolate towards the domain boundary on axes without boundary points.
///
fn coarse_cell(fine: &FullGrid, coarse: &FullGrid, dim: usize, j: usize) -> (usize, f64)
{
    let n = coarse.length(dim) as i64;
    let k = if fine.has_boundary(dim) { j as i64 / 2 } else { (j as i64 - 1).div_euclid(2) };
    let k = k.clamp(0, (n - 2).max(0)) as usize;
    if n < 2
    {
        return (0, 0.0);
    }
    let (x0, x1) = (coarse.coordinate(dim, k), coarse.coordinate(dim, k + 1));
    (k, (fine.coordinate(dim, j) - x0) / (x1 - x0))
}

///
/// `fine_values = coef_fine * fine_values + coef_coarse * P coarse_values`, with `P` the
/// multilinear interpolation of the coarse grid at the fine grid points.
///
pub fn prolongation(fine: &FullGrid, fine_values: &mut [f64], coef_fine: f64, coarse: &FullGrid, coarse_values: &[f64],
    coef_coarse: f64, nr_space: usize) -> Result<(), SGError>
{
    check_nested(fine, coarse)?;
    check_length(fine, fine_values, nr_space)?;
    check_length(coarse, coarse_values, nr_space)?;
    let dim = fine.dim();
    // per axis: None when the level is unchanged (direct copy) or the coarse cell otherwise
    let cells: Vec<Vec<Option<(usize, f64)>>> = (0..dim).map(|d|
        (0..fine.length(d)).map(|j|
            if fine.level(d) == coarse.level(d) { None } else { Some(coarse_cell(fine, coarse, d, j)) }).collect()).collect();
    let mut interpolated = vec![0.0; nr_space];
    for linear in 0..fine.nr_elements()
    {
        let multi_index = fine.multi_index(linear);
        interpolated.iter_mut().for_each(|v| *v = 0.0);
        'corners: for corner in 0..(1_usize << dim)
        {
            let mut weight = 1.0;
            let mut coarse_linear = 0;
            for d in 0..dim
            {
                let upper = (corner >> d) & 1 == 1;
                let k = match cells[d][multi_index[d]]
                {
                    None =>
                    {
                        if upper
                        {
                            continue 'corners;
                        }
                        multi_index[d]
                    }
                    Some((k, fraction)) =>
                    {
                        weight *= if upper { fraction } else { 1.0 - fraction };
                        if upper { k + 1 } else { k }
                    }
                };
                if weight == 0.0
                {
                    continue 'corners;
                }
                coarse_linear += k * coarse.offset(d);
            }
            for (s, v) in interpolated.iter_mut().enumerate()
            {
                *v += weight * coarse_values[coarse_linear * nr_space + s];
            }
        }
        for (s, &v) in interpolated.iter().enumerate()
        {
            let target = &mut fine_values[linear * nr_space + s];
            *target = coef_fine * *target + coef_coarse * v;
        }
    }
    Ok(())
}

///
/// `coarse_values = coef_coarse * coarse_values + coef_fine * R fine_values`, with `R` the
/// injection of the fine grid values at the coarse grid points.
///
pub fn restriction(fine: &FullGrid, fine_values: &[f64], coef_fine: f64, coarse: &FullGrid, coarse_values: &mut [f64],
    coef_coarse: f64, nr_space: usize) -> Result<(), SGError>
{
    check_nested(fine, coarse)?;
    check_length(fine, fine_values, nr_space)?;
    check_length(coarse, coarse_values, nr_space)?;
    for linear in 0..coarse.nr_elements()
    {
        let multi_index = coarse.multi_index(linear);
        let mut fine_linear = 0;
        for (d, &k) in multi_index.iter().enumerate()
        {
            let j = if fine.level(d) == coarse.level(d)
            {
                k
            }
            else if fine.has_boundary(d)
            {
                2 * k
            }
            else
            {
                2 * k + 1
            };
            fine_linear += j * fine.offset(d);
        }
        for s in 0..nr_space
        {
            let target = &mut coarse_values[linear * nr_space + s];
            *target = coef_coarse * *target + coef_fine * fine_values[fine_linear * nr_space + s];
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::domain::{bounding_box::BoundingBox1D, stretching::{Stretching, StretchingType}};
    use approx::assert_relative_eq;

    #[test]
    fn check_constants_survive_transfer()
    {
        for boundary in [true, false]
        {
            let fine = FullGrid::new(&[4, 3], &[boundary, boundary]).unwrap();
            let coarse = fine.with_levels(&[3, 2]).unwrap();
            let coarse_values = vec![2.5; coarse.nr_elements()];
            let mut fine_values = vec![1.0; fine.nr_elements()];
            prolongation(&fine, &mut fine_values, 0.0, &coarse, &coarse_values, 1.0, 1).unwrap();
            fine_values.iter().for_each(|&v| assert_relative_eq!(v, 2.5, epsilon = 1e-14));
            let mut restricted = vec![0.0; coarse.nr_elements()];
            restriction(&fine, &fine_values, 1.0, &coarse, &mut restricted, 0.0, 1).unwrap();
            assert_eq!(restricted, coarse_values);
        }
    }

    #[test]
    fn check_linear_functions_are_reproduced()
    {
        let stretching = Stretching::new(vec![BoundingBox1D::new(1.0, 5.0), BoundingBox1D::new(0.0, 2.0)],
            &[StretchingType::Log, StretchingType::Sinh { x_0: 1.0, xsi: 3.0 }]).unwrap();
        for boundary in [true, false]
        {
            let fine = FullGrid::new(&[3, 3], &[boundary, boundary]).unwrap().with_stretching(stretching.clone()).unwrap();
            let coarse = fine.with_levels(&[2, 3]).unwrap();
            let f = |x: &[f64]| 1.0 + 2.0 * x[0] - 0.5 * x[1];
            let coarse_values: Vec<f64> = (0..coarse.nr_elements()).map(|i| f(&coarse.point(i))).collect();
            let mut fine_values = vec![0.0; fine.nr_elements()];
            prolongation(&fine, &mut fine_values, 0.0, &coarse, &coarse_values, 1.0, 1).unwrap();
            for (i, &v) in fine_values.iter().enumerate()
            {
                assert_relative_eq!(v, f(&fine.point(i)), epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn check_multiple_unknowns_per_node()
    {
        let fine = FullGrid::new(&[2], &[true]).unwrap();
        let coarse = fine.with_levels(&[1]).unwrap();
        let coarse_values = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let mut fine_values = vec![0.0; 10];
        prolongation(&fine, &mut fine_values, 0.0, &coarse, &coarse_values, 1.0, 2).unwrap();
        assert_eq!(fine_values, vec![0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0, 5.0]);
        let mut restricted = vec![1.0; 6];
        restriction(&fine, &fine_values, 2.0, &coarse, &mut restricted, 1.0, 2).unwrap();
        assert_eq!(restricted, vec![1.0, 3.0, 5.0, 7.0, 9.0, 11.0]);
    }

    #[test]
    fn check_grids_must_be_nested()
    {
        // coarse and fine swapped: lengths fit the buffers but the levels go the wrong way
        let small = FullGrid::new(&[2], &[true]).unwrap();
        let large = FullGrid::new(&[3], &[true]).unwrap();
        let mut small_values = vec![1.0; small.nr_elements()];
        let large_values = vec![1.0; large.nr_elements()];
        assert_eq!(restriction(&small, &small_values, 1.0, &large, &mut large_values.clone(), 0.0, 1),
            Err(SGError::GridsNotNested { dim: 0 }));
        assert_eq!(prolongation(&small, &mut small_values, 0.0, &large, &large_values, 1.0, 1),
            Err(SGError::GridsNotNested { dim: 0 }));

        // two levels apart
        let fine = FullGrid::new(&[2, 4], &[false, false]).unwrap();
        let coarse = fine.with_levels(&[2, 2]).unwrap();
        let mut coarse_values = vec![0.0; coarse.nr_elements()];
        assert_eq!(restriction(&fine, &vec![0.0; fine.nr_elements()], 1.0, &coarse, &mut coarse_values, 0.0, 1),
            Err(SGError::GridsNotNested { dim: 1 }));

        // boundary on the fine axis only
        let fine = FullGrid::new(&[3], &[true]).unwrap();
        let coarse = FullGrid::new(&[2], &[false]).unwrap();
        let mut coarse_values = vec![0.0; coarse.nr_elements()];
        assert_eq!(restriction(&fine, &vec![0.0; fine.nr_elements()], 1.0, &coarse, &mut coarse_values, 0.0, 1),
            Err(SGError::GridsNotNested { dim: 0 }));
    }

    #[test]
    fn check_size_mismatch()
    {
        let fine = FullGrid::new(&[2], &[false]).unwrap();
        let coarse = fine.with_levels(&[1]).unwrap();
        let mut fine_values = vec![0.0; 3];
        assert_eq!(prolongation(&fine, &mut fine_values, 0.0, &coarse, &[1.0, 2.0], 1.0, 1),
            Err(SGError::SizeMismatch { expected: 1, actual: 2 }));
        let mut coarse_values = vec![0.0; 1];
        assert_eq!(restriction(&fine, &[1.0], 1.0, &coarse, &mut coarse_values, 0.0, 1),
            Err(SGError::SizeMismatch { expected: 3, actual: 1 }));
    }
}
