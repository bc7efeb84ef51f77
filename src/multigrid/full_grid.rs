use crate::{domain::stretching::Stretching, errors::SGError};

///
/// Reduces `(level, index)` with an arbitrary index to the hierarchical node at the same
/// position (odd index, or one of the boundary nodes on level 0).
///
#[inline]
fn hierarchical_node(level: u32, index: u32) -> (u32, u32)
{
    if index == 0
    {
        (0, 0)
    }
    else if index as u64 == 1_u64 << level
    {
        (0, 1)
    }
    else
    {
        let shift = index.trailing_zeros();
        (level - shift, index >> shift)
    }
}

///
/// Dense tensor product grid. Axis `d` holds `2^l_d + 1` points when it includes the boundary
/// and `2^l_d - 1` inner points otherwise. Points are numbered with the first axis running
/// fastest.
///
#[derive(Clone, Debug)]
pub struct FullGrid
{
    levels: Vec<u32>,
    has_boundary: Vec<bool>,
    lengths: Vec<usize>,
    offsets: Vec<usize>,
    coordinates: Vec<Vec<f64>>,
    domain: Vec<(f64, f64)>,
    stretching: Option<Stretching>,
}

impl FullGrid
{
    pub fn new(levels: &[u32], has_boundary: &[bool]) -> Result<Self, SGError>
    {
        if levels.len() != has_boundary.len()
        {
            return Err(SGError::SizeMismatch { expected: levels.len(), actual: has_boundary.len() });
        }
        let mut lengths = Vec::with_capacity(levels.len());
        for (&level, &boundary) in levels.iter().zip(has_boundary)
        {
            if level > 30 || (!boundary && level == 0)
            {
                return Err(SGError::InvalidLevel(level));
            }
            lengths.push(if boundary { (1 << level) + 1 } else { (1 << level) - 1 });
        }
        let mut offsets = vec![1; levels.len()];
        for d in 1..levels.len()
        {
            offsets[d] = offsets[d - 1] * lengths[d - 1];
        }
        let mut grid = Self { levels: levels.to_owned(), has_boundary: has_boundary.to_owned(), lengths, offsets,
            coordinates: Vec::new(), domain: vec![(0.0, 1.0); levels.len()], stretching: None };
        grid.update_coordinates();
        Ok(grid)
    }

    ///
    /// Attaches a (possibly non-uniform) physical domain. Coordinates are taken from the
    /// stretching instead of the unit cube.
    ///
    pub fn with_stretching(mut self, stretching: Stretching) -> Result<Self, SGError>
    {
        if stretching.dim() != self.dim()
        {
            return Err(SGError::DimensionMismatch { expected: self.dim(), actual: stretching.dim() });
        }
        self.domain = (0..self.dim()).map(|d| (stretching.bounding_box().lower(d), stretching.bounding_box().upper(d))).collect();
        self.stretching = Some(stretching);
        self.update_coordinates();
        Ok(self)
    }

    fn update_coordinates(&mut self)
    {
        self.coordinates = (0..self.dim()).map(|d|
            (0..self.lengths[d]).map(|j| self.compute_coordinate(d, j)).collect()).collect();
    }

    fn compute_coordinate(&self, dim: usize, j: usize) -> f64
    {
        let index = (if self.has_boundary[dim] { j } else { j + 1 }) as u32;
        match &self.stretching
        {
            Some(stretching) =>
            {
                let (level, index) = hierarchical_node(self.levels[dim], index);
                stretching.coordinate(level, index, dim)
            }
            None => index as f64 / (1_u64 << self.levels[dim]) as f64,
        }
    }

    ///
    /// Same domain with the given per axis levels.
    ///
    pub fn with_levels(&self, levels: &[u32]) -> Result<Self, SGError>
    {
        let grid = Self::new(levels, &self.has_boundary)?;
        match &self.stretching
        {
            Some(stretching) => grid.with_stretching(stretching.clone()),
            None => Ok(grid),
        }
    }

    #[inline]
    pub fn dim(&self) -> usize
    {
        self.levels.len()
    }

    #[inline]
    pub fn levels(&self) -> &[u32]
    {
        &self.levels
    }

    #[inline]
    pub fn level(&self, dim: usize) -> u32
    {
        self.levels[dim]
    }

    #[inline]
    pub fn has_boundary(&self, dim: usize) -> bool
    {
        self.has_boundary[dim]
    }

    #[inline]
    pub fn boundary_flags(&self) -> &[bool]
    {
        &self.has_boundary
    }

    #[inline]
    pub fn length(&self, dim: usize) -> usize
    {
        self.lengths[dim]
    }

    #[inline]
    pub fn offset(&self, dim: usize) -> usize
    {
        self.offsets[dim]
    }

    #[inline]
    pub fn nr_elements(&self) -> usize
    {
        self.lengths.iter().product()
    }

    #[inline]
    pub fn stretching(&self) -> Option<&Stretching>
    {
        self.stretching.as_ref()
    }

    ///
    /// Position of point `j` on axis `dim`, physical when a stretching is attached.
    ///
    #[inline]
    pub fn coordinate(&self, dim: usize, j: usize) -> f64
    {
        self.coordinates[dim][j]
    }

    /// Domain extent of axis `dim`.
    #[inline]
    pub fn domain(&self, dim: usize) -> (f64, f64)
    {
        self.domain[dim]
    }

    pub fn multi_index(&self, mut linear: usize) -> Vec<usize>
    {
        let mut r = vec![0; self.dim()];
        for (d, j) in r.iter_mut().enumerate()
        {
            *j = linear % self.lengths[d];
            linear /= self.lengths[d];
        }
        r
    }

    #[inline]
    pub fn linear_index(&self, multi_index: &[usize]) -> usize
    {
        multi_index.iter().zip(&self.offsets).map(|(j, o)| j * o).sum()
    }

    pub fn point(&self, linear: usize) -> Vec<f64>
    {
        self.multi_index(linear).iter().enumerate().map(|(d, &j)| self.coordinate(d, j)).collect()
    }

    ///
    /// True if `linear` lies on a boundary face of an axis that includes its boundary.
    ///
    pub fn is_boundary_point(&self, linear: usize) -> bool
    {
        self.multi_index(linear).iter().enumerate().any(|(d, &j)| self.has_boundary[d] && (j == 0 || j + 1 == self.lengths[d]))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::domain::{bounding_box::BoundingBox1D, stretching::StretchingType};
    use approx::assert_relative_eq;

    #[test]
    fn check_lengths_and_offsets()
    {
        let grid = FullGrid::new(&[2, 3], &[true, false]).unwrap();
        assert_eq!(grid.length(0), 5);
        assert_eq!(grid.length(1), 7);
        assert_eq!(grid.offset(0), 1);
        assert_eq!(grid.offset(1), 5);
        assert_eq!(grid.nr_elements(), 35);
        assert_eq!(grid.multi_index(13), vec![3, 2]);
        assert_eq!(grid.linear_index(&[3, 2]), 13);
        assert_eq!(grid.coordinate(0, 1), 0.25);
        assert_eq!(grid.coordinate(1, 0), 0.125);
        assert!(grid.is_boundary_point(4));
        assert!(!grid.is_boundary_point(13));
        assert_eq!(FullGrid::new(&[0], &[false]).unwrap_err(), SGError::InvalidLevel(0));
    }

    #[test]
    fn check_stretched_coordinates()
    {
        let stretching = Stretching::new(vec![BoundingBox1D::new(1.0, 9.0)], &[StretchingType::None]).unwrap();
        let grid = FullGrid::new(&[3], &[true]).unwrap().with_stretching(stretching).unwrap();
        for j in 0..grid.length(0)
        {
            assert_relative_eq!(grid.coordinate(0, j), 1.0 + j as f64, epsilon = 1e-12);
        }
        assert_eq!(grid.domain(0), (1.0, 9.0));
        let coarse = grid.with_levels(&[2]).unwrap();
        assert_relative_eq!(coarse.coordinate(0, 1), 3.0, epsilon = 1e-12);
        assert_eq!(hierarchical_node(3, 6), (2, 3));
        assert_eq!(hierarchical_node(3, 8), (0, 1));
    }
}
