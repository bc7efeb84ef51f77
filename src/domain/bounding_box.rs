use serde::{Deserialize, Serialize};

///
/// Extent of a single axis together with its boundary condition flags.
///
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox1D
{
    pub left_boundary: f64,
    pub right_boundary: f64,
    pub dirichlet_left: bool,
    pub dirichlet_right: bool,
}

impl Default for BoundingBox1D
{
    fn default() -> Self {
        Self { left_boundary: 0.0, right_boundary: 1.0, dirichlet_left: false, dirichlet_right: false }
    }
}

impl BoundingBox1D
{
    pub fn new(left_boundary: f64, right_boundary: f64) -> Self
    {
        Self { left_boundary, right_boundary, ..Default::default() }
    }

    #[inline]
    pub fn width(&self) -> f64
    {
        self.right_boundary - self.left_boundary
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox
{
    pub(crate) dimensions: Vec<BoundingBox1D>,
}

impl Default for BoundingBox
{
    #[inline]
    fn default() -> Self {
        Self { dimensions: vec![] }
    }
}

impl BoundingBox
{
    #[inline]
    pub fn new(lower: &[f64], upper: &[f64]) -> Self
    {
        Self { dimensions: lower.iter().zip(upper).map(|(&l, &u)| BoundingBox1D::new(l, u)).collect() }
    }

    pub fn from_dimensions(dimensions: Vec<BoundingBox1D>) -> Self
    {
        Self { dimensions }
    }

    pub fn with_dim(num_inputs: usize) -> Self
    {
        Self { dimensions: vec![BoundingBox1D::default(); num_inputs] }
    }

    #[inline]
    pub fn dim(&self) -> usize
    {
        self.dimensions.len()
    }

    #[inline]
    pub fn boundary(&self, dim: usize) -> &BoundingBox1D
    {
        &self.dimensions[dim]
    }

    #[inline]
    pub fn set_boundary(&mut self, dim: usize, boundary: BoundingBox1D)
    {
        self.dimensions[dim] = boundary;
    }

    #[inline]
    pub fn lower(&self, dim: usize) -> f64
    {
        self.dimensions[dim].left_boundary
    }

    #[inline]
    pub fn upper(&self, dim: usize) -> f64
    {
        self.dimensions[dim].right_boundary
    }

    #[inline]
    pub fn width(&self, dim: usize) -> f64
    {
        self.dimensions[dim].width()
    }

    ///
    /// Volume of hypercube (width(dim1)*...*width(dim_n))
    ///
    #[inline]
    pub fn volume(&self) -> f64
    {
        self.dimensions.iter().map(|d| d.width()).product()
    }

    ///
    /// True if every axis is `[0,1]`.
    ///
    pub fn is_trivial_cube(&self) -> bool
    {
        self.dimensions.iter().all(|d| d.left_boundary == 0.0 && d.right_boundary == 1.0)
    }

    #[inline]
    pub fn to_unit_coordinate(&self, point: &[f64]) -> Vec<f64>
    {
        point.iter().zip(&self.dimensions).map(|(&x, d)| (x - d.left_boundary) / d.width()).collect()
    }

    #[inline]
    pub fn to_real_coordinate(&self, point: &[f64]) -> Vec<f64>
    {
        point.iter().zip(&self.dimensions).map(|(&x, d)| d.left_boundary + d.width() * x).collect()
    }

    #[inline]
    pub fn contains(&self, point: &[f64]) -> bool
    {
        point.iter().zip(&self.dimensions).all(|(&x, d)| d.left_boundary <= x && x <= d.right_boundary)
    }
}

#[test]
fn check_unit_transform()
{
    let bbox = BoundingBox::new(&[-1.0, 2.0], &[1.0, 6.0]);
    assert_eq!(bbox.volume(), 8.0);
    assert_eq!(bbox.to_unit_coordinate(&[0.0, 3.0]), vec![0.5, 0.25]);
    assert_eq!(bbox.to_real_coordinate(&[0.5, 0.25]), vec![0.0, 3.0]);
    assert!(bbox.contains(&[1.0, 2.0]));
    assert!(!bbox.contains(&[1.5, 2.0]));
    assert!(!bbox.is_trivial_cube());
    assert!(BoundingBox::with_dim(3).is_trivial_cube());
}
