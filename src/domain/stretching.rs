//!
//! Non-uniform placement of grid points: maps `(level, index)` of a dimension to a physical
//! coordinate. Levels up to [`LOOKUP_MAX`] are served from a per-dimension table that also
//! stores the coordinates of the left and right hierarchical neighbors.
//!
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use crate::domain::bounding_box::{BoundingBox, BoundingBox1D};
use crate::errors::SGError;
use crate::level_index::{lookup_index, neighbor_specs, LEFT_BOUNDARY, LOOKUP_MAX, LOOKUP_SIZE, NEIGHBOR_TABLES, RIGHT_BOUNDARY};

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum StretchingType
{
    /// Uniform spacing.
    #[default]
    None,
    /// Uniform spacing of `ln x`. Requires a positive domain.
    Log,
    /// Leentvaar stretching, points cluster around `x_0` with intensity `xsi`.
    Sinh { x_0: f64, xsi: f64 },
    /// Coordinates read from a user supplied vector.
    Discrete,
}

impl StretchingType
{
    ///
    /// Parses the textual transform names `"id"`/`"none"`, `"log"` and `"sinh"`/`"leentvaar"`.
    /// `x_0` and `xsi` are only used by the sinh transform.
    ///
    pub fn from_name(name: &str, x_0: f64, xsi: f64) -> Result<Self, SGError>
    {
        match name
        {
            "id" | "none" => Ok(StretchingType::None),
            "log" => Ok(StretchingType::Log),
            "sinh" | "leentvaar" => Ok(StretchingType::Sinh { x_0, xsi }),
            _ => Err(SGError::UnsupportedTransform(name.to_owned())),
        }
    }

    ///
    /// Position at relative hierarchical coordinate `frac` in `[0,1]` for analytic transforms.
    ///
    fn analytic_position(&self, bounds: &BoundingBox1D, frac: f64) -> f64
    {
        let (a, b) = (bounds.left_boundary, bounds.right_boundary);
        match *self
        {
            StretchingType::Log =>
            {
                let (f_a, f_b) = (a.ln(), b.ln());
                (f_a + frac * (f_b - f_a)).exp()
            },
            StretchingType::Sinh { x_0, xsi } =>
            {
                let f_a = ((a - x_0) * xsi).asinh();
                let f_b = ((b - x_0) * xsi).asinh();
                (f_a + frac * (f_b - f_a)).sinh() / xsi + x_0
            },
            StretchingType::None | StretchingType::Discrete => a + frac * (b - a),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StretchingMode
{
    Analytic,
    Discrete,
}

///
/// Table of `[position, left neighbor position, right neighbor position]` indexed by
/// [`lookup_index`].
///
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stretching1D
{
    pub stretching_type: StretchingType,
    #[serde_as(as = "Box<[[_; 3]; LOOKUP_SIZE]>")]
    lookup: Box<[[f64; 3]; LOOKUP_SIZE]>,
    discrete_level: Option<u32>,
}

impl Stretching1D
{
    fn new(stretching_type: StretchingType) -> Self
    {
        Self { stretching_type, lookup: Box::new([[0.0; 3]; LOOKUP_SIZE]), discrete_level: None }
    }

    fn analytic(stretching_type: StretchingType, bounds: &BoundingBox1D) -> Self
    {
        let mut r = Self::new(stretching_type);
        let mut idx = 0;
        for l in 1..=LOOKUP_MAX
        {
            let elem_per_level = 1u32 << (l - 1);
            for i in 1..=elem_per_level
            {
                let frac = (2 * i - 1) as f64 / (2 * elem_per_level) as f64;
                r.lookup[idx][0] = stretching_type.analytic_position(bounds, frac);
                idx += 1;
            }
        }
        r.generate_left_right(bounds);
        r
    }

    ///
    /// Builds the table from `2^L + 1` coordinates. Levels `1..=L` are read from the vector,
    /// finer table levels are placed in the middle of their neighbors.
    ///
    fn discrete(coordinates: &[f64], bounds: &BoundingBox1D, dim: usize) -> Result<Self, SGError>
    {
        let len = coordinates.len();
        let invalid = SGError::InvalidDiscreteVector { dim, len };
        if len < 3
        {
            return Err(invalid);
        }
        let level = (len - 1).trailing_zeros();
        if (1usize << level) + 1 != len || level > LOOKUP_MAX
        {
            return Err(invalid);
        }
        // strictly increasing, NaN fails the comparison as well
        if coordinates.windows(2).any(|w| !(w[0] < w[1]))
        {
            return Err(SGError::NonMonotonicDiscreteVector { dim });
        }
        let mut r = Self::new(StretchingType::Discrete);
        r.discrete_level = Some(level);
        let mut vec = coordinates.to_vec();
        for l in (1..=level).rev()
        {
            let elem_per_level = 1usize << l;
            let mut idx = 0;
            // odd entries belong to level l, the even ones move down to form level l-1
            for i in (1..elem_per_level).step_by(2)
            {
                r.lookup[lookup_index(l, i as u32)][0] = vec[i];
                vec[idx] = vec[i - 1];
                idx += 1;
            }
            vec[idx] = vec[elem_per_level];
        }
        for l in level + 1..=LOOKUP_MAX
        {
            for i in (1..(1u32 << l)).step_by(2)
            {
                let spec = neighbor_specs(l, i);
                let pos_l = r.coordinate(bounds, spec.left_level, spec.left_index);
                let pos_r = r.coordinate(bounds, spec.right_level, spec.right_index);
                r.lookup[lookup_index(l, i)][0] = pos_l + 0.5 * (pos_r - pos_l);
            }
        }
        r.generate_left_right(bounds);
        Ok(r)
    }

    fn generate_left_right(&mut self, bounds: &BoundingBox1D)
    {
        for idx in 0..LOOKUP_SIZE
        {
            self.lookup[idx][1] = match NEIGHBOR_TABLES.left[idx]
            {
                LEFT_BOUNDARY => bounds.left_boundary,
                entry => self.lookup[entry as usize][0],
            };
            self.lookup[idx][2] = match NEIGHBOR_TABLES.right[idx]
            {
                RIGHT_BOUNDARY => bounds.right_boundary,
                entry => self.lookup[entry as usize][0],
            };
        }
    }

    fn stretching_xform(&self, bounds: &BoundingBox1D, level: u32, index: u32) -> f64
    {
        if level <= LOOKUP_MAX
        {
            return self.lookup[lookup_index(level, index)][0];
        }
        match self.stretching_type
        {
            StretchingType::Discrete => self.discrete_fallback(bounds, level, index),
            t => t.analytic_position(bounds, index as f64 / (1u64 << level) as f64),
        }
    }

    ///
    /// Positions below the table depth interpolate linearly between the enclosing table nodes.
    ///
    fn discrete_fallback(&self, bounds: &BoundingBox1D, level: u32, index: u32) -> f64
    {
        let pow2_delta = (1u64 << (level - LOOKUP_MAX)) as f64;
        let d_index = index as f64 / pow2_delta;
        let climb = |mut l: u32, mut i: u64, boundary_index: u64| {
            while i % 2 == 0 && l > 0
            {
                i /= 2;
                l -= 1;
            }
            if l == 0 { (0, boundary_index as u32) } else { (l, i as u32) }
        };
        let (left_level, left_index) = climb(LOOKUP_MAX, d_index.floor() as u64, 0);
        let (right_level, right_index) = climb(LOOKUP_MAX, d_index.ceil() as u64, 1);
        let pos_l = self.coordinate(bounds, left_level, left_index);
        let pos_r = self.coordinate(bounds, right_level, right_index);
        pos_l + (pos_r - pos_l) * (d_index - d_index.floor())
    }

    fn coordinate(&self, bounds: &BoundingBox1D, level: u32, index: u32) -> f64
    {
        if level == 0
        {
            if index == 0 { bounds.left_boundary } else { bounds.right_boundary }
        }
        else
        {
            self.stretching_xform(bounds, level, index)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stretching
{
    bounding_box: BoundingBox,
    dimensions: Vec<Stretching1D>,
    mode: StretchingMode,
}

impl Stretching
{
    ///
    /// Analytic stretching with one transform per dimension.
    ///
    pub fn new(boundaries: Vec<BoundingBox1D>, types: &[StretchingType]) -> Result<Self, SGError>
    {
        if boundaries.len() != types.len()
        {
            return Err(SGError::SizeMismatch { expected: boundaries.len(), actual: types.len() });
        }
        let mut dimensions = Vec::with_capacity(types.len());
        for (bounds, &t) in boundaries.iter().zip(types)
        {
            match t
            {
                StretchingType::Discrete => return Err(SGError::UnsupportedTransform("discrete transform requires coordinates".to_owned())),
                StretchingType::Log if bounds.left_boundary <= 0.0 => return Err(SGError::UnsupportedTransform("log transform on a non-positive domain".to_owned())),
                StretchingType::Sinh { xsi, .. } if xsi == 0.0 => return Err(SGError::UnsupportedTransform("sinh transform with xsi = 0".to_owned())),
                _ => {}
            }
            dimensions.push(Stretching1D::analytic(t, bounds));
        }
        Ok(Self { bounding_box: BoundingBox::from_dimensions(boundaries), dimensions, mode: StretchingMode::Analytic })
    }

    ///
    /// Same as [`Stretching::new`] with textual transform names. `params` holds `(x_0, xsi)`
    /// per dimension.
    ///
    pub fn from_names(boundaries: Vec<BoundingBox1D>, names: &[&str], params: &[(f64, f64)]) -> Result<Self, SGError>
    {
        if names.len() != params.len()
        {
            return Err(SGError::SizeMismatch { expected: names.len(), actual: params.len() });
        }
        let types = names.iter().zip(params).map(|(name, &(x_0, xsi))| StretchingType::from_name(name, x_0, xsi)).collect::<Result<Vec<_>, _>>()?;
        Self::new(boundaries, &types)
    }

    ///
    /// Discrete stretching from one coordinate vector of length `2^L + 1` per dimension. The
    /// first and last entries become Dirichlet boundaries.
    ///
    pub fn from_discrete(coordinates: &[Vec<f64>]) -> Result<Self, SGError>
    {
        let mut boundaries = Vec::with_capacity(coordinates.len());
        let mut dimensions = Vec::with_capacity(coordinates.len());
        for (dim, vec) in coordinates.iter().enumerate()
        {
            let (Some(&left_boundary), Some(&right_boundary)) = (vec.first(), vec.last()) else {
                return Err(SGError::InvalidDiscreteVector { dim, len: vec.len() });
            };
            let bounds = BoundingBox1D { left_boundary, right_boundary, dirichlet_left: true, dirichlet_right: true };
            dimensions.push(Stretching1D::discrete(vec, &bounds, dim)?);
            boundaries.push(bounds);
        }
        Ok(Self { bounding_box: BoundingBox::from_dimensions(boundaries), dimensions, mode: StretchingMode::Discrete })
    }

    #[inline]
    pub fn dim(&self) -> usize
    {
        self.dimensions.len()
    }

    #[inline]
    pub fn bounding_box(&self) -> &BoundingBox
    {
        &self.bounding_box
    }

    #[inline]
    pub fn mode(&self) -> StretchingMode
    {
        self.mode
    }

    #[inline]
    pub fn stretching_1d(&self, dim: usize) -> &Stretching1D
    {
        &self.dimensions[dim]
    }

    pub fn is_trivial_cube(&self) -> bool
    {
        self.bounding_box.is_trivial_cube()
    }

    ///
    /// Physical position of the inner node `(level, index)`, `level >= 1`.
    ///
    pub fn stretching_xform(&self, level: u32, index: u32, dim: usize) -> f64
    {
        self.dimensions[dim].stretching_xform(self.bounding_box.boundary(dim), level, index)
    }

    ///
    /// Physical position of `(level, index)`, boundary nodes included.
    ///
    pub fn coordinate(&self, level: u32, index: u32, dim: usize) -> f64
    {
        self.dimensions[dim].coordinate(self.bounding_box.boundary(dim), level, index)
    }

    ///
    /// Returns `(center, left, right)`: the node position and the positions of its
    /// hierarchical neighbors.
    ///
    pub fn adjacent_positions(&self, level: u32, index: u32, dim: usize) -> (f64, f64, f64)
    {
        let bounds = self.bounding_box.boundary(dim);
        if level == 0
        {
            let pos = self.coordinate(0, index, dim);
            return (pos, bounds.left_boundary, bounds.right_boundary);
        }
        if level <= LOOKUP_MAX
        {
            let entry = &self.dimensions[dim].lookup[lookup_index(level, index)];
            return (entry[0], entry[1], entry[2]);
        }
        let spec = neighbor_specs(level, index);
        (self.coordinate(level, index, dim),
            self.coordinate(spec.left_level, spec.left_index, dim),
            self.coordinate(spec.right_level, spec.right_index, dim))
    }

    ///
    /// Reproduces the coordinate vectors of a discrete stretching. Without sorting the inner
    /// entries are returned in hierarchical order.
    ///
    pub fn discrete_vector(&self, sorted: bool) -> Result<Vec<Vec<f64>>, SGError>
    {
        if self.mode != StretchingMode::Discrete
        {
            return Err(SGError::UnsupportedTransform("coordinate vectors exist only for discrete stretching".to_owned()));
        }
        let mut r = Vec::with_capacity(self.dim());
        for (d, str1d) in self.dimensions.iter().enumerate()
        {
            let elems = (1usize << str1d.discrete_level.unwrap_or(0)) - 1;
            let mut vec = Vec::with_capacity(elems + 2);
            vec.push(self.bounding_box.lower(d));
            vec.extend(str1d.lookup[..elems].iter().map(|entry| entry[0]));
            vec.push(self.bounding_box.upper(d));
            if sorted
            {
                vec.sort_by(f64::total_cmp);
            }
            r.push(vec);
        }
        Ok(r)
    }
}
