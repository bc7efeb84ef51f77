use std::sync::Arc;

use super::full_grid::FullGrid;

///
/// Discretized problem on one full grid of the multigrid hierarchy. Vectors hold
/// `nr_space()` unknowns per grid point.
///
pub trait MultigridOperator : Send + Sync
{
    fn full_grid(&self) -> &FullGrid;

    fn nr_space(&self) -> usize
    {
        1
    }

    /// Right hand side of the discretized problem.
    fn rhs(&self) -> Vec<f64>;

    /// `y = A x`
    fn multiply(&self, x: &[f64], y: &mut [f64]);

    /// `sweeps` smoothing iterations for `A u = rhs`.
    fn smooth(&self, sweeps: usize, unknowns: &mut [f64], rhs: &[f64]);

    /// Same problem discretized on `grid`.
    fn coarsen(&self, grid: FullGrid) -> Box<dyn MultigridOperator>;
}

pub type GridFunction = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

///
/// Three point finite differences for `-Δu = f` on a (possibly stretched) full grid. Points on
/// the boundary faces of axes that include their boundary carry the Dirichlet condition
/// `u = g`; axes without boundary points use homogeneous conditions at the domain ends.
///
#[derive(Clone)]
pub struct LaplaceOperator
{
    grid: FullGrid,
    source: GridFunction,
    boundary: GridFunction,
    stencil: Vec<Option<Stencil>>,
}

#[derive(Clone, Debug)]
struct Stencil
{
    diagonal: f64,
    neighbors: Vec<(usize, f64)>,
}

impl LaplaceOperator
{
    pub fn new(grid: FullGrid, source: GridFunction, boundary: GridFunction) -> Self
    {
        let stencil = (0..grid.nr_elements()).map(|linear| Self::stencil(&grid, linear)).collect();
        Self { grid, source, boundary, stencil }
    }

    ///
    /// Homogeneous Dirichlet conditions.
    ///
    pub fn with_source<F: Fn(&[f64]) -> f64 + Send + Sync + 'static>(grid: FullGrid, source: F) -> Self
    {
        Self::new(grid, Arc::new(source), Arc::new(|_: &[f64]| 0.0))
    }

    fn stencil(grid: &FullGrid, linear: usize) -> Option<Stencil>
    {
        if grid.is_boundary_point(linear)
        {
            return None;
        }
        let multi_index = grid.multi_index(linear);
        let mut diagonal = 0.0;
        let mut neighbors = Vec::with_capacity(2 * grid.dim());
        for (d, &j) in multi_index.iter().enumerate()
        {
            let (lower, upper) = grid.domain(d);
            let x = grid.coordinate(d, j);
            let left = if j > 0 { grid.coordinate(d, j - 1) } else { lower };
            let right = if j + 1 < grid.length(d) { grid.coordinate(d, j + 1) } else { upper };
            let (h_left, h_right) = (x - left, right - x);
            let scale = 2.0 / (h_left + h_right);
            if j > 0
            {
                neighbors.push((linear - grid.offset(d), -scale / h_left));
            }
            if j + 1 < grid.length(d)
            {
                neighbors.push((linear + grid.offset(d), -scale / h_right));
            }
            diagonal += scale / h_left + scale / h_right;
        }
        Some(Stencil { diagonal, neighbors })
    }
}

impl MultigridOperator for LaplaceOperator
{
    fn full_grid(&self) -> &FullGrid
    {
        &self.grid
    }

    fn rhs(&self) -> Vec<f64>
    {
        (0..self.grid.nr_elements()).map(|linear|
        {
            let x = self.grid.point(linear);
            match self.stencil[linear]
            {
                Some(_) => (self.source)(&x),
                None => (self.boundary)(&x),
            }
        }).collect()
    }

    fn multiply(&self, x: &[f64], y: &mut [f64])
    {
        for (linear, stencil) in self.stencil.iter().enumerate()
        {
            y[linear] = match stencil
            {
                Some(s) => s.diagonal * x[linear] + s.neighbors.iter().map(|&(k, w)| w * x[k]).sum::<f64>(),
                None => x[linear],
            };
        }
    }

    fn smooth(&self, sweeps: usize, unknowns: &mut [f64], rhs: &[f64])
    {
        for _ in 0..sweeps
        {
            for (linear, stencil) in self.stencil.iter().enumerate()
            {
                unknowns[linear] = match stencil
                {
                    Some(s) => (rhs[linear] - s.neighbors.iter().map(|&(k, w)| w * unknowns[k]).sum::<f64>()) / s.diagonal,
                    None => rhs[linear],
                };
            }
        }
    }

    fn coarsen(&self, grid: FullGrid) -> Box<dyn MultigridOperator>
    {
        Box::new(Self::new(grid, self.source.clone(), self.boundary.clone()))
    }
}
