use serde::{Deserialize, Serialize};

use crate::errors::SGError;

use super::{full_grid::FullGrid, operator::MultigridOperator, transfer::{prolongation, restriction}, vector::{l2_norm, scalar_product, vect_add_mul, vect_diff, vect_set_value}};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultigridOptions
{
    /// Initial number of smoothing sweeps before restriction.
    pub pre_smoothing: usize,
    /// Initial number of smoothing sweeps after prolongation.
    pub post_smoothing: usize,
    /// Upper bound on V-cycles (or smoothing/CG iterations).
    pub max_iterations: usize,
    /// Without a hierarchy the solver only works on the finest grid.
    pub create_hierarchy: bool,
    /// Raise the sweep counts when a cycle fails to reduce the residual.
    pub adapt_smoothing: bool,
    /// Return [`SGError::NoConvergence`] instead of an unconverged report.
    pub fail_on_divergence: bool,
}

impl Default for MultigridOptions
{
    fn default() -> Self {
        Self { pre_smoothing: 2, post_smoothing: 2, max_iterations: 100, create_hierarchy: true, adapt_smoothing: true, fail_on_divergence: false }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolveReport
{
    pub iterations: usize,
    /// L2 norm of `A u - rhs` on the finest grid.
    pub residual: f64,
    pub converged: bool,
}

struct Level
{
    operator: Box<dyn MultigridOperator>,
    unknowns: Vec<f64>,
    correction: Vec<f64>,
    rhs: Vec<f64>,
}

impl Level
{
    fn new(operator: Box<dyn MultigridOperator>) -> Self
    {
        let n = operator.full_grid().nr_elements() * operator.nr_space();
        let rhs = operator.rhs();
        Self { operator, unknowns: vec![0.0; n], correction: vec![0.0; n], rhs }
    }

    #[inline]
    fn grid(&self) -> &FullGrid
    {
        self.operator.full_grid()
    }
}

///
/// Correction scheme multigrid over a hierarchy of nested full grids. Level 0 is the finest.
///
pub struct Multigrid
{
    levels: Vec<Level>,
    options: MultigridOptions,
    pre_smoothing: usize,
    post_smoothing: usize,
}

impl Multigrid
{
    ///
    /// Builds the hierarchy below `operator`: while some axis holds more than three points, the
    /// axes with the largest point count lose one level.
    ///
    pub fn new(operator: Box<dyn MultigridOperator>, options: MultigridOptions) -> Result<Self, SGError>
    {
        let mut levels = vec![Level::new(operator)];
        if options.create_hierarchy
        {
            loop
            {
                let Some(coarsest) = levels.last() else { break };
                let grid = coarsest.grid();
                let max_points = (0..grid.dim()).map(|d| grid.length(d)).max().unwrap_or(0);
                if max_points <= 3
                {
                    break;
                }
                let coarse_levels: Vec<u32> = (0..grid.dim()).map(|d|
                    if grid.length(d) >= max_points { grid.level(d) - 1 } else { grid.level(d) }).collect();
                let coarse = grid.with_levels(&coarse_levels)?;
                let operator = coarsest.operator.coarsen(coarse);
                levels.push(Level::new(operator));
            }
        }
        log::debug!("multigrid hierarchy with {} levels, finest {:?}, coarsest {:?}", levels.len(),
            levels.first().map(|l| l.grid().levels().to_vec()), levels.last().map(|l| l.grid().levels().to_vec()));
        let (pre_smoothing, post_smoothing) = (options.pre_smoothing, options.post_smoothing);
        Ok(Self { levels, options, pre_smoothing, post_smoothing })
    }

    #[inline]
    pub fn depth(&self) -> usize
    {
        self.levels.len()
    }

    pub fn full_grid(&self, depth: usize) -> Option<&FullGrid>
    {
        self.levels.get(depth).map(|l| l.grid())
    }

    /// Current (possibly adapted) sweep counts `(pre, post)`.
    pub fn smoothing_counts(&self) -> (usize, usize)
    {
        (self.pre_smoothing, self.post_smoothing)
    }

    fn load(&mut self, unknowns: &[f64]) -> Result<(), SGError>
    {
        let expected = self.levels[0].unknowns.len();
        if unknowns.len() != expected
        {
            return Err(SGError::SizeMismatch { expected, actual: unknowns.len() });
        }
        self.levels[0].unknowns.copy_from_slice(unknowns);
        Ok(())
    }

    fn residual(&mut self) -> f64
    {
        let finest = &mut self.levels[0];
        finest.operator.multiply(&finest.unknowns, &mut finest.correction);
        vect_diff(&mut finest.correction, &finest.rhs);
        l2_norm(&finest.correction)
    }

    fn finish(&self, name: &str, iterations: usize, residual: f64, tol: f64) -> Result<SolveReport, SGError>
    {
        let converged = residual <= tol;
        if converged
        {
            log::info!("{}: converged after {} iterations, residual {:e}", name, iterations, residual);
        }
        else
        {
            log::warn!("{}: no convergence after {} iterations, residual {:e} > {:e}", name, iterations, residual, tol);
            if self.options.fail_on_divergence
            {
                return Err(SGError::NoConvergence { iterations, residual });
            }
        }
        Ok(SolveReport { iterations, residual, converged })
    }

    ///
    /// Restricts the residual of `level` into the right hand side of `level + 1` and clears the
    /// coarse unknowns.
    ///
    fn restrict_residual(&mut self, level: usize) -> Result<(), SGError>
    {
        let (fine_levels, coarse_levels) = self.levels.split_at_mut(level + 1);
        let fine = &mut fine_levels[level];
        let coarse = &mut coarse_levels[0];
        fine.operator.smooth(self.pre_smoothing, &mut fine.unknowns, &fine.rhs);
        fine.operator.multiply(&fine.unknowns, &mut fine.correction);
        vect_diff(&mut fine.correction, &fine.rhs);
        restriction(fine.operator.full_grid(), &fine.correction, -1.0, coarse.operator.full_grid(), &mut coarse.rhs, 0.0, fine.operator.nr_space())?;
        vect_set_value(&mut coarse.unknowns, 0.0);
        Ok(())
    }

    ///
    /// Interpolates the coarse unknowns of `level + 1` as correction of `level` and post-smooths.
    ///
    fn prolongate_correction(&mut self, level: usize) -> Result<(), SGError>
    {
        let (fine_levels, coarse_levels) = self.levels.split_at_mut(level + 1);
        let fine = &mut fine_levels[level];
        let coarse = &coarse_levels[0];
        prolongation(fine.operator.full_grid(), &mut fine.correction, 0.0, coarse.operator.full_grid(), &coarse.unknowns, 1.0, fine.operator.nr_space())?;
        vect_add_mul(1.0, &mut fine.unknowns, 1.0, &fine.correction);
        fine.operator.smooth(self.post_smoothing, &mut fine.unknowns, &fine.rhs);
        Ok(())
    }

    ///
    /// V-cycle restricted to the levels `top..depth`.
    ///
    fn v_cycle(&mut self, top: usize) -> Result<(), SGError>
    {
        let depth = self.depth();
        for level in top..depth - 1
        {
            self.restrict_residual(level)?;
        }
        let coarsest = &mut self.levels[depth - 1];
        coarsest.operator.smooth(self.pre_smoothing + self.post_smoothing, &mut coarsest.unknowns, &coarsest.rhs);
        for level in (top..depth - 1).rev()
        {
            self.prolongate_correction(level)?;
        }
        Ok(())
    }

    ///
    /// Nested iteration: starting on the coarsest grid, each level is solved approximately with a
    /// V-cycle and interpolated as the initial guess of the next finer level.
    ///
    fn make_full_multigrid(&mut self) -> Result<(), SGError>
    {
        let smoothing = self.pre_smoothing + self.post_smoothing;
        for level in self.levels.iter_mut().skip(1)
        {
            level.rhs = level.operator.rhs();
            vect_set_value(&mut level.unknowns, 0.0);
        }
        for depth in (1..self.depth()).rev()
        {
            self.v_cycle(depth)?;
            let (fine_levels, coarse_levels) = self.levels.split_at_mut(depth);
            let fine = &mut fine_levels[depth - 1];
            let coarse = &coarse_levels[0];
            prolongation(fine.operator.full_grid(), &mut fine.unknowns, 0.0, coarse.operator.full_grid(), &coarse.unknowns, 1.0, coarse.operator.nr_space())?;
            fine.operator.smooth(smoothing, &mut fine.unknowns, &fine.rhs);
        }
        Ok(())
    }

    ///
    /// Correction scheme V-cycles until the residual drops below `tol`. With `full_mg` the
    /// initial guess is replaced by a full multigrid start.
    ///
    pub fn solve_cs(&mut self, unknowns: &mut [f64], tol: f64, full_mg: bool) -> Result<SolveReport, SGError>
    {
        self.load(unknowns)?;
        log::info!("solve_cs: {} levels, tolerance {:e}", self.depth(), tol);
        if full_mg
        {
            self.make_full_multigrid()?;
        }
        let mut error = self.residual();
        log::debug!("solve_cs: initial residual {:e}", error);
        let mut cycle = 0;
        while error > tol && cycle < self.options.max_iterations
        {
            self.v_cycle(0)?;
            let error_act = self.residual();
            log::debug!("solve_cs: v-cycle {} residual {:e}", cycle, error_act);
            if self.options.adapt_smoothing
            {
                if error_act > error
                {
                    self.post_smoothing *= 2;
                    self.pre_smoothing += 1;
                    log::warn!("solve_cs: residual grew, smoothing raised to ({}, {})", self.pre_smoothing, self.post_smoothing);
                }
                if cycle >= 10 && cycle % 10 == 0
                {
                    self.post_smoothing += 2;
                    self.pre_smoothing += 1;
                    log::warn!("solve_cs: slow convergence, smoothing raised to ({}, {})", self.pre_smoothing, self.post_smoothing);
                }
            }
            error = error_act;
            cycle += 1;
        }
        unknowns.copy_from_slice(&self.levels[0].unknowns);
        self.finish("solve_cs", cycle, error, tol)
    }

    pub fn full_multigrid(&mut self, unknowns: &mut [f64], tol: f64) -> Result<SolveReport, SGError>
    {
        self.solve_cs(unknowns, tol, true)
    }

    ///
    /// Plain smoothing on the finest grid, one sweep per iteration.
    ///
    pub fn solve_smoothing(&mut self, unknowns: &mut [f64], tol: f64) -> Result<SolveReport, SGError>
    {
        self.load(unknowns)?;
        log::info!("solve_smoothing: tolerance {:e}", tol);
        let mut error = self.residual();
        let mut iteration = 0;
        while error > tol && iteration < self.options.max_iterations
        {
            let finest = &mut self.levels[0];
            finest.operator.smooth(1, &mut finest.unknowns, &finest.rhs);
            error = self.residual();
            log::debug!("solve_smoothing: iteration {} residual {:e}", iteration, error);
            iteration += 1;
        }
        unknowns.copy_from_slice(&self.levels[0].unknowns);
        self.finish("solve_smoothing", iteration, error, tol)
    }

    ///
    /// Conjugate gradients on the finest grid. Requires a symmetric positive definite operator.
    ///
    pub fn solve_cg(&mut self, unknowns: &mut [f64], tol: f64) -> Result<SolveReport, SGError>
    {
        self.load(unknowns)?;
        log::info!("solve_cg: tolerance {:e}", tol);
        let finest = &mut self.levels[0];
        let n = finest.unknowns.len();
        // r = rhs - A u
        let mut r = vec![0.0; n];
        finest.operator.multiply(&finest.unknowns, &mut r);
        vect_add_mul(-1.0, &mut r, 1.0, &finest.rhs);
        let mut p = r.clone();
        let mut ap = vec![0.0; n];
        let mut rs_old = scalar_product(&r, &r);
        let mut error = rs_old.sqrt();
        let mut iteration = 0;
        while error > tol && iteration < self.options.max_iterations
        {
            finest.operator.multiply(&p, &mut ap);
            let alpha = rs_old / scalar_product(&p, &ap);
            vect_add_mul(1.0, &mut finest.unknowns, alpha, &p);
            vect_add_mul(1.0, &mut r, -alpha, &ap);
            let rs_new = scalar_product(&r, &r);
            error = rs_new.sqrt();
            iteration += 1;
            log::debug!("solve_cg: iteration {} residual {:e}", iteration, error);
            if error <= tol
            {
                break;
            }
            vect_add_mul(rs_new / rs_old, &mut p, 1.0, &r);
            rs_old = rs_new;
        }
        unknowns.copy_from_slice(&finest.unknowns);
        self.finish("solve_cg", iteration, error, tol)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::{domain::{bounding_box::BoundingBox1D, stretching::{Stretching, StretchingType}}, multigrid::operator::LaplaceOperator};

    fn poisson(levels: &[u32], has_boundary: &[bool]) -> Multigrid
    {
        let grid = FullGrid::new(levels, has_boundary).unwrap();
        Multigrid::new(Box::new(LaplaceOperator::with_source(grid, |_: &[f64]| 1.0)), MultigridOptions::default()).unwrap()
    }

    #[test]
    fn check_hierarchy()
    {
        let mg = poisson(&[4, 2], &[true, true]);
        let levels: Vec<Vec<u32>> = (0..mg.depth()).map(|d| mg.full_grid(d).unwrap().levels().to_vec()).collect();
        assert_eq!(levels, vec![vec![4, 2], vec![3, 2], vec![2, 2], vec![1, 1]]);
        let mg = poisson(&[3, 3], &[false, false]);
        assert_eq!(mg.depth(), 2);
        let options = MultigridOptions { create_hierarchy: false, ..Default::default() };
        let grid = FullGrid::new(&[4], &[true]).unwrap();
        let mg = Multigrid::new(Box::new(LaplaceOperator::with_source(grid, |_: &[f64]| 1.0)), options).unwrap();
        assert_eq!(mg.depth(), 1);
    }

    #[test]
    fn check_v_cycle_convergence()
    {
        for (levels, boundary, max_cycles) in [(vec![6], vec![true], 15), (vec![4, 4], vec![false, false], 20), (vec![4, 3], vec![true, true], 15)]
        {
            let mut mg = poisson(&levels, &boundary);
            let n = mg.full_grid(0).unwrap().nr_elements();
            let mut u = vec![0.0; n];
            let report = mg.solve_cs(&mut u, 1e-8, false).unwrap();
            assert!(report.converged, "{:?} {:?}", levels, report);
            assert!(report.iterations <= max_cycles, "{:?} {:?}", levels, report);
            assert!(report.residual <= 1e-8);
        }
    }

    #[test]
    fn check_one_dimensional_solution()
    {
        // -u'' = 1, u(0) = u(1) = 0 has the solution x (1 - x) / 2, reproduced exactly at the nodes
        let mut mg = poisson(&[5], &[true]);
        let grid = mg.full_grid(0).unwrap().clone();
        let mut u = vec![0.0; grid.nr_elements()];
        mg.solve_cs(&mut u, 1e-10, false).unwrap();
        for (j, &value) in u.iter().enumerate()
        {
            let x = grid.coordinate(0, j);
            assert!((value - 0.5 * x * (1.0 - x)).abs() < 1e-9);
        }
    }

    #[test]
    fn check_full_multigrid()
    {
        let mut mg = poisson(&[5, 5], &[true, true]);
        let n = mg.full_grid(0).unwrap().nr_elements();
        let mut u = vec![0.0; n];
        let report = mg.full_multigrid(&mut u, 1e-8).unwrap();
        assert!(report.converged);
        let mut plain = poisson(&[5, 5], &[true, true]);
        let mut v = vec![0.0; n];
        let plain_report = plain.solve_cs(&mut v, 1e-8, false).unwrap();
        assert!(report.iterations <= plain_report.iterations + 1);
    }

    #[test]
    fn check_stretched_convergence()
    {
        let stretching = Stretching::new(vec![BoundingBox1D::new(1.0, 5.0), BoundingBox1D::new(0.0, 1.0)],
            &[StretchingType::Log, StretchingType::None]).unwrap();
        for boundary in [true, false]
        {
            let grid = FullGrid::new(&[5, 4], &[boundary, boundary]).unwrap().with_stretching(stretching.clone()).unwrap();
            let mut mg = Multigrid::new(Box::new(LaplaceOperator::with_source(grid, |_: &[f64]| 1.0)), MultigridOptions::default()).unwrap();
            let n = mg.full_grid(0).unwrap().nr_elements();
            let mut u = vec![0.0; n];
            let report = mg.solve_cs(&mut u, 1e-8, false).unwrap();
            assert!(report.converged, "{:?}", report);
        }
    }

    #[test]
    fn check_smoothing_and_cg()
    {
        let mut mg = poisson(&[3, 3], &[false, false]);
        let n = mg.full_grid(0).unwrap().nr_elements();
        let mut u = vec![0.0; n];
        let report = mg.solve_cg(&mut u, 1e-10).unwrap();
        assert!(report.converged);
        assert!(report.iterations <= n);
        // Gauss-Seidel alone reduces the residual slowly but steadily
        let mut v = vec![0.0; n];
        let mut smoother = poisson(&[3, 3], &[false, false]);
        let smoothing = smoother.solve_smoothing(&mut v, 1e-2).unwrap();
        assert!(smoothing.converged, "{:?}", smoothing);
        assert!(smoothing.iterations > 5);
    }

    #[test]
    fn check_iteration_limit()
    {
        let grid = FullGrid::new(&[6], &[true]).unwrap();
        let options = MultigridOptions { max_iterations: 2, fail_on_divergence: true, ..Default::default() };
        let mut mg = Multigrid::new(Box::new(LaplaceOperator::with_source(grid.clone(), |_: &[f64]| 1.0)), options).unwrap();
        let mut u = vec![0.0; grid.nr_elements()];
        assert!(matches!(mg.solve_cs(&mut u, 1e-14, false), Err(SGError::NoConvergence { iterations: 2, .. })));
        let options = MultigridOptions { max_iterations: 2, ..Default::default() };
        let mut mg = Multigrid::new(Box::new(LaplaceOperator::with_source(grid, |_: &[f64]| 1.0)), options).unwrap();
        let report = mg.solve_cs(&mut u, 1e-14, false).unwrap();
        assert!(!report.converged);
        assert_eq!(report.iterations, 2);
        assert_eq!(mg.solve_cs(&mut [0.0; 3], 1e-8, false), Err(SGError::SizeMismatch { expected: 65, actual: 3 }));
    }
}
