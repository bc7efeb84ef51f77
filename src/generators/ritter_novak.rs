//!
//! Adaptive grid generation after Ritter and Novak: refine the point that minimizes a
//! trade-off between its hierarchical depth and the rank of its objective value.
//!
use indexmap::IndexSet;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use crate::{errors::SGError, storage::{GridPoint, SparseGridData}};

///
/// Function to be sampled during adaptive generation. `x` is given in the physical
/// coordinates of the storage's bounding box.
///
pub trait Objective : Send + Sync
{
    fn dim(&self) -> usize;
    fn eval(&self, x: &[f64]) -> f64;
}

///
/// Wraps a closure as an [`Objective`].
///
pub struct FnObjective<F: Fn(&[f64]) -> f64 + Send + Sync>
{
    dim: usize,
    f: F,
}

impl<F: Fn(&[f64]) -> f64 + Send + Sync> FnObjective<F>
{
    pub fn new(dim: usize, f: F) -> Self
    {
        Self { dim, f }
    }
}

impl<F: Fn(&[f64]) -> f64 + Send + Sync> Objective for FnObjective<F>
{
    fn dim(&self) -> usize
    {
        self.dim
    }

    fn eval(&self, x: &[f64]) -> f64
    {
        (self.f)(x)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RitterNovakOptions
{
    /// Upper bound on the number of grid points.
    pub max_points: usize,
    /// Weight between level (alpha -> 1) and objective rank (alpha -> 0).
    pub alpha: f64,
    /// Points whose next child would exceed this level are not refined.
    pub max_level: u32,
}

impl Default for RitterNovakOptions
{
    fn default() -> Self {
        Self { max_points: 100, alpha: 0.85, max_level: 20 }
    }
}

///
/// Multiple refinement: per dimension, the first missing descendant along the chain of
/// nearest left (right) neighbors is created together with its missing ancestors.
///
pub(crate) struct MultipleRefinement;

impl MultipleRefinement
{
    fn create_point(&self, storage: &mut SparseGridData, point: GridPoint) -> Result<(), SGError>
    {
        for dim in 0..storage.num_inputs()
        {
            self.create_point_1d(point.clone(), storage, dim)?;
        }
        if !storage.contains(&point)
        {
            storage.insert_point(point)?;
        }
        Ok(())
    }

    fn create_gridpoint_internal(&self, storage: &mut SparseGridData, mut point: GridPoint) -> Result<(), SGError>
    {
        if let Some(seq) = storage.index_of(&point)
        {
            storage.set_is_leaf(seq, false);
            Ok(())
        }
        else
        {
            point.set_is_leaf(false);
            self.create_point(storage, point)
        }
    }

    fn create_point_1d(&self, point: GridPoint, storage: &mut SparseGridData, dim: usize) -> Result<(), SGError>
    {
        if let Some(parent) = point.parent(dim)
        {
            self.create_gridpoint_internal(storage, parent)?;
        }
        Ok(())
    }

    ///
    /// Walks the left (`offset == -1`) or right (`offset == 1`) descendant chain of `point` in
    /// `dim` and returns the first point of the chain that is not in `storage`.
    ///
    fn first_missing_descendant(storage: &SparseGridData, point: &GridPoint, dim: usize, offset: i64) -> (GridPoint, u32)
    {
        let (level, index) = point.get(dim);
        let mut child = point.clone();
        let (mut child_level, mut child_index) = (level as u32, index as i64);
        loop
        {
            child_index *= 2;
            child_level += 1;
            child.set(dim, child_level as u8, (child_index + offset) as u32);
            if !storage.contains(&child) || child_level >= u8::MAX as u32
            {
                return (child, child_level);
            }
        }
    }

    ///
    /// Directions `(offset)` in which `point` can be refined along `dim`. Boundary nodes only
    /// refine towards the domain interior.
    ///
    fn chain_offsets(point: &GridPoint, dim: usize) -> impl Iterator<Item = i64>
    {
        let (level, index) = point.get(dim);
        let left = level > 0 || index == 1;
        let right = level > 0 || index == 0;
        [(left, -1), (right, 1)].into_iter().filter(|(enabled, _)| *enabled).map(|(_, offset)| offset)
    }

    pub(crate) fn exceeds_max_level(storage: &SparseGridData, point: &GridPoint, max_level: u32) -> bool
    {
        (0..storage.num_inputs()).any(|dim|
            Self::chain_offsets(point, dim).any(|offset| Self::first_missing_descendant(storage, point, dim, offset).1 > max_level))
    }

    pub(crate) fn refine_gridpoint(&self, storage: &mut SparseGridData, seq: usize) -> Result<(), SGError>
    {
        let point = storage.get(seq)?;
        storage.set_is_leaf(seq, false);
        for dim in 0..storage.num_inputs()
        {
            for offset in Self::chain_offsets(&point, dim)
            {
                let (mut child, _) = Self::first_missing_descendant(storage, &point, dim, offset);
                child.set_is_leaf(true);
                self.create_point(storage, child)?;
            }
        }
        Ok(())
    }
}

fn evaluate_objective(storage: &SparseGridData, objective: &dyn Objective, range: std::ops::Range<usize>) -> Vec<f64>
{
    let eval = |seq: usize| objective.eval(&storage.bounding_box.to_real_coordinate(&storage.unit_coordinate(seq)));
    #[cfg(feature = "rayon")]
    {
        range.into_par_iter().map(eval).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        range.map(eval).collect()
    }
}

///
/// Generates an adaptive grid for `objective` starting from the regular level-1 grid and returns
/// the objective values at the grid points (parallel to the sequence numbers).
///
pub fn ritter_novak(storage: &mut SparseGridData, objective: &dyn Objective, options: &RitterNovakOptions) -> Result<Vec<f64>, SGError>
{
    if objective.dim() != storage.num_inputs()
    {
        return Err(SGError::DimensionMismatch { expected: storage.num_inputs(), actual: objective.dim() });
    }
    super::regular(storage, 1, None)?;
    let refinement = MultipleRefinement;
    let mut fx = evaluate_objective(storage, objective, 0..storage.len());
    let mut degree = vec![0usize; storage.len()];
    let mut level_sum: Vec<u32> = (0..storage.len()).map(|seq| storage.level_sum(seq)).collect();
    let mut ignore = vec![false; storage.len()];
    let mut order: Vec<usize> = (0..storage.len()).collect();
    order.sort_by(|&a, &b| fx[a].total_cmp(&fx[b]));
    let mut rank = vec![0usize; storage.len()];
    for (position, &seq) in order.iter().enumerate()
    {
        rank[seq] = position;
    }

    let mut iteration = 0;
    while storage.len() < options.max_points
    {
        let current_len = storage.len();
        let mut best: Option<(usize, f64)> = None;
        for i in 0..current_len
        {
            if ignore[i]
            {
                continue;
            }
            let g = ((level_sum[i] as usize + degree[i]) as f64 + 1.0).powf(options.alpha)
                * (rank[i] as f64 + 1.0).powf(1.0 - options.alpha);
            if best.map_or(true, |(_, g_best)| g < g_best)
            {
                if MultipleRefinement::exceeds_max_level(storage, &storage.point(i), options.max_level)
                {
                    ignore[i] = true;
                    continue;
                }
                best = Some((i, g));
            }
        }
        let Some((i_best, _)) = best else {
            log::warn!("ritter-novak: no refinable point left after {} iterations ({} points)", iteration, current_len);
            break;
        };
        degree[i_best] += 1;
        refinement.refine_gridpoint(storage, i_best)?;
        let new_len = storage.len();
        if new_len == current_len
        {
            log::warn!("ritter-novak: refinement of point {} did not add points", i_best);
            break;
        }
        if new_len > options.max_points
        {
            let keep: IndexSet<usize> = (0..current_len).collect();
            storage.remove(&keep);
            break;
        }
        fx.extend(evaluate_objective(storage, objective, current_len..new_len));
        degree.resize(new_len, 0);
        ignore.resize(new_len, false);
        level_sum.extend((current_len..new_len).map(|seq| storage.level_sum(seq)));
        for seq in current_len..new_len
        {
            let position = order.partition_point(|&j| fx[j] <= fx[seq]);
            order.insert(position, seq);
        }
        rank.resize(new_len, 0);
        for (position, &seq) in order.iter().enumerate()
        {
            rank[seq] = position;
        }
        iteration += 1;
    }
    fx.truncate(storage.len());
    log::debug!("ritter-novak: {} points after {} iterations", storage.len(), iteration);
    Ok(fx)
}
