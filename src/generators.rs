//!
//! Grid generators filling an empty [`SparseGridData`].
//!
//! The iterative generators build the 1-D grid in the first dimension and then, for each further
//! dimension, walk a snapshot of the current points and extend each of them in the new direction:
//! the first new level/index pair overwrites the existing slot, all others are appended.
//!
use serde::{Deserialize, Serialize};
use crate::{errors::SGError, storage::{GridPoint, SparseGridData}};

pub mod ritter_novak;

///
/// Serializable description of a grid construction, for storing generation parameters
/// next to a grid.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GridGeneration
{
    Regular { level: usize, t: Option<f64> },
    RegularAnisotropic { levels: Vec<usize>, t: Option<f64> },
    Cliques { level: usize, clique_size: usize, t: Option<f64> },
    Full { level: usize },
    AnisotropicFull { levels: Vec<usize> },
    FullWithBoundaries { level: usize },
    RegularWithBoundaries { level: usize, boundary_level: usize },
    Periodic { level: usize, t: Option<f64> },
    SquareRoot { level: usize },
    Truncated { level: usize, k: usize },
}

impl GridGeneration
{
    pub fn generate(&self, storage: &mut SparseGridData) -> Result<(), SGError>
    {
        match self
        {
            GridGeneration::Regular { level, t } => regular(storage, *level, *t),
            GridGeneration::RegularAnisotropic { levels, t } => regular_anisotropic(storage, levels, *t),
            GridGeneration::Cliques { level, clique_size, t } => cliques(storage, *level, *clique_size, *t),
            GridGeneration::Full { level } => full(storage, *level),
            GridGeneration::AnisotropicFull { levels } => anisotropic_full(storage, levels),
            GridGeneration::FullWithBoundaries { level } => full_with_boundaries(storage, *level),
            GridGeneration::RegularWithBoundaries { level, boundary_level } => regular_with_boundaries(storage, *level, *boundary_level),
            GridGeneration::Periodic { level, t } => periodic(storage, *level, *t),
            GridGeneration::SquareRoot { level } => square_root(storage, *level),
            GridGeneration::Truncated { level, k } => truncated(storage, *level, *k),
        }
    }
}

fn ensure_empty(storage: &SparseGridData) -> Result<(), SGError>
{
    if !storage.is_empty()
    {
        return Err(SGError::StorageNotEmpty);
    }
    Ok(())
}

///
/// Appends all inner points of levels `1..=n` in dimension 0 of `point`.
///
fn first_dimension(storage: &mut SparseGridData, point: &mut GridPoint, n: u32) -> Result<(), SGError>
{
    for l in 1..=n
    {
        for i in (1..(1u32 << l)).step_by(2)
        {
            point.set(0, l as u8, i);
            point.set_is_leaf(l == n);
            storage.insert_point(point.clone())?;
        }
    }
    Ok(())
}

///
/// Writes `point` into slot `g` the first time it is called for a slot, appends otherwise.
///
#[inline]
fn emit(storage: &mut SparseGridData, point: &GridPoint, g: usize, first: &mut bool) -> Result<(), SGError>
{
    if *first
    {
        storage.update(point.clone(), g)?;
        *first = false;
    }
    else
    {
        storage.insert_point(point.clone())?;
    }
    Ok(())
}

///
/// Generates a regular sparse grid of level `level`, without boundaries.
/// For details about T, See pages 8-9 of Griebel and Knapek's "Optimized
/// Tensor-Product Approximation Spaces".
///
pub fn regular(storage: &mut SparseGridData, level: usize, t: Option<f64>) -> Result<(), SGError>
{
    let levels = vec![level; storage.num_inputs()];
    regular_anisotropic(storage, &levels, t)
}

///
/// Regular sparse grid with an individual maximum level per dimension.
///
pub fn regular_anisotropic(storage: &mut SparseGridData, levels: &[usize], t: Option<f64>) -> Result<(), SGError>
{
    ensure_empty(storage)?;
    let dim = storage.num_inputs();
    if dim == 0
    {
        return Ok(());
    }
    if levels.len() != dim
    {
        return Err(SGError::SizeMismatch { expected: dim, actual: levels.len() });
    }
    let t = t.unwrap_or(0.0);
    let mut point = GridPoint::root_point(dim);
    first_dimension(storage, &mut point, levels[0] as u32)?;
    for d in 1..dim
    {
        let ngrids = storage.len();
        let n = levels[d] as u32;
        let upper_bound = (n + dim as u32 - 1) as f64 - t * n as f64;
        for g in 0..ngrids
        {
            let mut first = true;
            let mut point = storage.point(g);
            let level_sum = point.level_sum() - 1;
            let level_max = point.level_max() as u32;
            let mut l = 1u32;
            while (l + level_sum) as f64 - t * l.max(level_max) as f64 <= upper_bound && l.max(level_max) <= n
            {
                for i in (1..(1u32 << l)).step_by(2)
                {
                    point.set(d, l as u8, i);
                    point.set_is_leaf(l + level_sum == n + dim as u32 - 1);
                    emit(storage, &point, g, &mut first)?;
                }
                l += 1;
            }
        }
    }
    log::debug!("regular grid: {} points in {} dimensions", storage.len(), dim);
    Ok(())
}

///
/// Generates a regular sparse grid of level `level`, without boundaries
/// where dimensions are split into groups with only a certain number
/// of dimensions completely connected in a clique.
///
pub fn cliques(storage: &mut SparseGridData, level: usize, clique_size: usize, t: Option<f64>) -> Result<(), SGError>
{
    ensure_empty(storage)?;
    let dim = storage.num_inputs();
    if dim == 0
    {
        return Ok(());
    }
    let clique_size = clique_size.max(1);
    let t = t.unwrap_or(0.0);
    let n = level as u32;
    let mut point = GridPoint::root_point(dim);
    first_dimension(storage, &mut point, n)?;
    let upper_bound = (n + dim as u32 - 1) as f64 - t * n as f64;
    for d in 1..dim
    {
        let ngrids = storage.len();
        let clique_num = d / clique_size;
        for g in 0..ngrids
        {
            let mut first = true;
            let mut point = storage.point(g);
            // points refined outside the current clique are not extended
            if (0..(clique_size * clique_num).min(d)).any(|dt| point.level[dt] > 1)
            {
                continue;
            }
            let level_sum = point.level_sum() - 1;
            let level_max = point.level_max() as u32;
            let mut l = 1u32;
            while (l + level_sum) as f64 - t * l.max(level_max) as f64 <= upper_bound && l.max(level_max) <= n
            {
                for i in (1..(1u32 << l)).step_by(2)
                {
                    point.set(d, l as u8, i);
                    point.set_is_leaf(l + level_sum == n + dim as u32 - 1);
                    emit(storage, &point, g, &mut first)?;
                }
                l += 1;
            }
        }
    }
    log::debug!("clique grid: {} points", storage.len());
    Ok(())
}

///
/// Generates a full grid of 2^`level` tensors, without boundaries
///
pub fn full(storage: &mut SparseGridData, level: usize) -> Result<(), SGError>
{
    let levels = vec![level; storage.num_inputs()];
    anisotropic_full(storage, &levels)
}

///
/// Full grid with maximum level `levels[d]` in dimension `d`. A point is a leaf when every
/// dimension has reached its maximum level.
///
pub fn anisotropic_full(storage: &mut SparseGridData, levels: &[usize]) -> Result<(), SGError>
{
    ensure_empty(storage)?;
    let dim = storage.num_inputs();
    if levels.len() != dim
    {
        return Err(SGError::SizeMismatch { expected: dim, actual: levels.len() });
    }
    if dim == 0
    {
        return Ok(());
    }
    let max_sum: u32 = levels.iter().map(|&l| l as u32).sum();
    let mut point = GridPoint::root_point(dim);
    // with a single dimension the leaf condition reduces to l == levels[0]
    first_dimension(storage, &mut point, levels[0] as u32)?;
    for d in 1..dim
    {
        let ngrids = storage.len();
        let n = levels[d] as u32;
        let remaining: u32 = levels[d+1..].iter().map(|&l| l as u32).sum();
        for g in 0..ngrids
        {
            let mut first = true;
            let mut point = storage.point(g);
            for l in 1..=n
            {
                for i in (1..(1u32 << l)).step_by(2)
                {
                    point.set(d, l as u8, i);
                    let level_sum: u32 = point.level[..=d].iter().map(|&l| l as u32).sum();
                    point.set_is_leaf(level_sum + remaining == max_sum);
                    emit(storage, &point, g, &mut first)?;
                }
            }
        }
    }
    log::debug!("full grid: {} points", storage.len());
    Ok(())
}

///
/// Generates a full grid of level `level`, with boundary grid points.
///
pub fn full_with_boundaries(storage: &mut SparseGridData, level: usize) -> Result<(), SGError>
{
    ensure_empty(storage)?;
    let dim = storage.num_inputs();
    if dim == 0
    {
        return Ok(());
    }
    let n = level as u32;
    let mut point = GridPoint::root_point(dim);
    for l in 1..=n
    {
        if l == 1
        {
            point.set_is_leaf(false);
            point.set(0, 0, 0);
            storage.insert_point(point.clone())?;
            point.set(0, 0, 1);
            storage.insert_point(point.clone())?;
        }
        for i in (1..(1u32 << l)).step_by(2)
        {
            point.set(0, l as u8, i);
            point.set_is_leaf(l == n);
            storage.insert_point(point.clone())?;
        }
    }
    for d in 1..dim
    {
        let ngrids = storage.len();
        for g in 0..ngrids
        {
            let mut first = true;
            let mut point = storage.point(g);
            for l in 1..=n
            {
                if l == 1
                {
                    point.set_is_leaf(false);
                    point.set(d, 0, 0);
                    emit(storage, &point, g, &mut first)?;
                    point.set(d, 0, 1);
                    emit(storage, &point, g, &mut first)?;
                }
                for i in (1..(1u32 << l)).step_by(2)
                {
                    point.set(d, l as u8, i);
                    point.set_is_leaf(point.level_sum() == n * dim as u32);
                    emit(storage, &point, g, &mut first)?;
                }
            }
        }
    }
    storage.set_has_boundary(true);
    log::debug!("full grid with boundaries: {} points", storage.len());
    Ok(())
}

///
/// Generates a regular sparse grid with boundary points. `boundary_level >= 1` selects the
/// truncated variant where boundary points only appear up to level `level + 1 - boundary_level`;
/// `boundary_level == 0` builds the classic grid with `|l|_1 <= level` counting level-0
/// boundary points.
///
pub fn regular_with_boundaries(storage: &mut SparseGridData, level: usize, boundary_level: usize) -> Result<(), SGError>
{
    ensure_empty(storage)?;
    let dim = storage.num_inputs();
    if dim == 0
    {
        return Ok(());
    }
    if boundary_level >= 1
    {
        regular_with_boundaries_iter(storage, level as u32, boundary_level as u32, 0.0)?;
    }
    else
    {
        let mut point = GridPoint::new(&vec![0; dim], &vec![0; dim], false);
        boundaries_rec(storage, &mut point, dim - 1, 0, level as u32)?;
    }
    storage.set_has_boundary(true);
    log::debug!("regular grid with boundaries (boundary level {}): {} points", boundary_level, storage.len());
    Ok(())
}

fn regular_with_boundaries_iter(storage: &mut SparseGridData, n: u32, boundary_level: u32, t: f64) -> Result<(), SGError>
{
    let dim = storage.num_inputs();
    let mut point = GridPoint::root_point(dim);
    point.set_is_leaf(false);
    point.set(0, 0, 0);
    storage.insert_point(point.clone())?;
    point.set(0, 0, 1);
    storage.insert_point(point.clone())?;
    first_dimension(storage, &mut point, n)?;

    for d in 1..dim
    {
        let ngrids = storage.len();
        let cur_dim = d as u32 + 1;
        for g in 0..ngrids
        {
            let mut point = storage.point(g);
            let level_sum: u32 = point.level[..d].iter().map(|&l| l as u32).sum();
            let num_zero_levels = point.level[..d].iter().filter(|&&l| l == 0).count() as u32;

            // boundary functions get an additional zero level in dimension d
            let mut first = true;
            if level_sum + boundary_level + num_zero_levels < n + cur_dim || num_zero_levels == cur_dim - 1
            {
                point.set_is_leaf(false);
                point.set(d, 0, 0);
                emit(storage, &point, g, &mut first)?;
                point.set(d, 0, 1);
                emit(storage, &point, g, &mut first)?;
            }
            let mut upper_bound = if num_zero_levels > 0
            {
                if n + cur_dim < boundary_level + num_zero_levels
                {
                    continue;
                }
                (n + cur_dim - num_zero_levels - boundary_level) as f64
            }
            else
            {
                (n + cur_dim - 1) as f64
            };
            upper_bound -= t * n as f64;
            let level_max = point.level_max() as u32;
            let mut l = 1u32;
            while (l + level_sum) as f64 - t * l.max(level_max) as f64 <= upper_bound && l.max(level_max) <= n
            {
                for i in (1..(1u32 << l)).step_by(2)
                {
                    point.set(d, l as u8, i);
                    point.set_is_leaf(l + level_sum == n + dim as u32 - 1 && num_zero_levels == 0);
                    emit(storage, &point, g, &mut first)?;
                }
                l += 1;
            }
        }
    }
    Ok(())
}

///
/// Recursive construction of the classic boundary grid. Recursion depth is bounded by the
/// dimension plus the level.
///
fn boundaries_rec(storage: &mut SparseGridData, point: &mut GridPoint, current_dim: usize, current_level: u32, level: u32) -> Result<(), SGError>
{
    let (source_level, source_index) = point.get(current_dim);
    if current_level <= level
    {
        let saved_leaf = point.is_leaf();
        let is_leaf = current_level == level;
        if source_level == 0
        {
            for boundary_index in [0, 1]
            {
                point.set(current_dim, 0, boundary_index);
                point.set_is_leaf(is_leaf);
                if current_dim == 0
                {
                    storage.insert_point(point.clone())?;
                }
                else
                {
                    boundaries_rec(storage, point, current_dim - 1, current_level, level)?;
                }
            }
            point.set(current_dim, source_level, source_index);
        }
        else
        {
            point.set_is_leaf(is_leaf);
            if current_dim == 0
            {
                storage.insert_point(point.clone())?;
            }
            else
            {
                boundaries_rec(storage, point, current_dim - 1, current_level, level)?;
            }
        }
        point.set_is_leaf(saved_leaf);
    }
    if current_level < level
    {
        for (l, i) in children(source_level, source_index)
        {
            point.set(current_dim, l, i);
            boundaries_rec(storage, point, current_dim, current_level + 1, level)?;
        }
    }
    point.set(current_dim, source_level, source_index);
    Ok(())
}

///
/// Children used by the recursive generators: the left boundary node expands to the root.
///
#[inline]
fn children(level: u8, index: u32) -> Vec<(u8, u32)>
{
    if level == 0 && index == 0
    {
        vec![(1, 1)]
    }
    else
    {
        vec![(level + 1, 2 * index - 1), (level + 1, 2 * index + 1)]
    }
}

///
/// Generates a regular sparse grid with periodic boundaries: only the left boundary node is
/// stored in every dimension.
///
pub fn periodic(storage: &mut SparseGridData, level: usize, t: Option<f64>) -> Result<(), SGError>
{
    ensure_empty(storage)?;
    if level == 0
    {
        return Err(SGError::InvalidLevel(0));
    }
    let dim = storage.num_inputs();
    if dim == 0
    {
        return Ok(());
    }
    let t = t.unwrap_or(0.0);
    let n = level as u32;
    let mut point = GridPoint::root_point(dim);
    for l in 1..=n
    {
        if l == 1
        {
            point.set_is_leaf(false);
            point.set(0, 0, 0);
            storage.insert_point(point.clone())?;
        }
        for i in (1..(1u32 << l)).step_by(2)
        {
            point.set(0, l as u8, i);
            point.set_is_leaf(l == n);
            storage.insert_point(point.clone())?;
        }
    }
    let upper_bound = (n + dim as u32 - 1) as f64 - t * n as f64;
    for d in 1..dim
    {
        let ngrids = storage.len();
        for g in 0..ngrids
        {
            let mut first = true;
            let mut point = storage.point(g);
            let level_sum = point.level_sum() - 1 + point.level[..d].iter().filter(|&&l| l == 0).count() as u32;
            let level_max = point.level_max() as u32;
            let mut l = 1u32;
            while (l + level_sum) as f64 - t * l.max(level_max) as f64 <= upper_bound && l.max(level_max) <= n
            {
                if l == 1
                {
                    let mut boundary = point.clone();
                    boundary.set(d, 0, 0);
                    boundary.set_is_leaf(false);
                    storage.insert_point(boundary)?;
                }
                for i in (1..(1u32 << l)).step_by(2)
                {
                    point.set(d, l as u8, i);
                    point.set_is_leaf(l + level_sum == n + dim as u32 - 1);
                    emit(storage, &point, g, &mut first)?;
                }
                l += 1;
            }
        }
    }
    storage.set_has_boundary(true);
    log::debug!("periodic grid: {} points", storage.len());
    Ok(())
}

///
/// Generates a square root grid with boundaries: all subspaces where every level is at most
/// `level / 2` plus those where a single level exceeds it, up to `level`.
///
pub fn square_root(storage: &mut SparseGridData, level: usize) -> Result<(), SGError>
{
    ensure_empty(storage)?;
    let dim = storage.num_inputs();
    if dim == 0
    {
        return Ok(());
    }
    let level = level as u32;
    let mut point = GridPoint::new(&vec![0; dim], &vec![0; dim], false);
    square_rec(storage, &mut point, dim - 1, level, level / 2, false, 0)?;
    storage.set_has_boundary(true);
    log::debug!("square root grid: {} points", storage.len());
    Ok(())
}

fn square_rec(storage: &mut SparseGridData, point: &mut GridPoint, current_dim: usize, level: u32, small_level: u32, tail: bool, sum: u32) -> Result<(), SGError>
{
    let (source_level, source_index) = point.get(current_dim);
    let new_tail = tail || source_level as u32 > small_level;
    if source_level == 0
    {
        if current_dim == 0
        {
            point.set_is_leaf(false);
            point.set(0, 0, 0);
            storage.insert_point(point.clone())?;
            point.set(0, 0, 1);
            storage.insert_point(point.clone())?;
        }
        else
        {
            for boundary_index in [0, 1]
            {
                for d in 0..current_dim
                {
                    point.set(d, 0, 0);
                }
                point.set(current_dim, 0, boundary_index);
                square_rec(storage, point, current_dim - 1, level, small_level, new_tail, sum)?;
            }
        }
        point.set(current_dim, source_level, source_index);
    }
    else if current_dim == 0
    {
        // a point is a leaf when one level equals level and all others equal small_level
        point.set_is_leaf(sum == small_level * (storage.num_inputs() as u32 - 1) + level);
        storage.insert_point(point.clone())?;
    }
    else
    {
        for d in 0..current_dim
        {
            point.set(d, 0, 0);
        }
        square_rec(storage, point, current_dim - 1, level, small_level, new_tail, sum)?;
    }

    if (source_level as u32) < small_level || (!tail && (source_level as u32) < level)
    {
        for (l, i) in children(source_level, source_index)
        {
            point.set(current_dim, l, i);
            square_rec(storage, point, current_dim, level, small_level, tail, sum + 1)?;
        }
    }
    Ok(())
}

///
/// Generates a truncated boundary grid containing all points with `l_i < level - k` and
/// `|l|_1 < level + (dim-1)*k`. Levels below `k` do not count towards the level sum.
///
pub fn truncated(storage: &mut SparseGridData, level: usize, k: usize) -> Result<(), SGError>
{
    ensure_empty(storage)?;
    let dim = storage.num_inputs();
    if dim == 0
    {
        return Ok(());
    }
    let (level, k) = (level as u32, k as u32);
    let mut point = GridPoint::new(&vec![0; dim], &vec![0; dim], true);
    trunc_rec(storage, &mut point, dim - 1, dim as u32 * k, level + k * (dim as u32 - 1), k)?;
    storage.set_has_boundary(true);
    log::debug!("truncated grid: {} points", storage.len());
    Ok(())
}

fn trunc_rec(storage: &mut SparseGridData, point: &mut GridPoint, current_dim: usize, current_level: u32, level: u32, min_level: u32) -> Result<(), SGError>
{
    let (source_level, source_index) = point.get(current_dim);
    let saved_leaf = point.is_leaf();
    if current_level <= level
    {
        let mut is_leaf = saved_leaf && (source_level as u32) >= min_level;
        if current_dim == 0 && current_level < level
        {
            is_leaf = false;
        }
        if source_level == 0
        {
            for boundary_index in [0, 1]
            {
                point.set(current_dim, 0, boundary_index);
                point.set_is_leaf(is_leaf);
                if current_dim == 0
                {
                    storage.insert_point(point.clone())?;
                }
                else
                {
                    trunc_rec(storage, point, current_dim - 1, current_level, level, min_level)?;
                }
            }
            point.set(current_dim, source_level, source_index);
        }
        else
        {
            point.set_is_leaf(is_leaf);
            if current_dim == 0
            {
                storage.insert_point(point.clone())?;
            }
            else
            {
                trunc_rec(storage, point, current_dim - 1, current_level, level, min_level)?;
            }
        }
        point.set_is_leaf(saved_leaf);
    }

    // levels below min_level are free, they do not increase the running level sum
    let next_level = if (source_level as u32) < min_level
    {
        Some(current_level)
    }
    else if current_level < level
    {
        Some(current_level + 1)
    }
    else
    {
        None
    };
    if let Some(next_level) = next_level
    {
        for (l, i) in children(source_level, source_index)
        {
            point.set(current_dim, l, i);
            point.set_is_leaf(saved_leaf);
            trunc_rec(storage, point, current_dim, next_level, level, min_level)?;
        }
    }
    point.set(current_dim, source_level, source_index);
    point.set_is_leaf(saved_leaf);
    Ok(())
}
