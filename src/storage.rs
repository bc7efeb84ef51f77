use std::hash::{Hash, Hasher};
use nohash_hasher::BuildNoHashHasher;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use bitfield_struct::bitfield;
use crate::domain::bounding_box::BoundingBox;
use crate::errors::SGError;

pub type FastU64Map<V> = std::collections::HashMap<u64, V, BuildNoHashHasher<u64>>;

#[bitfield(u8, new=false)]
#[derive(Serialize, Deserialize, PartialEq, Eq)]
pub struct GridPointFlags
{
    pub is_leaf: bool,
    pub is_inner: bool,
    #[bits(6)]
    pub _empty: u8
}

impl GridPointFlags
{
    pub fn new(level: &[u8], is_leaf: bool) -> Self
    {
        let mut r = Self::default();
        r.set_is_leaf(is_leaf);
        r.set_is_inner(!level.contains(&0));
        r
    }

    pub fn update_is_inner(&mut self, level: &[u8])
    {
        self.set_is_inner(!level.contains(&0));
    }
}

///
/// A multi-dimensional level/index pair. Two points are equal when their levels and indices
/// match in every dimension; the flags take no part in comparison or hashing.
///
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct GridPoint
{
    pub level: Vec<u8>,
    pub index: Vec<u32>,
    pub(crate) flags: GridPointFlags,
}

impl Hash for GridPoint
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.level.hash(state);
        self.index.hash(state);
    }
}

impl Default for GridPoint
{
    fn default() -> Self {
        Self { level: vec![], index: vec![], flags: GridPointFlags(0) }
    }
}

impl PartialEq for GridPoint
{
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level && self.index == other.index
    }
}
impl Eq for GridPoint {}

impl GridPoint
{
    pub fn new(level: &[u8], index: &[u32], is_leaf: bool) -> Self
    {
        let flags = GridPointFlags::new(level, is_leaf);
        Self { level: level.to_vec(), index: index.to_vec(), flags }
    }

    ///
    /// The point `(1,...,1)` with index 1 in every dimension.
    ///
    pub fn root_point(num_inputs: usize) -> Self
    {
        Self::new(&vec![1; num_inputs], &vec![1; num_inputs], false)
    }

    #[inline]
    pub fn dim(&self) -> usize
    {
        self.level.len()
    }

    #[inline]
    pub fn set(&mut self, dim: usize, level: u8, index: u32)
    {
        self.level[dim] = level;
        self.index[dim] = index;
    }

    #[inline]
    pub fn get(&self, dim: usize) -> (u8, u32)
    {
        (self.level[dim], self.index[dim])
    }

    pub fn is_leaf(&self) -> bool
    {
        self.flags.is_leaf()
    }

    pub fn set_is_leaf(&mut self, is_leaf: bool)
    {
        self.flags.set_is_leaf(is_leaf);
    }

    ///
    /// This is an inner point if no levels are zero...
    ///
    pub fn is_inner_point(&self) -> bool
    {
        !self.level.contains(&0)
    }

    pub fn level_sum(&self) -> u32
    {
        self.level.iter().map(|&l| l as u32).sum()
    }

    #[inline]
    pub fn level_max(&self) -> u8
    {
        *self.level.iter().max().unwrap_or(&0)
    }

    pub fn level_min(&self) -> u8
    {
        *self.level.iter().min().unwrap_or(&0)
    }

    ///
    /// Left hierarchical child in `dim`. A boundary node has the single child `(1,1)`.
    ///
    pub fn left_child(&self, dim: usize) -> GridPoint
    {
        let mut r = self.clone();
        if r.level[dim] == 0
        {
            r.set(dim, 1, 1);
            return r;
        }
        r.index[dim] = 2 * self.index[dim] - 1;
        r.level[dim] += 1;
        r
    }

    pub fn right_child(&self, dim: usize) -> GridPoint
    {
        let mut r = self.clone();
        if r.level[dim] == 0
        {
            r.set(dim, 1, 1);
            return r;
        }
        r.index[dim] = 2 * self.index[dim] + 1;
        r.level[dim] += 1;
        r
    }

    ///
    /// Parent in direction `dim`, or `None` for boundary nodes and the root.
    ///
    pub fn parent(&self, dim: usize) -> Option<GridPoint>
    {
        let (level, index) = crate::level_index::parent(self.level[dim] as u32, self.index[dim])?;
        let mut r = self.clone();
        r.set(dim, level as u8, index);
        Some(r)
    }

    pub fn unit_coordinate(&self) -> Vec<f64>
    {
        self.level.iter().zip(&self.index).map(|(&l, &i)| crate::level_index::unit_position(l as u32, i)).collect()
    }
}

impl From<&GridPoint> for u64
{
    fn from(val: &GridPoint) -> Self {
        let hasher = &mut FxHasher::default();
        val.hash(hasher);
        hasher.finish()
    }
}

impl From<GridPoint> for u64
{
    fn from(val: GridPoint) -> Self {
        (&val).into()
    }
}

///
/// Borrowed view of a point living inside [`SparseGridData`].
///
pub struct GridPointRef<'a> {
    pub index: &'a [u32],
    pub level: &'a [u8],
    pub(crate) flags: &'a GridPointFlags
}

impl GridPointRef<'_>
{
    pub fn is_leaf(&self) -> bool
    {
        self.flags.is_leaf()
    }

    pub fn unit_coordinate(&self) -> Vec<f64>
    {
        self.level.iter().zip(self.index).map(|(&l, &i)| crate::level_index::unit_position(l as u32, i)).collect()
    }

    pub fn level_sum(&self) -> u32
    {
        self.level.iter().map(|&l| l as u32).sum()
    }
}

impl std::hash::Hash for GridPointRef<'_>
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.level.hash(state);
        self.index.hash(state);
    }
}

impl From<GridPointRef<'_>> for u64
{
    fn from(val: GridPointRef<'_>) -> Self {
        let hasher = &mut FxHasher::default();
        val.hash(hasher);
        hasher.finish()
    }
}

impl<'a> From<(&'a [u32], &'a [u8], &'a GridPointFlags)> for GridPointRef<'a>
{
    fn from((index, level, flags): (&'a [u32], &'a [u8], &'a GridPointFlags)) -> Self {
        Self { index, level, flags }
    }
}

impl From<GridPointRef<'_>> for GridPoint
{
    fn from(value: GridPointRef<'_>) -> Self {
        GridPoint { level: value.level.to_owned(), index: value.index.to_owned(), flags: *value.flags }
    }
}

enum Slot
{
    Free,
    Taken(usize),
    Collision,
}

///
/// Flat, insertion-ordered point storage with a hash index from point to sequence number.
/// Coefficient vectors handed to the evaluation routines are laid out parallel to the
/// sequence numbers.
///
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SparseGridData
{
    pub bounding_box: BoundingBox,
    pub(crate) index: Vec<u32>,
    pub(crate) level: Vec<u8>,
    pub(crate) flags: Vec<GridPointFlags>,
    pub(crate) num_inputs: usize,
    pub(crate) map: FastU64Map<u32>,
    pub(crate) has_boundary: bool,
    pub(crate) num_outputs: usize,
}

impl SparseGridData
{
    pub fn new(num_inputs: usize, num_outputs: usize) -> Self
    {
        Self { bounding_box: BoundingBox::with_dim(num_inputs), index: Vec::new(), level: Vec::new(), flags: Vec::new(), num_inputs, num_outputs, map: FastU64Map::default(), has_boundary: false }
    }

    #[inline]
    pub fn num_inputs(&self) -> usize
    {
        self.num_inputs
    }

    #[inline]
    pub fn num_outputs(&self) -> usize
    {
        self.num_outputs
    }

    #[inline]
    pub fn point(&self, seq: usize) -> GridPoint
    {
        let range = seq*self.num_inputs..(seq+1)*self.num_inputs;
        GridPoint { index: self.index[range.clone()].to_owned(), level: self.level[range].to_owned(), flags: self.flags[seq] }
    }

    ///
    /// Checked variant of [`SparseGridData::point`].
    ///
    pub fn get(&self, seq: usize) -> Result<GridPoint, SGError>
    {
        if seq >= self.len()
        {
            return Err(SGError::InvalidIndex);
        }
        Ok(self.point(seq))
    }

    #[inline]
    pub fn is_empty(&self) -> bool
    {
        self.flags.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize
    {
        self.flags.len()
    }

    #[inline(always)]
    pub fn has_boundary(&self) -> bool
    {
        self.has_boundary
    }

    #[inline]
    pub fn set_has_boundary(&mut self, has_boundary: bool)
    {
        self.has_boundary = has_boundary;
    }

    #[inline]
    pub fn index(&self, seq: usize, dim: usize) -> u32
    {
        self.index[self.num_inputs*seq + dim]
    }

    #[inline(always)]
    pub fn level(&self, seq: usize, dim: usize) -> u8
    {
        self.level[self.num_inputs*seq + dim]
    }

    #[inline]
    pub fn is_leaf(&self, seq: usize) -> bool
    {
        self.flags[seq].is_leaf()
    }

    #[inline]
    pub fn set_is_leaf(&mut self, seq: usize, value: bool)
    {
        self.flags[seq].set_is_leaf(value);
    }

    #[inline]
    pub fn is_inner_point(&self, seq: usize) -> bool
    {
        self.flags[seq].is_inner()
    }

    #[inline]
    pub fn level_sum(&self, seq: usize) -> u32
    {
        self.level[seq*self.num_inputs..(seq+1)*self.num_inputs].iter().map(|&i| i as u32).sum()
    }

    ///
    /// Appends `point` and returns its sequence number.
    ///
    pub fn insert_point(&mut self, mut point: GridPoint) -> Result<usize, SGError>
    {
        if point.dim() != self.num_inputs
        {
            return Err(SGError::DimensionMismatch { expected: self.num_inputs, actual: point.dim() });
        }
        let key: u64 = (&point).into();
        match self.slot(key, &point)
        {
            Slot::Free => {}
            Slot::Taken(_) => return Err(SGError::DuplicatePoint),
            Slot::Collision => return Err(SGError::HashCollision),
        }
        point.flags.update_is_inner(&point.level);
        let seq = self.flags.len();
        self.flags.push(point.flags);
        self.index.extend(point.index);
        self.level.extend(point.level);
        self.map.insert(key, seq as u32);
        Ok(seq)
    }

    ///
    /// Overwrites the point stored at `seq`. The previous key is dropped from the index.
    ///
    #[inline]
    pub fn update(&mut self, mut point: GridPoint, seq: usize) -> Result<(), SGError>
    {
        if point.dim() != self.num_inputs
        {
            return Err(SGError::DimensionMismatch { expected: self.num_inputs, actual: point.dim() });
        }
        point.flags.update_is_inner(&point.level);
        let key: u64 = (&point).into();
        match self.slot(key, &point)
        {
            Slot::Taken(existing) if existing != seq => return Err(SGError::DuplicatePoint),
            Slot::Collision => return Err(SGError::HashCollision),
            _ => {}
        }
        let old_key: u64 = (&self.get(seq)?).into();
        self.index.chunks_exact_mut(self.num_inputs).nth(seq).ok_or(SGError::InvalidIndex)?.copy_from_slice(&point.index);
        self.level.chunks_exact_mut(self.num_inputs).nth(seq).ok_or(SGError::InvalidIndex)?.copy_from_slice(&point.level);
        self.flags[seq] = point.flags;
        self.map.remove(&old_key);
        self.map.insert(key, seq as u32);
        Ok(())
    }

    ///
    /// Return the nodes in the grid...
    ///
    pub fn nodes(&self) -> NodeIterator<'_> {
        NodeIterator::new(self)
    }

    ///
    /// Return the real coordinates for each node...
    ///
    pub fn points(&self) -> PointIterator<'_>
    {
        PointIterator::new(self)
    }

    pub fn generate_map(&mut self)
    {
        let mut map = FastU64Map::default();
        for (i, node) in self.nodes().enumerate()
        {
            map.insert(node.into(), i as u32);
        }
        self.map = map;
    }

    ///
    /// Looks up `key` and compares the stored levels and indices with `point`, so that two
    /// points sharing a hash are never mistaken for each other.
    ///
    fn slot(&self, key: u64, point: &GridPoint) -> Slot
    {
        let Some(&seq) = self.map.get(&key) else {
            return Slot::Free;
        };
        let seq = seq as usize;
        let range = seq * self.num_inputs..(seq + 1) * self.num_inputs;
        if self.level.get(range.clone()) == Some(&point.level[..]) && self.index.get(range) == Some(&point.index[..])
        {
            Slot::Taken(seq)
        }
        else
        {
            Slot::Collision
        }
    }

    #[inline]
    pub fn contains(&self, point: &GridPoint) -> bool
    {
        self.index_of(point).is_some()
    }

    #[inline]
    pub fn index_of(&self, point: &GridPoint) -> Option<usize>
    {
        match self.slot(point.into(), point)
        {
            Slot::Taken(seq) => Some(seq),
            _ => None,
        }
    }

    ///
    /// Keeps only the sequence numbers in `points_to_keep` (in that order) and rebuilds
    /// the index and the leaf flags.
    ///
    pub fn remove(&mut self, points_to_keep: &indexmap::IndexSet<usize>)
    {
        let mut indices = Vec::with_capacity(points_to_keep.len()*self.num_inputs);
        let mut levels = Vec::with_capacity(points_to_keep.len()*self.num_inputs);
        let mut flags = Vec::with_capacity(points_to_keep.len());
        for &i in points_to_keep
        {
            indices.extend(&self.index[i*self.num_inputs..(i+1)*self.num_inputs]);
            levels.extend(&self.level[i*self.num_inputs..(i+1)*self.num_inputs]);
            flags.push(self.flags[i]);
        }
        self.index = indices;
        self.level = levels;
        self.flags = flags;
        self.generate_map();
        self.update_leaves();
    }

    ///
    /// Recomputes the leaf flag of every point: a point is a leaf when no child exists in
    /// any dimension.
    ///
    pub fn update_leaves(&mut self)
    {
        for i in 0..self.len()
        {
            let point = self.point(i);
            let mut is_leaf = true;
            for dim in 0..self.num_inputs
            {
                if self.contains(&point.left_child(dim)) || self.contains(&point.right_child(dim))
                {
                    is_leaf = false;
                    break;
                }
            }
            self.flags[i].set_is_leaf(is_leaf);
        }
    }

    #[inline]
    pub fn bounding_box(&self) -> &BoundingBox
    {
        &self.bounding_box
    }

    #[inline]
    pub fn bounding_box_mut(&mut self) -> &mut BoundingBox
    {
        &mut self.bounding_box
    }

    pub fn unit_coordinate(&self, seq: usize) -> Vec<f64>
    {
        let mut coor = vec![0.0; self.num_inputs];
        for (d, c) in coor.iter_mut().enumerate()
        {
            *c = crate::level_index::unit_position(self.level(seq, d) as u32, self.index(seq, d));
        }
        coor
    }
}

pub struct NodeIterator<'a> {
    storage: &'a SparseGridData,
    current_seq: usize,
}

impl<'a> NodeIterator<'a>
{
    pub fn new(storage: &'a SparseGridData) -> Self
    {
        Self { storage, current_seq: 0 }
    }
}

impl<'a> Iterator for NodeIterator<'a> {
    type Item = GridPointRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_seq < self.storage.len() {
            let start = self.current_seq * self.storage.num_inputs;
            let end = start + self.storage.num_inputs;
            self.current_seq += 1;
            Some((&self.storage.index[start..end], &self.storage.level[start..end], &self.storage.flags[self.current_seq - 1]).into())
        } else {
            None
        }
    }
}

pub struct PointIterator<'a> {
    pub storage: &'a SparseGridData,
    current_seq: usize,
}

impl<'a> PointIterator<'a>
{
    pub fn new(storage: &'a SparseGridData) -> Self
    {
        Self { storage, current_seq: 0 }
    }
}

impl Iterator for PointIterator<'_> {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_seq < self.storage.len() {
            let point = self.storage.unit_coordinate(self.current_seq);
            let point = self.storage.bounding_box.to_real_coordinate(&point);
            self.current_seq += 1;
            Some(point)
        } else {
            None
        }
    }
}

#[test]
fn check_insert_and_duplicate()
{
    let mut storage = SparseGridData::new(2, 1);
    let a = GridPoint::new(&[1, 2], &[1, 3], true);
    let b = GridPoint::new(&[0, 1], &[1, 1], false);
    assert_eq!(storage.insert_point(a.clone()), Ok(0));
    assert_eq!(storage.insert_point(b.clone()), Ok(1));
    assert_eq!(storage.insert_point(a.clone()), Err(SGError::DuplicatePoint));
    assert_eq!(storage.len(), 2);
    assert_eq!(storage.index_of(&b), Some(1));
    assert!(storage.is_inner_point(0));
    assert!(!storage.is_inner_point(1));
    assert_eq!(storage.get(2), Err(SGError::InvalidIndex));
    assert_eq!(storage.insert_point(GridPoint::root_point(3)), Err(SGError::DimensionMismatch { expected: 2, actual: 3 }));
}

#[test]
fn check_update_replaces_key()
{
    let mut storage = SparseGridData::new(1, 1);
    storage.insert_point(GridPoint::new(&[1], &[1], false)).unwrap();
    storage.insert_point(GridPoint::new(&[2], &[1], true)).unwrap();
    storage.update(GridPoint::new(&[2], &[3], true), 0).unwrap();
    assert!(!storage.contains(&GridPoint::new(&[1], &[1], false)));
    assert_eq!(storage.index_of(&GridPoint::new(&[2], &[3], false)), Some(0));
    assert_eq!(storage.update(GridPoint::new(&[2], &[1], true), 0), Err(SGError::DuplicatePoint));
    assert_eq!(storage.update(GridPoint::new(&[3], &[1], true), 5), Err(SGError::InvalidIndex));
    assert!(storage.point(0).is_leaf());
}

#[test]
fn check_hash_collision_is_not_a_duplicate()
{
    let mut storage = SparseGridData::new(2, 1);
    let stored = GridPoint::new(&[1, 2], &[1, 3], false);
    let other = GridPoint::new(&[2, 1], &[1, 1], false);
    storage.insert_point(stored.clone()).unwrap();
    // let `other` share the key of the stored point
    storage.map.insert((&other).into(), 0);
    assert!(!storage.contains(&other));
    assert_eq!(storage.index_of(&other), None);
    assert_eq!(storage.insert_point(other.clone()), Err(SGError::HashCollision));
    assert_eq!(storage.update(other, 0), Err(SGError::HashCollision));
    assert_eq!(storage.insert_point(stored.clone()), Err(SGError::DuplicatePoint));
    assert_eq!(storage.index_of(&stored), Some(0));
}

#[test]
fn check_remove_and_leaves()
{
    let mut storage = SparseGridData::new(1, 1);
    for (l, i) in [(1, 1), (2, 1), (2, 3), (3, 1)]
    {
        storage.insert_point(GridPoint::new(&[l], &[i], false)).unwrap();
    }
    storage.update_leaves();
    assert!(!storage.is_leaf(0));
    assert!(!storage.is_leaf(1));
    assert!(storage.is_leaf(2));
    assert!(storage.is_leaf(3));
    let keep: indexmap::IndexSet<usize> = [0, 1, 2].into_iter().collect();
    storage.remove(&keep);
    assert_eq!(storage.len(), 3);
    assert!(storage.is_leaf(1));
    assert!(!storage.contains(&GridPoint::new(&[3], &[1], false)));
}

#[test]
fn check_point_coordinates()
{
    let mut storage = SparseGridData::new(2, 1);
    storage.bounding_box = BoundingBox::new(&[-1.0, 0.0], &[1.0, 4.0]);
    storage.insert_point(GridPoint::new(&[2, 0], &[3, 1], true)).unwrap();
    let points: Vec<Vec<f64>> = storage.points().collect();
    assert_eq!(points, vec![vec![0.5, 4.0]]);
    assert_eq!(storage.unit_coordinate(0), vec![0.75, 1.0]);
}
