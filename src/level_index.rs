//!
//! Level/index arithmetic of the hierarchical 1-D basis.
//!
//! A node is identified by `(level, index)` with position `index / 2^level`. Inner nodes have
//! `level >= 1` and an odd index, the two boundary nodes are `(0, 0)` and `(0, 1)`.
//!
use static_init::dynamic;

/// Deepest level stored in the precomputed tables.
pub const LOOKUP_MAX: u32 = 11;
/// Number of inner nodes on levels `1..=LOOKUP_MAX`.
pub const LOOKUP_SIZE: usize = (1 << LOOKUP_MAX) - 1;

/// Table entry marking the left domain boundary as neighbor.
pub const LEFT_BOUNDARY: i32 = -2;
/// Table entry marking the right domain boundary as neighbor.
pub const RIGHT_BOUNDARY: i32 = -1;

#[inline]
pub fn left_child(level: u32, index: u32) -> (u32, u32)
{
    if level == 0
    {
        return (1, 1);
    }
    (level + 1, 2 * index - 1)
}

#[inline]
pub fn right_child(level: u32, index: u32) -> (u32, u32)
{
    if level == 0
    {
        return (1, 1);
    }
    (level + 1, 2 * index + 1)
}

///
/// Hierarchical parent. Boundary nodes and the root `(1,1)` have none.
///
#[inline]
pub fn parent(level: u32, index: u32) -> Option<(u32, u32)>
{
    if level <= 1
    {
        return None;
    }
    Some((level - 1, (index >> 1) | 1))
}

#[inline]
pub fn unit_position(level: u32, index: u32) -> f64
{
    index as f64 / (1u64 << level) as f64
}

///
/// Position of `(level, index)` in the flat per-level tables.
///
#[inline]
pub fn lookup_index(level: u32, index: u32) -> usize
{
    debug_assert!(level >= 1);
    (1usize << (level - 1)) - 1 + ((index as usize - 1) >> 1)
}

///
/// Climbs from `start` (a grid position on `level` that may be even) to the coarsest node
/// sitting at that position. Positions `0` and `2^level` resolve to the boundary nodes.
///
#[inline]
fn climb(mut level: u32, mut index: u64) -> (u32, u32)
{
    if index == 0
    {
        return (0, 0);
    }
    if index == 1u64 << level
    {
        return (0, 1);
    }
    while index % 2 == 0 && level > 0
    {
        index >>= 1;
        level -= 1;
    }
    if level == 0
    {
        (0, index.min(1) as u32)
    }
    else
    {
        (level, index as u32)
    }
}

///
/// Nearest coarser node to the left of `(level, index)`. For level 0 this is the left boundary.
///
#[inline]
pub fn left_neighbor(level: u32, index: u32) -> (u32, u32)
{
    if level == 0 || index == 0
    {
        return (0, 0);
    }
    climb(level, index as u64 - 1)
}

///
/// Nearest coarser node to the right of `(level, index)`. For level 0 this is the right boundary.
///
#[inline]
pub fn right_neighbor(level: u32, index: u32) -> (u32, u32)
{
    if level == 0
    {
        return (0, 1);
    }
    climb(level, (index as u64 + 1).min(1u64 << level))
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NeighborSpec
{
    pub left_level: u32,
    pub left_index: u32,
    pub right_level: u32,
    pub right_index: u32,
}

pub fn neighbor_specs(level: u32, index: u32) -> NeighborSpec
{
    let (left_level, left_index) = left_neighbor(level, index);
    let (right_level, right_index) = right_neighbor(level, index);
    NeighborSpec { left_level, left_index, right_level, right_index }
}

pub struct NeighborTables
{
    pub left: Vec<i32>,
    pub right: Vec<i32>,
}

impl NeighborTables
{
    fn new() -> Self
    {
        let mut left = vec![0; LOOKUP_SIZE];
        let mut right = vec![0; LOOKUP_SIZE];
        for level in 1..=LOOKUP_MAX
        {
            for index in (1..(1u32 << level)).step_by(2)
            {
                let entry = lookup_index(level, index);
                let spec = neighbor_specs(level, index);
                left[entry] = if spec.left_level == 0 { LEFT_BOUNDARY } else { lookup_index(spec.left_level, spec.left_index) as i32 };
                right[entry] = if spec.right_level == 0 { RIGHT_BOUNDARY } else { lookup_index(spec.right_level, spec.right_index) as i32 };
            }
        }
        Self { left, right }
    }
}

#[dynamic]
pub static NEIGHBOR_TABLES: NeighborTables = NeighborTables::new();

#[test]
fn check_children_and_parent()
{
    assert_eq!(left_child(2, 3), (3, 5));
    assert_eq!(right_child(2, 3), (3, 7));
    assert_eq!(left_child(0, 1), (1, 1));
    assert_eq!(parent(3, 5), Some((2, 3)));
    assert_eq!(parent(3, 7), Some((2, 3)));
    assert_eq!(parent(3, 1), Some((2, 1)));
    assert_eq!(parent(1, 1), None);
    for level in 1..12
    {
        for index in (1..(1u32 << level)).step_by(2)
        {
            let (l, i) = left_child(level, index);
            assert_eq!(parent(l, i), Some((level, index)));
            let (l, i) = right_child(level, index);
            assert_eq!(parent(l, i), Some((level, index)));
        }
    }
}

#[test]
fn check_lookup_index()
{
    assert_eq!(lookup_index(1, 1), 0);
    assert_eq!(lookup_index(2, 1), 1);
    assert_eq!(lookup_index(2, 3), 2);
    assert_eq!(lookup_index(3, 7), 6);
    assert_eq!(lookup_index(LOOKUP_MAX, (1 << LOOKUP_MAX) - 1), LOOKUP_SIZE - 1);
}

#[test]
fn check_neighbor_tables()
{
    let left = [-2, -2, 0, -2, 1, 0, 2, -2, 3, 1, 4, 0];
    let right = [-1, 0, -1, 1, 0, 2, -1, 3, 1, 4, 0, 5];
    assert_eq!(&NEIGHBOR_TABLES.left[0..12], &left);
    assert_eq!(&NEIGHBOR_TABLES.right[0..12], &right);
    assert_eq!(NEIGHBOR_TABLES.left.len(), LOOKUP_SIZE);
    assert_eq!(NEIGHBOR_TABLES.left[LOOKUP_SIZE - 1], lookup_index(LOOKUP_MAX - 1, (1 << (LOOKUP_MAX - 1)) - 1) as i32);
    assert_eq!(NEIGHBOR_TABLES.right[LOOKUP_SIZE - 1], RIGHT_BOUNDARY);
    assert_eq!(NEIGHBOR_TABLES.left[lookup_index(LOOKUP_MAX, 1)], LEFT_BOUNDARY);
}

#[test]
fn check_neighbor_symmetry()
{
    for level in 1..=20u32
    {
        let h = 1u32 << level;
        let step = if level > 14 { 1021 * 2 } else { 2 };
        let mut index = 1;
        while index < h
        {
            let x = unit_position(level, index);
            let (ll, li) = left_neighbor(level, index);
            let (rl, ri) = right_neighbor(level, index);
            assert!(ll < level && rl < level);
            // neighbors sit exactly one mesh width away
            assert_eq!(unit_position(ll, li), x - 1.0 / h as f64);
            assert_eq!(unit_position(rl, ri), x + 1.0 / h as f64);
            if ll > 0
            {
                let (l, i) = right_neighbor(ll, li);
                assert!(l < ll);
                assert!(unit_position(l, i) >= x);
            }
            if rl > 0
            {
                let (l, i) = left_neighbor(rl, ri);
                assert!(l < rl);
                assert!(unit_position(l, i) <= x);
            }
            index += step;
        }
    }
}
