//!
//! Sparse grid core: level/index addressing, hashed grid point storage, grid generators,
//! stretched domains, hierarchical basis functions and multigrid on full grids.
//!
pub mod algorithms;
pub mod basis;
pub mod domain;
pub mod errors;
pub mod generators;
pub mod level_index;
pub mod multigrid;
pub mod quadrature;
pub mod serialization;
pub mod storage;
