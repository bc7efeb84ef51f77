//!
//! Geometric multigrid on dense tensor product grids.
//!
pub mod full_grid;
pub mod operator;
pub mod solver;
pub mod transfer;
pub mod vector;
