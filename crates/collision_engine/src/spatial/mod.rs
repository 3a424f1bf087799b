//! Spatial partitioning data structures
//!
//! Broad-phase indices for 2D collision detection: a uniform cell grid and a
//! dynamic AABB tree, both behind the [`BroadPhase`] trait.

pub mod aabb;
pub mod broad_phase;
pub mod bvh;
pub mod grid;

pub use aabb::AabbShape;
pub use broad_phase::{create_broad_phase, BroadPhase};
pub use bvh::{BvhInvariantError, DynamicBvh, NodeView};
pub use grid::{CellCoord, SpatialGrid};
