//! Math utilities and types
//!
//! Provides the 2D math types the collision subsystem works in.

pub use nalgebra::Vector2;

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// Squared lengths below this are treated as zero when normalizing
pub const NORMALIZE_EPSILON: f32 = 1.0e-12;

/// Math utility functions
pub mod utils {
    use super::{Vec2, NORMALIZE_EPSILON};

    /// Normalize `v`, or return `fallback` when `v` is (nearly) zero length
    pub fn normalize_or(v: Vec2, fallback: Vec2) -> Vec2 {
        v.try_normalize(NORMALIZE_EPSILON.sqrt()).unwrap_or(fallback)
    }

    /// Squared distance between two points
    #[inline]
    pub fn distance_squared(a: &Vec2, b: &Vec2) -> f32 {
        (a - b).norm_squared()
    }
}
