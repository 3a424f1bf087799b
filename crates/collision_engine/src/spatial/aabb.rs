//! Axis-aligned bounding boxes

use crate::foundation::math::Vec2;
use crate::world::Entity;

/// Axis-aligned bounding box in world space
///
/// Always derived from a centre and radius, so `min <= max` holds on both
/// axes for any non-negative radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AabbShape {
    /// Lower-left corner
    pub min: Vec2,
    /// Upper-right corner
    pub max: Vec2,
}

impl AabbShape {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Square box enclosing a circle
    pub fn from_circle(center: Vec2, radius: f32) -> Self {
        let r = Vec2::new(radius, radius);
        Self {
            min: center - r,
            max: center + r,
        }
    }

    /// Box enclosing an entity's collision circle
    pub fn from_entity(entity: &Entity) -> Self {
        Self::from_circle(entity.position, entity.bounding_radius)
    }

    /// Tight box around both inputs
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Box area, used as the insertion cost metric of the BVH
    pub fn area(&self) -> f32 {
        let extent = self.max - self.min;
        extent.x * extent.y
    }

    /// True unless the boxes are separated on the X or Y axis
    pub fn intersects(&self, other: &Self) -> bool {
        !(self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y)
    }

    /// Does this box fully contain `other`?
    pub fn contains(&self, other: &Self) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}
