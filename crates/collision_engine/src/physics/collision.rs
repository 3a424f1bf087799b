//! Narrow-phase circle test
//!
//! Every collider is a circle. Rejection uses squared distances only; the
//! square root is taken once a contact is confirmed.

use crate::foundation::math::{utils, Vec2};
use crate::world::Entity;

/// Confirmed contact seen from one body of the pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Unit vector pointing from the other body towards this one
    pub normal: Vec2,
    /// Overlap depth, `(r1 + r2) - distance`
    pub penetration: f32,
}

/// Bounding circle for collision detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingCircle {
    /// Centre in world space
    pub center: Vec2,
    /// Radius; `<= 0` never touches anything
    pub radius: f32,
}

impl BoundingCircle {
    /// Create a new bounding circle
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Collision circle of an entity
    pub fn from_entity(entity: &Entity) -> Self {
        Self::new(entity.position, entity.bounding_radius)
    }

    /// Check if this circle touches or overlaps another
    pub fn intersects(&self, other: &Self) -> bool {
        self.contact(other).is_some()
    }

    /// Contact seen from `self`, or `None` when the circles are apart
    ///
    /// Circles that exactly touch are in contact with zero penetration.
    /// Coincident centres fall back to a `+x` normal.
    pub fn contact(&self, other: &Self) -> Option<Contact> {
        if self.radius <= 0.0 || other.radius <= 0.0 {
            return None;
        }
        let radius_sum = self.radius + other.radius;
        let distance_squared = utils::distance_squared(&self.center, &other.center);
        if distance_squared > radius_sum * radius_sum {
            return None;
        }
        Some(Contact {
            normal: utils::normalize_or(self.center - other.center, Vec2::x()),
            penetration: radius_sum - distance_squared.sqrt(),
        })
    }
}

/// Circle test between two entities, seen from `entity`
pub fn circle_contact(entity: &Entity, other: &Entity) -> Option<Contact> {
    BoundingCircle::from_entity(entity).contact(&BoundingCircle::from_entity(other))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_overlap_and_separation() {
        let a = BoundingCircle::new(Vec2::new(0.0, 0.0), 5.0);
        let near = BoundingCircle::new(Vec2::new(8.0, 0.0), 5.0);
        let far = BoundingCircle::new(Vec2::new(11.0, 0.0), 5.0);

        let contact = a.contact(&near).unwrap();
        assert_relative_eq!(contact.penetration, 2.0);
        assert_relative_eq!(contact.normal, -Vec2::x());
        assert!(a.contact(&far).is_none());
    }

    #[test]
    fn test_touching_counts_with_zero_penetration() {
        let a = BoundingCircle::new(Vec2::new(0.0, 0.0), 3.0);
        let b = BoundingCircle::new(Vec2::new(0.0, 7.0), 4.0);
        let contact = a.contact(&b).unwrap();
        assert_relative_eq!(contact.penetration, 0.0);
        assert_relative_eq!(contact.normal, -Vec2::y());
    }

    #[test]
    fn test_non_positive_radius_never_contacts() {
        let a = BoundingCircle::new(Vec2::zeros(), 0.0);
        let b = BoundingCircle::new(Vec2::zeros(), 10.0);
        let c = BoundingCircle::new(Vec2::zeros(), -1.0);
        assert!(!a.intersects(&b));
        assert!(!b.intersects(&a));
        assert!(!b.intersects(&c));
    }

    #[test]
    fn test_coincident_centres_use_fallback_normal() {
        let a = BoundingCircle::new(Vec2::new(4.0, 4.0), 1.0);
        let contact = a.contact(&a).unwrap();
        assert_eq!(contact.normal, Vec2::x());
        assert_relative_eq!(contact.penetration, 2.0);
    }

    #[test]
    fn test_symmetry() {
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..1000 {
            let a = BoundingCircle::new(
                Vec2::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0)),
                rng.gen_range(0.1..20.0),
            );
            let b = BoundingCircle::new(
                Vec2::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0)),
                rng.gen_range(0.1..20.0),
            );
            match (a.contact(&b), b.contact(&a)) {
                (Some(ab), Some(ba)) => {
                    assert_relative_eq!(ab.penetration, ba.penetration, epsilon = 1.0e-4);
                    assert_relative_eq!(ab.normal, -ba.normal, epsilon = 1.0e-5);
                }
                (None, None) => {}
                (ab, ba) => panic!("asymmetric contact: {ab:?} vs {ba:?}"),
            }
        }
    }
}
