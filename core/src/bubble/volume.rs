//! Bubble volume containment
//!
//! Closed-form containment tests for the three supported shapes. The
//! cylinder axis is vertical (+Y), matching how gameplay regions are
//! placed on terrain.

use glam::Vec3;

/// Spatial extent of a time bubble.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BubbleVolume {
    Sphere {
        center: Vec3,
        radius: f32,
    },
    /// Vertical cylinder from `base` up to `base.y + height`.
    Cylinder {
        base: Vec3,
        radius: f32,
        height: f32,
    },
    /// Axis-aligned box.
    Box {
        min: Vec3,
        max: Vec3,
    },
}

impl BubbleVolume {
    /// Whether the point lies inside (boundary inclusive).
    pub fn contains(&self, point: Vec3) -> bool {
        match *self {
            Self::Sphere { center, radius } => {
                point.distance_squared(center) <= radius * radius
            }
            Self::Cylinder {
                base,
                radius,
                height,
            } => {
                if point.y < base.y || point.y > base.y + height {
                    return false;
                }
                let dx = point.x - base.x;
                let dz = point.z - base.z;
                dx * dx + dz * dz <= radius * radius
            }
            Self::Box { min, max } => {
                point.x >= min.x
                    && point.x <= max.x
                    && point.y >= min.y
                    && point.y <= max.y
                    && point.z >= min.z
                    && point.z <= max.z
            }
        }
    }
}
