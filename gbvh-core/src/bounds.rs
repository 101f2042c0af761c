use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in single precision.
///
/// No `min <= max` invariant is enforced: boxes come straight from game
/// files and are carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner (x, y, z).
    pub min: [f32; 3],
    /// Maximum corner (x, y, z).
    pub max: [f32; 3],
}

impl Aabb {
    /// Create a box from its two corners.
    #[must_use]
    pub const fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }

    /// Create a box from per-axis `[min, max]` pairs.
    #[must_use]
    pub const fn from_axes(x: [f32; 2], y: [f32; 2], z: [f32; 2]) -> Self {
        Self { min: [x[0], y[0], z[0]], max: [x[1], y[1], z[1]] }
    }

    /// The `[min, max]` pair of one axis (0 = x, 1 = y, 2 = z).
    ///
    /// # Panics
    ///
    /// Panics if `axis > 2`.
    #[must_use]
    pub fn axis(&self, axis: usize) -> [f32; 2] {
        [self.min[axis], self.max[axis]]
    }

    /// Smallest box enclosing both `self` and `other`.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        Self {
            min: [
                self.min[0].min(other.min[0]),
                self.min[1].min(other.min[1]),
                self.min[2].min(other.min[2]),
            ],
            max: [
                self.max[0].max(other.max[0]),
                self.max[1].max(other.max[1]),
                self.max[2].max(other.max[2]),
            ],
        }
    }

    /// Whether every coordinate is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.min.iter().chain(&self.max).all(|v| v.is_finite())
    }

    /// Volume of the box. Degenerate (flat) boxes have zero volume.
    #[must_use]
    pub fn volume(&self) -> f32 {
        (self.max[0] - self.min[0]) * (self.max[1] - self.min[1]) * (self.max[2] - self.min[2])
    }
}
