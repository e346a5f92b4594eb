//! Vector types shared by the world, the wire codec and the voxelizer.
//!
//! Three flavours, one per domain:
//! - [`Vec3i`]: grid cells, brick positions and sizes
//! - [`Vec3f`]: brick colors (what travels on the wire)
//! - [`Vec3d`]: mesh vertices and ray math

use std::fmt;
use std::ops::{Add, AddAssign, Index, IndexMut, Mul, Sub};

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

macro_rules! impl_vec3_common {
    ($name:ident, $scalar:ty) => {
        impl $name {
            /// Creates a new vector.
            #[inline]
            #[must_use]
            pub const fn new(x: $scalar, y: $scalar, z: $scalar) -> Self {
                Self { x, y, z }
            }

            /// Creates a vector with all components set to `v`.
            #[inline]
            #[must_use]
            pub const fn splat(v: $scalar) -> Self {
                Self::new(v, v, v)
            }

            /// Converts to array.
            #[inline]
            #[must_use]
            pub const fn to_array(self) -> [$scalar; 3] {
                [self.x, self.y, self.z]
            }

            /// Creates from array.
            #[inline]
            #[must_use]
            pub const fn from_array(arr: [$scalar; 3]) -> Self {
                Self::new(arr[0], arr[1], arr[2])
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                *self = *self + rhs;
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
            }
        }

        impl Mul<$scalar> for $name {
            type Output = Self;
            fn mul(self, rhs: $scalar) -> Self {
                Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
            }
        }

        impl Index<usize> for $name {
            type Output = $scalar;
            fn index(&self, axis: usize) -> &$scalar {
                match axis {
                    0 => &self.x,
                    1 => &self.y,
                    2 => &self.z,
                    _ => panic!("axis {axis} out of range for a 3-vector"),
                }
            }
        }

        impl IndexMut<usize> for $name {
            fn index_mut(&mut self, axis: usize) -> &mut $scalar {
                match axis {
                    0 => &mut self.x,
                    1 => &mut self.y,
                    2 => &mut self.z,
                    _ => panic!("axis {axis} out of range for a 3-vector"),
                }
            }
        }

        impl From<[$scalar; 3]> for $name {
            fn from(arr: [$scalar; 3]) -> Self {
                Self::from_array(arr)
            }
        }

        impl From<$name> for [$scalar; 3] {
            fn from(v: $name) -> Self {
                v.to_array()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "({}, {}, {})", self.x, self.y, self.z)
            }
        }
    };
}

/// Integer 3-vector: grid cells, brick positions and extents.
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[serde(from = "[i32; 3]", into = "[i32; 3]")]
pub struct Vec3i {
    /// X component
    pub x: i32,
    /// Y component
    pub y: i32,
    /// Z component
    pub z: i32,
}

impl_vec3_common!(Vec3i, i32);

impl Vec3i {
    /// Zero vector
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// All ones
    pub const ONE: Self = Self::new(1, 1, 1);

    /// Product of the components (cell count of an extent).
    #[inline]
    #[must_use]
    pub const fn volume(self) -> i64 {
        self.x as i64 * self.y as i64 * self.z as i64
    }

    /// Returns true if every component is strictly positive.
    #[inline]
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.x > 0 && self.y > 0 && self.z > 0
    }

    /// Widens to double precision.
    #[inline]
    #[must_use]
    pub fn as_vec3d(self) -> Vec3d {
        Vec3d::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }
}

/// Float 3-vector: RGB brick colors.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Vec3f {
    /// X component (red)
    pub x: f32,
    /// Y component (green)
    pub y: f32,
    /// Z component (blue)
    pub z: f32,
}

impl_vec3_common!(Vec3f, f32);

impl Vec3f {
    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
}

/// Double 3-vector: mesh vertices, ray origins and directions.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Vec3d {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl_vec3_common!(Vec3d, f64);

impl Vec3d {
    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Unit X vector
    pub const X: Self = Self::new(1.0, 0.0, 0.0);

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Component-wise minimum
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Component-wise absolute value
    #[must_use]
    pub fn abs(self) -> Self {
        Self::new(self.x.abs(), self.y.abs(), self.z.abs())
    }
}
