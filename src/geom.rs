//! Shared geometric and color value types.
//!
//! Small `Copy` value types, wrapping raw numbers in newtypes with `From`
//! conversions rather than passing bare tuples around.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A position or velocity with an attached yaw component.
///
/// Distances are millimeters, yaw is stored in degrees at the API
/// boundary. Internally the binary format encodes yaw in decidegrees
/// (tenths of a degree) as a signed integer; conversion happens at decode
/// time so every in-memory `Vector3WithYaw` is already in natural units.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vector3WithYaw {
    /// X coordinate, millimeters.
    pub x: f32,
    /// Y coordinate, millimeters.
    pub y: f32,
    /// Z coordinate, millimeters.
    pub z: f32,
    /// Yaw, degrees.
    pub yaw: f32,
}

impl Vector3WithYaw {
    /// The zero vector with zero yaw.
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        yaw: 0.0,
    };

    /// Builds a vector from its four components.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, yaw: f32) -> Self {
        Self { x, y, z, yaw }
    }

    /// Position-only vector (yaw set to zero); used where an axis carries
    /// no yaw data.
    #[must_use]
    pub const fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, yaw: 0.0 }
    }

    /// Horizontal (XY-plane) distance to another vector, ignoring Z and yaw.
    #[must_use]
    pub fn horizontal_distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.hypot(dy)
    }

    /// Euclidean distance to another vector, ignoring yaw.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl core::ops::Add for Vector3WithYaw {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.x + rhs.x,
            self.y + rhs.y,
            self.z + rhs.z,
            self.yaw + rhs.yaw,
        )
    }
}

impl core::ops::Sub for Vector3WithYaw {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(
            self.x - rhs.x,
            self.y - rhs.y,
            self.z - rhs.z,
            self.yaw - rhs.yaw,
        )
    }
}

impl core::ops::Mul<f32> for Vector3WithYaw {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs, self.yaw * rhs)
    }
}

/// An 8-bit-per-channel RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RgbColor {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl RgbColor {
    /// Black (0, 0, 0).
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };
    /// White (255, 255, 255).
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
    };

    /// Builds a color from its three channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// A gray value with equal R, G and B.
    #[must_use]
    pub const fn gray(y: u8) -> Self {
        Self { r: y, g: y, b: y }
    }

    /// Linearly interpolates between `self` and `other` by `t` in `[0, 1]`.
    ///
    /// `t` is not clamped by this function; callers are expected to pass a
    /// value already clamped to `[0, 1]` (the light VM does this at the
    /// call site, where it also knows whether the fade has completed).
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let lerp_channel = |a: u8, b: u8| -> u8 {
            let a = f32::from(a);
            let b = f32::from(b);
            (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
        };
        Self::new(
            lerp_channel(self.r, other.r),
            lerp_channel(self.g, other.g),
            lerp_channel(self.b, other.b),
        )
    }
}

/// An 8-bit-per-channel RGBW color.
///
/// The engine only ever produces [`RgbColor`]; RGB-to-RGBW remapping is left
/// to an external collaborator that consumes this type as its output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RgbwColor {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// White channel.
    pub w: u8,
}

impl RgbwColor {
    /// Builds an RGBW color from its four channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, w: u8) -> Self {
        Self { r, g, b, w }
    }
}

/// A closed interval `[min, max]` over `f32`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval {
    /// Lower bound.
    pub min: f32,
    /// Upper bound.
    pub max: f32,
}

impl Interval {
    /// A degenerate interval containing only `value`.
    #[must_use]
    pub const fn point(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Builds an interval, swapping bounds if given out of order.
    #[must_use]
    pub fn new(a: f32, b: f32) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// Widens `self` to also contain `value`.
    #[must_use]
    pub fn extend(self, value: f32) -> Self {
        Self {
            min: self.min.min(value),
            max: self.max.max(value),
        }
    }

    /// Union of two intervals.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// The interval's length (always `>= 0`).
    #[must_use]
    pub fn length(&self) -> f32 {
        self.max - self.min
    }
}

/// A bounding box over the three spatial axes.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisAlignedBox {
    /// Extent along X.
    pub x: Interval,
    /// Extent along Y.
    pub y: Interval,
    /// Extent along Z.
    pub z: Interval,
}

impl AxisAlignedBox {
    /// A degenerate box containing only `point`.
    #[must_use]
    pub fn point(point: Vector3WithYaw) -> Self {
        Self {
            x: Interval::point(point.x),
            y: Interval::point(point.y),
            z: Interval::point(point.z),
        }
    }

    /// Widens `self` to also contain `point`.
    #[must_use]
    pub fn extend(self, point: Vector3WithYaw) -> Self {
        Self {
            x: self.x.extend(point.x),
            y: self.y.extend(point.y),
            z: self.z.extend(point.z),
        }
    }

    /// Union of two bounding boxes.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            x: self.x.union(other.x),
            y: self.y.union(other.y),
            z: self.z.union(other.z),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_lerp_midpoint() {
        let mid = RgbColor::BLACK.lerp(RgbColor::WHITE, 0.5);
        assert_eq!(mid, RgbColor::new(128, 128, 128));
    }

    #[test]
    fn interval_extend_widens_both_directions() {
        let iv = Interval::point(5.0).extend(2.0).extend(9.0);
        assert_eq!(iv.min, 2.0);
        assert_eq!(iv.max, 9.0);
    }

    #[test]
    fn vector_arithmetic() {
        let a = Vector3WithYaw::new(1.0, 2.0, 3.0, 10.0);
        let b = Vector3WithYaw::new(1.0, 1.0, 1.0, 5.0);
        let sum = a + b;
        assert_eq!(sum, Vector3WithYaw::new(2.0, 3.0, 4.0, 15.0));
        assert_eq!((a - b).z, 2.0);
        assert_eq!((a * 2.0).x, 2.0);
    }
}
