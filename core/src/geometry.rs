//! Continuous-space geometry shared by the oracle, combat, and behaviors.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing continuous distances.
pub const EPSILON: f32 = 1e-4;

/// Point or displacement in continuous map space, measured in tiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f32,
    /// Vertical component.
    pub y: f32,
}

impl Vec2 {
    /// The origin.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Creates a new vector from its components.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean length of the vector.
    #[must_use]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    /// Unit vector pointing in the same direction, or `None` for a
    /// degenerate (near-zero) vector.
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let length = self.length();
        if length <= EPSILON || !length.is_finite() {
            return None;
        }
        Some(Self::new(self.x / length, self.y / length))
    }

    /// Moves from `self` toward `target` by at most `max_step`, never
    /// overshooting the target.
    #[must_use]
    pub fn step_toward(self, target: Self, max_step: f32) -> Self {
        let delta = target - self;
        let length = delta.length();
        if length <= max_step || length <= EPSILON {
            return target;
        }
        self + delta * (max_step / length)
    }

    /// Reports whether both components are finite numbers.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Collision footprint of a structure, centred on its position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    /// Disc with the provided radius.
    Circle {
        /// Radius of the disc in tiles.
        radius: f32,
    },
    /// Axis-aligned rectangle with explicit half extents.
    Rect {
        /// Half of the rectangle's width in tiles.
        half_width: f32,
        /// Half of the rectangle's height in tiles.
        half_height: f32,
    },
}

impl Shape {
    /// Reports whether a circle of `radius` centred at `point` overlaps the
    /// shape anchored at `center`. A zero radius performs a point query.
    #[must_use]
    pub fn overlaps_circle(self, center: Vec2, point: Vec2, radius: f32) -> bool {
        match self {
            Self::Circle { radius: own } => point.distance(center) < own + radius,
            Self::Rect {
                half_width,
                half_height,
            } => {
                let closest = closest_point_on_rect(center, half_width, half_height, point);
                if radius <= 0.0 {
                    return (point.x - center.x).abs() <= half_width
                        && (point.y - center.y).abs() <= half_height;
                }
                closest.distance(point) < radius
            }
        }
    }

    /// Edge-to-edge distance between the shape anchored at `center` and a
    /// circle of `radius` at `point`. Overlapping shapes report zero.
    #[must_use]
    pub fn surface_distance(self, center: Vec2, point: Vec2, radius: f32) -> f32 {
        let gap = match self {
            Self::Circle { radius: own } => point.distance(center) - own - radius,
            Self::Rect {
                half_width,
                half_height,
            } => {
                closest_point_on_rect(center, half_width, half_height, point).distance(point)
                    - radius
            }
        };
        gap.max(0.0)
    }
}

/// Edge-to-edge distance between two circles. Overlap reports zero.
#[must_use]
pub fn circle_surface_distance(a: Vec2, a_radius: f32, b: Vec2, b_radius: f32) -> f32 {
    (a.distance(b) - a_radius - b_radius).max(0.0)
}

fn closest_point_on_rect(center: Vec2, half_width: f32, half_height: f32, point: Vec2) -> Vec2 {
    Vec2::new(
        point.x.clamp(center.x - half_width, center.x + half_width),
        point.y.clamp(center.y - half_height, center.y + half_height),
    )
}
