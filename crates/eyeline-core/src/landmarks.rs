//! Landmark frame container and the fixed face-mesh index scheme.
//!
//! Points are normalized `[0, 1]` image coordinates as emitted by a
//! MediaPipe-style face mesh: 468 points, or 478 when iris refinement is on
//! (indices 468..478 are the two iris rings). "Left" and "right" refer to
//! image space, not the subject's anatomy.

use serde::{Deserialize, Serialize};

use crate::features::FeatureError;

/// Number of points in an unrefined face mesh.
pub const MESH_POINTS: usize = 468;
/// Number of points in an iris-refined face mesh.
pub const REFINED_MESH_POINTS: usize = 478;

/// Nose tip.
pub const NOSE_TIP: usize = 4;
/// Lowest chin point.
pub const CHIN: usize = 152;
/// Single-point anchor of the image-left eye (outer corner).
pub const LEFT_EYE_ANCHOR: usize = 33;
/// Single-point anchor of the image-right eye (inner corner).
pub const RIGHT_EYE_ANCHOR: usize = 362;

/// A single normalized 2D landmark.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Arithmetic mean of a non-empty point set. Returns the origin for an empty set.
    pub fn mean(points: &[Point]) -> Point {
        if points.is_empty() {
            return Point::default();
        }
        let n = points.len() as f32;
        let (sx, sy) = points
            .iter()
            .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point::new(sx / n, sy / n)
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Point::new(x, y)
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Point::new(x, y)
    }
}

/// Index table for one eye.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeLandmarks {
    /// 16-point eye outline, starting at the outer corner, upper lid first.
    pub outline: [usize; 16],
    /// Two (upper, lower) lid pairs spanning the eye vertically.
    pub vertical: [(usize, usize); 2],
    /// (outer, inner) corner pair spanning the eye horizontally.
    pub horizontal: (usize, usize),
    /// Mid-lid (upper, lower) pair used for the blink closure signal.
    pub lid: (usize, usize),
    /// Four iris ring points (requires a refined mesh).
    pub iris: [usize; 4],
}

pub const LEFT_EYE: EyeLandmarks = EyeLandmarks {
    outline: [
        33, 246, 161, 160, 159, 158, 157, 173, 133, 155, 154, 153, 145, 144, 163, 7,
    ],
    vertical: [(160, 144), (158, 153)],
    horizontal: (33, 133),
    lid: (159, 145),
    iris: [469, 470, 471, 472],
};

pub const RIGHT_EYE: EyeLandmarks = EyeLandmarks {
    outline: [
        362, 398, 384, 385, 386, 387, 388, 466, 263, 249, 390, 373, 374, 380, 381, 382,
    ],
    vertical: [(385, 380), (387, 373)],
    horizontal: (362, 263),
    lid: (386, 374),
    iris: [474, 475, 476, 477],
};

/// One frame's worth of landmarks for a single face.
///
/// Owned by the caller; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkFrame {
    points: Vec<Point>,
}

impl LandmarkFrame {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Whether the iris ring indices are present.
    pub fn has_iris(&self) -> bool {
        self.points.len() >= REFINED_MESH_POINTS
    }

    /// Look up a landmark, reporting a missing or non-finite point as a feature error.
    pub fn point(&self, index: usize) -> Result<Point, FeatureError> {
        let p = self
            .points
            .get(index)
            .copied()
            .ok_or(FeatureError::MissingLandmark {
                index,
                len: self.points.len(),
            })?;
        if !p.is_finite() {
            return Err(FeatureError::NonFinite { index });
        }
        Ok(p)
    }

    /// Look up a fixed-size set of landmarks.
    pub fn select<const N: usize>(&self, indices: &[usize; N]) -> Result<[Point; N], FeatureError> {
        let mut out = [Point::default(); N];
        for (slot, &index) in out.iter_mut().zip(indices.iter()) {
            *slot = self.point(index)?;
        }
        Ok(out)
    }
}

impl From<Vec<(f32, f32)>> for LandmarkFrame {
    fn from(points: Vec<(f32, f32)>) -> Self {
        Self::new(points.into_iter().map(Point::from).collect())
    }
}
