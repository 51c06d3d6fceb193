//! Face placement within the frame: centering, apparent scale, and stability.
//!
//! A face that sits near the middle of the frame and holds still between
//! frames is the precondition for a useful eye-contact reading. These
//! measurements are reported next to the eye features; they never change the
//! per-frame decision.

use std::collections::VecDeque;

use crate::features::FeatureError;
use crate::landmarks::{LandmarkFrame, Point, CHIN, MESH_POINTS, NOSE_TIP};

/// Default number of nose positions kept for the stability estimate.
pub const DEFAULT_STABILITY_WINDOW: usize = 5;

/// How centered the face is: `1 − (|cx − 0.5| + |cy − 0.5|)`, clamped to `[0, 1]`,
/// where `(cx, cy)` is the mean of the 468 mesh points.
pub fn face_centering(frame: &LandmarkFrame) -> Result<f32, FeatureError> {
    if frame.len() < MESH_POINTS {
        return Err(FeatureError::MissingLandmark {
            index: MESH_POINTS - 1,
            len: frame.len(),
        });
    }
    let center = Point::mean(&frame.points()[..MESH_POINTS]);
    if !center.is_finite() {
        return Err(FeatureError::NonFinite { index: 0 });
    }
    let score = 1.0 - ((center.x - 0.5).abs() + (center.y - 0.5).abs());
    Ok(score.clamp(0.0, 1.0))
}

/// Nose-tip to chin distance; grows as the subject moves toward the camera.
pub fn face_scale(frame: &LandmarkFrame) -> Result<f32, FeatureError> {
    let [nose, chin] = frame.select(&[NOSE_TIP, CHIN])?;
    Ok(nose.distance(chin))
}

/// Tracks recent nose positions and reports mean frame-to-frame displacement.
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    positions: VecDeque<Point>,
    window: usize,
}

impl StabilityTracker {
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            positions: VecDeque::with_capacity(window),
            window,
        }
    }

    pub fn push(&mut self, nose: Point) {
        if self.positions.len() == self.window {
            self.positions.pop_front();
        }
        self.positions.push_back(nose);
    }

    /// Mean Euclidean displacement across consecutive positions.
    ///
    /// `None` until at least one pair of positions is available.
    pub fn mean_displacement(&self) -> Option<f32> {
        if self.positions.len() < 2 {
            return None;
        }

        let mut total = 0.0f32;
        let mut pairs = 0usize;
        for (prev, curr) in self.positions.iter().zip(self.positions.iter().skip(1)) {
            total += prev.distance(*curr);
            pairs += 1;
        }
        Some(total / pairs as f32)
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl Default for StabilityTracker {
    fn default() -> Self {
        Self::new(DEFAULT_STABILITY_WINDOW)
    }
}
