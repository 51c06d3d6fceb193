//! Geometric feature extraction: eye aspect ratio, head-angle proxy, iris centering.
//!
//! Every function here is a pure function of one [`LandmarkFrame`] and the
//! fixed index tables in [`crate::landmarks`]. A missing or non-finite
//! landmark yields a [`FeatureError`] for that feature only; the rest of the
//! frame is still extracted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::landmarks::{
    EyeLandmarks, LandmarkFrame, Point, LEFT_EYE, LEFT_EYE_ANCHOR, NOSE_TIP, RIGHT_EYE,
    RIGHT_EYE_ANCHOR,
};

/// Guard added to horizontal spans so edge-on faces never divide by zero.
pub const SPAN_EPSILON: f32 = 1e-6;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureError {
    #[error("landmark {index} missing (frame has {len} points)")]
    MissingLandmark { index: usize, len: usize },
    #[error("landmark {index} has non-finite coordinates")]
    NonFinite { index: usize },
}

/// `(‖v1‖ + ‖v2‖) / (2·‖h‖ + ε)`.
///
/// Always finite for finite inputs, including `h == 0`.
pub fn aspect_ratio(v1: f32, v2: f32, h: f32) -> f32 {
    (v1 + v2) / (2.0 * h + SPAN_EPSILON)
}

/// Per-eye geometry for a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeGeometry {
    pub aspect_ratio: f32,
    /// Mean of the 16 outline points.
    pub center: Point,
    pub corner_outer: Point,
    pub corner_inner: Point,
    /// Vertical distance between the mid-lid landmarks.
    pub lid_gap: f32,
}

impl EyeGeometry {
    pub fn width(&self) -> f32 {
        self.corner_outer.distance(self.corner_inner)
    }

    pub fn corner_midpoint(&self) -> Point {
        self.corner_outer.midpoint(self.corner_inner)
    }
}

/// Compute the eye aspect ratio alone.
pub fn eye_aspect_ratio(frame: &LandmarkFrame, eye: &EyeLandmarks) -> Result<f32, FeatureError> {
    let [a1, b1, a2, b2] = frame.select(&[
        eye.vertical[0].0,
        eye.vertical[0].1,
        eye.vertical[1].0,
        eye.vertical[1].1,
    ])?;
    let [outer, inner] = frame.select(&[eye.horizontal.0, eye.horizontal.1])?;
    Ok(aspect_ratio(a1.distance(b1), a2.distance(b2), outer.distance(inner)))
}

/// Extract the full geometry of one eye.
pub fn eye_geometry(frame: &LandmarkFrame, eye: &EyeLandmarks) -> Result<EyeGeometry, FeatureError> {
    let aspect_ratio = eye_aspect_ratio(frame, eye)?;
    let outline = frame.select(&eye.outline)?;
    let [corner_outer, corner_inner] = frame.select(&[eye.horizontal.0, eye.horizontal.1])?;
    let [upper, lower] = frame.select(&[eye.lid.0, eye.lid.1])?;

    Ok(EyeGeometry {
        aspect_ratio,
        center: Point::mean(&outline),
        corner_outer,
        corner_inner,
        lid_gap: upper.distance(lower),
    })
}

/// Offset of the iris center from the corner midpoint, as a fraction of eye width.
pub fn pupil_offset(frame: &LandmarkFrame, eye: &EyeLandmarks) -> Result<f32, FeatureError> {
    let iris = frame.select(&eye.iris)?;
    let [outer, inner] = frame.select(&[eye.horizontal.0, eye.horizontal.1])?;
    let iris_center = Point::mean(&iris);
    let width = outer.distance(inner);
    Ok(iris_center.distance(outer.midpoint(inner)) / (width + SPAN_EPSILON))
}

/// Coarse head orientation derived from the 2D nose/eye geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadDirection {
    #[default]
    Center,
    Up,
    Down,
    Side,
}

/// 2D head-angle proxy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPose {
    /// `atan2(nose.y − eyeCenter.y, nose.x − eyeCenter.x)` in radians.
    pub angle: f32,
    /// Nose offset from the eye center, image x.
    pub dx: f32,
    /// Nose offset from the eye center, image y (positive = down).
    pub dy: f32,
}

impl HeadPose {
    pub fn from_points(nose: Point, left_eye: Point, right_eye: Point) -> Self {
        let eye_center = left_eye.midpoint(right_eye);
        let dx = nose.x - eye_center.x;
        let dy = nose.y - eye_center.y;
        Self {
            angle: dy.atan2(dx),
            dx,
            dy,
        }
    }

    pub fn is_facing(&self, angle_threshold: f32) -> bool {
        self.angle.abs() < angle_threshold
    }

    /// Classify the pose. Within the angle threshold the head counts as
    /// centered; otherwise the dominant axis of the nose vector decides.
    pub fn direction(&self, angle_threshold: f32) -> HeadDirection {
        if self.is_facing(angle_threshold) {
            HeadDirection::Center
        } else if self.dx.abs() >= self.dy.abs() {
            HeadDirection::Side
        } else if self.dy > 0.0 {
            HeadDirection::Down
        } else {
            HeadDirection::Up
        }
    }
}

pub fn head_pose(frame: &LandmarkFrame) -> Result<HeadPose, FeatureError> {
    let [nose, left, right] = frame.select(&[NOSE_TIP, LEFT_EYE_ANCHOR, RIGHT_EYE_ANCHOR])?;
    Ok(HeadPose::from_points(nose, left, right))
}

/// Every geometric feature of one frame, each independently valid or invalid.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceFeatures {
    pub left: Result<EyeGeometry, FeatureError>,
    pub right: Result<EyeGeometry, FeatureError>,
    pub head: Result<HeadPose, FeatureError>,
    pub left_pupil: Result<f32, FeatureError>,
    pub right_pupil: Result<f32, FeatureError>,
}

impl FaceFeatures {
    pub fn extract(frame: &LandmarkFrame) -> Self {
        Self {
            left: eye_geometry(frame, &LEFT_EYE),
            right: eye_geometry(frame, &RIGHT_EYE),
            head: head_pose(frame),
            left_pupil: pupil_offset(frame, &LEFT_EYE),
            right_pupil: pupil_offset(frame, &RIGHT_EYE),
        }
    }

    /// Both eyes, only when both are valid.
    pub fn eyes(&self) -> Option<(&EyeGeometry, &EyeGeometry)> {
        match (&self.left, &self.right) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        }
    }

    /// Enough landmarks to evaluate either the eyes or the head pose.
    pub fn is_usable(&self) -> bool {
        self.eyes().is_some() || self.head.is_ok()
    }

    pub fn mean_aspect_ratio(&self) -> Option<f32> {
        self.eyes()
            .map(|(l, r)| (l.aspect_ratio + r.aspect_ratio) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FaceBuilder;

    #[test]
    fn test_aspect_ratio_zero_span_is_finite() {
        let ear = aspect_ratio(0.02, 0.02, 0.0);
        assert!(ear.is_finite());
        assert!(ear > 0.0);
    }

    #[test]
    fn test_aspect_ratio_all_zero_is_zero() {
        assert_eq!(aspect_ratio(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_synthetic_eye_ear_matches_target() {
        let frame = FaceBuilder::new().ear(0.3).build();
        let left = eye_aspect_ratio(&frame, &LEFT_EYE).unwrap();
        let right = eye_aspect_ratio(&frame, &RIGHT_EYE).unwrap();
        assert!((left - 0.3).abs() < 1e-3, "left EAR {left}");
        assert!((right - 0.3).abs() < 1e-3, "right EAR {right}");
    }

    #[test]
    fn test_degenerate_horizontal_span() {
        let frame = FaceBuilder::new().eye_width(0.0).build();
        let ear = eye_aspect_ratio(&frame, &LEFT_EYE).unwrap();
        assert!(ear.is_finite());
    }

    #[test]
    fn test_short_frame_invalidates_features() {
        let frame = LandmarkFrame::new(vec![Point::new(0.5, 0.5); 100]);
        let features = FaceFeatures::extract(&frame);
        assert!(matches!(
            features.left,
            Err(FeatureError::MissingLandmark { .. })
        ));
        assert!(features.eyes().is_none());
        assert!(features.mean_aspect_ratio().is_none());
        assert!(!features.is_usable());
    }

    #[test]
    fn test_unrefined_mesh_keeps_eye_features() {
        let frame = FaceBuilder::new().without_iris().build();
        let features = FaceFeatures::extract(&frame);
        assert!(features.left.is_ok());
        assert!(features.head.is_ok());
        assert!(features.left_pupil.is_err());
    }

    #[test]
    fn test_head_angle_zero_when_nose_level_with_eyes() {
        let frame = FaceBuilder::new().head_angle(0.0).build();
        let pose = head_pose(&frame).unwrap();
        assert!(pose.angle.abs() < 1e-4);
        assert_eq!(pose.direction(0.3), HeadDirection::Center);
    }

    #[test]
    fn test_head_direction_classification() {
        let eye = Point::new(0.5, 0.4);
        let down = HeadPose::from_points(Point::new(0.5, 0.5), eye, eye);
        assert_eq!(down.direction(0.3), HeadDirection::Down);

        let up = HeadPose::from_points(Point::new(0.5, 0.3), eye, eye);
        assert_eq!(up.direction(0.3), HeadDirection::Up);

        let side = HeadPose::from_points(Point::new(0.4, 0.42), eye, eye);
        assert_eq!(side.direction(0.3), HeadDirection::Side);
    }

    #[test]
    fn test_centered_iris_has_small_offset() {
        let frame = FaceBuilder::new().build();
        let offset = pupil_offset(&frame, &LEFT_EYE).unwrap();
        assert!(offset < 1e-3, "offset {offset}");
    }

    #[test]
    fn test_shifted_iris_offset_is_fraction_of_width() {
        // Eye width 0.1, iris shifted by 0.03 → offset 0.3.
        let frame = FaceBuilder::new().eye_width(0.1).iris_shift(0.03).build();
        let offset = pupil_offset(&frame, &RIGHT_EYE).unwrap();
        assert!((offset - 0.3).abs() < 1e-3, "offset {offset}");
    }

    #[test]
    fn test_lid_gap_tracks_openness() {
        let open = FaceBuilder::new().ear(0.3).build();
        let closed = FaceBuilder::new().ear(0.05).build();
        let open_gap = eye_geometry(&open, &LEFT_EYE).unwrap().lid_gap;
        let closed_gap = eye_geometry(&closed, &LEFT_EYE).unwrap().lid_gap;
        assert!(open_gap > closed_gap);
    }
}
