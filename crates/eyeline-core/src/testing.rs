//! Synthetic face-mesh frames with controllable eye and head geometry.
//!
//! Built for this crate's tests and, behind the `testing` feature, for the
//! tests of dependent crates.

use crate::landmarks::{
    EyeLandmarks, LandmarkFrame, Point, CHIN, LEFT_EYE, LEFT_EYE_ANCHOR, NOSE_TIP,
    REFINED_MESH_POINTS, RIGHT_EYE, RIGHT_EYE_ANCHOR,
};

const EYE_Y: f32 = 0.4;
const LEFT_EYE_X: f32 = 0.4;
const RIGHT_EYE_X: f32 = 0.6;
const NOSE_REACH: f32 = 0.1;

/// Builder for a refined 478-point mesh.
///
/// Defaults: both eyes open with EAR 0.3, eye width 0.1, irises centered,
/// nose level with the eye anchors (head angle 0).
#[derive(Debug, Clone)]
pub struct FaceBuilder {
    left_ear: f32,
    right_ear: f32,
    eye_width: f32,
    head_angle: f32,
    iris_shift: f32,
    iris: bool,
    offset: Point,
}

impl Default for FaceBuilder {
    fn default() -> Self {
        Self {
            left_ear: 0.3,
            right_ear: 0.3,
            eye_width: 0.1,
            head_angle: 0.0,
            iris_shift: 0.0,
            iris: true,
            offset: Point::default(),
        }
    }
}

impl FaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ear(mut self, ear: f32) -> Self {
        self.left_ear = ear;
        self.right_ear = ear;
        self
    }

    pub fn left_ear(mut self, ear: f32) -> Self {
        self.left_ear = ear;
        self
    }

    pub fn right_ear(mut self, ear: f32) -> Self {
        self.right_ear = ear;
        self
    }

    pub fn eye_width(mut self, width: f32) -> Self {
        self.eye_width = width;
        self
    }

    /// Head-angle proxy in radians, as measured from the eye-anchor midpoint.
    pub fn head_angle(mut self, angle: f32) -> Self {
        self.head_angle = angle;
        self
    }

    /// Horizontal iris displacement from the eye corner midpoint.
    pub fn iris_shift(mut self, shift: f32) -> Self {
        self.iris_shift = shift;
        self
    }

    /// Emit a 468-point mesh without iris landmarks.
    pub fn without_iris(mut self) -> Self {
        self.iris = false;
        self
    }

    /// Translate the whole face.
    pub fn offset(mut self, dx: f32, dy: f32) -> Self {
        self.offset = Point::new(dx, dy);
        self
    }

    pub fn build(&self) -> LandmarkFrame {
        let mut points = vec![Point::new(0.5, 0.5); REFINED_MESH_POINTS];

        self.place_eye(&mut points, &LEFT_EYE, LEFT_EYE_X, self.left_ear);
        self.place_eye(&mut points, &RIGHT_EYE, RIGHT_EYE_X, self.right_ear);

        let anchor_mid = points[LEFT_EYE_ANCHOR].midpoint(points[RIGHT_EYE_ANCHOR]);
        points[NOSE_TIP] = Point::new(
            anchor_mid.x + NOSE_REACH * self.head_angle.cos(),
            anchor_mid.y + NOSE_REACH * self.head_angle.sin(),
        );
        points[CHIN] = Point::new(0.5, 0.75);

        if !self.iris {
            points.truncate(crate::landmarks::MESH_POINTS);
        }

        for p in &mut points {
            p.x += self.offset.x;
            p.y += self.offset.y;
        }
        LandmarkFrame::new(points)
    }

    fn place_eye(&self, points: &mut [Point], eye: &EyeLandmarks, cx: f32, ear: f32) {
        let half_w = self.eye_width / 2.0;
        let half_h = ear * self.eye_width / 2.0;

        for &i in &eye.outline {
            points[i] = Point::new(cx, EYE_Y);
        }
        points[eye.horizontal.0] = Point::new(cx - half_w, EYE_Y);
        points[eye.horizontal.1] = Point::new(cx + half_w, EYE_Y);

        for (k, &(upper, lower)) in eye.vertical.iter().enumerate() {
            let x = cx + if k == 0 { -half_w / 2.0 } else { half_w / 2.0 };
            points[upper] = Point::new(x, EYE_Y - half_h);
            points[lower] = Point::new(x, EYE_Y + half_h);
        }
        points[eye.lid.0] = Point::new(cx, EYE_Y - half_h);
        points[eye.lid.1] = Point::new(cx, EYE_Y + half_h);

        let ix = cx + self.iris_shift;
        let r = self.eye_width / 5.0;
        let ring = [
            Point::new(ix + r, EYE_Y),
            Point::new(ix, EYE_Y - r),
            Point::new(ix - r, EYE_Y),
            Point::new(ix, EYE_Y + r),
        ];
        for (&i, p) in eye.iris.iter().zip(ring) {
            points[i] = p;
        }
    }
}
