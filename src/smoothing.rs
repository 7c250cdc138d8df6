// src/smoothing.rs - Exponential smoothing of palm and finger poses
use crate::geometry::{FingerPose, HandPose, PalmPose};
use nalgebra::Point2;
use std::f64::consts::{PI, TAU};

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

pub fn lerp_point(a: Point2<f64>, b: Point2<f64>, t: f64) -> Point2<f64> {
    Point2::new(lerp(a.x, b.x, t), lerp(a.y, b.y, t))
}

/// Wraps an angle difference into (-PI, PI].
pub fn wrap_angle(angle: f64) -> f64 {
    if angle > -PI && angle <= PI {
        return angle;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Interpolates along the shorter arc between two angles.
pub fn lerp_angle(a: f64, b: f64, t: f64) -> f64 {
    wrap_angle(a + wrap_angle(b - a) * t)
}

/// Blended state for one tracked part (palm or a finger).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedPose {
    pub center: Point2<f64>,
    pub angle: f64,
    /// Palm width or finger length.
    pub size: f64,
    /// Palm height; unused for fingers.
    pub size2: f64,
    pub ready: bool,
}

impl Default for SmoothedPose {
    fn default() -> Self {
        Self {
            center: Point2::origin(),
            angle: 0.0,
            size: 0.0,
            size2: 0.0,
            ready: false,
        }
    }
}

impl SmoothedPose {
    /// `alpha` is the weight kept from history. The first observation snaps.
    pub fn update(&mut self, center: Point2<f64>, angle: f64, size: f64, size2: f64, alpha: f64) {
        if !self.ready {
            self.center = center;
            self.angle = wrap_angle(angle);
            self.size = size;
            self.size2 = size2;
            self.ready = true;
            return;
        }

        let t = 1.0 - alpha;
        self.center = lerp_point(self.center, center, t);
        self.angle = lerp_angle(self.angle, angle, t);
        self.size = lerp(self.size, size, t);
        self.size2 = lerp(self.size2, size2, t);
    }

    pub fn palm(&self) -> PalmPose {
        PalmPose {
            center: self.center,
            angle: self.angle,
            width: self.size,
            height: self.size2,
        }
    }

    pub fn finger(&self) -> FingerPose {
        FingerPose {
            center: self.center,
            angle: self.angle,
            length: self.size,
        }
    }
}

/// Smoothing state for the palm and five fingers. Never reset once primed.
#[derive(Debug, Clone)]
pub struct PoseSmoother {
    alpha: f64,
    palm: SmoothedPose,
    fingers: [SmoothedPose; 5],
}

impl PoseSmoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            palm: SmoothedPose::default(),
            fingers: [SmoothedPose::default(); 5],
        }
    }

    /// Blends an observed hand into the carried state and returns the smoothed hand.
    /// Openness is passed through unsmoothed.
    pub fn update(&mut self, observed: &HandPose) -> HandPose {
        let palm = &observed.palm;
        self.palm
            .update(palm.center, palm.angle, palm.width, palm.height, self.alpha);

        for (state, finger) in self.fingers.iter_mut().zip(observed.fingers.iter()) {
            state.update(finger.center, finger.angle, finger.length, 0.0, self.alpha);
        }

        HandPose {
            palm: self.palm.palm(),
            fingers: self.fingers.map(|f| f.finger()),
            openness: observed.openness,
        }
    }

    pub fn palm(&self) -> &SmoothedPose {
        &self.palm
    }

    pub fn fingers(&self) -> &[SmoothedPose; 5] {
        &self.fingers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::fixtures::hand;
    use crate::geometry::{JointAngleOpenness, PoseExtractor, Viewport};

    #[test]
    fn wrap_angle_range() {
        assert!((wrap_angle(1.5 * PI) + 0.5 * PI).abs() < 1e-12);
        assert!((wrap_angle(-PI) - PI).abs() < 1e-12);
        assert!((wrap_angle(0.5) - 0.5).abs() < 1e-12);
        assert!((wrap_angle(-0.5 - TAU) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn first_observation_snaps() {
        let mut pose = SmoothedPose::default();
        pose.update(Point2::new(10.0, 20.0), 1.0, 5.0, 6.0, 0.75);
        assert!(pose.ready);
        assert_eq!(pose.center, Point2::new(10.0, 20.0));
        assert_eq!(pose.angle, 1.0);
        assert_eq!(pose.size, 5.0);
        assert_eq!(pose.size2, 6.0);
    }

    #[test]
    fn blends_with_alpha_weight() {
        let mut pose = SmoothedPose::default();
        pose.update(Point2::new(0.0, 0.0), 0.0, 0.0, 0.0, 0.75);
        pose.update(Point2::new(100.0, 40.0), 0.4, 8.0, 4.0, 0.75);
        assert!((pose.center.x - 25.0).abs() < 1e-12);
        assert!((pose.center.y - 10.0).abs() < 1e-12);
        assert!((pose.angle - 0.1).abs() < 1e-12);
        assert!((pose.size - 2.0).abs() < 1e-12);
        assert!((pose.size2 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn converges_monotonically_to_constant_input() {
        let mut pose = SmoothedPose::default();
        pose.update(Point2::new(0.0, 0.0), 0.0, 0.0, 0.0, 0.75);

        let target = Point2::new(50.0, -30.0);
        let mut last_err = f64::INFINITY;
        for _ in 0..100 {
            pose.update(target, 2.0, 12.0, 0.0, 0.75);
            let err = (pose.center - target).norm() + (pose.angle - 2.0).abs() + (pose.size - 12.0).abs();
            assert!(err <= last_err);
            last_err = err;
        }
        assert!(last_err < 1e-6);
    }

    #[test]
    fn angle_blend_takes_the_short_way_round() {
        let mut pose = SmoothedPose::default();
        pose.update(Point2::origin(), PI - 0.1, 1.0, 0.0, 0.75);

        // just across the boundary: the true gap is 0.2 rad
        pose.update(Point2::origin(), -PI + 0.1, 1.0, 0.0, 0.75);
        let step = wrap_angle(pose.angle - (PI - 0.1)).abs();
        assert!((step - 0.05).abs() < 1e-9);
        assert!(pose.angle.abs() > PI - 0.2);

        for _ in 0..200 {
            let before = pose.angle;
            pose.update(Point2::origin(), -PI + 0.1, 1.0, 0.0, 0.75);
            assert!(wrap_angle(pose.angle - before).abs() < 0.2);
        }
        assert!(wrap_angle(pose.angle - (-PI + 0.1)).abs() < 1e-6);
    }

    #[test]
    fn lerp_angle_endpoints() {
        assert!((lerp_angle(0.2, 1.2, 0.0) - 0.2).abs() < 1e-12);
        assert!((lerp_angle(0.2, 1.2, 1.0) - 1.2).abs() < 1e-12);
        assert!((lerp_angle(PI - 0.1, -PI + 0.1, 0.5).abs() - PI).abs() < 1e-9);
    }

    #[test]
    fn smoother_tracks_every_part() {
        let extractor = PoseExtractor::new(Box::new(JointAngleOpenness {
            closed_deg: 60.0,
            open_deg: 160.0,
        }));
        let observed = extractor
            .extract(Some(&hand(true)), Viewport::new(200.0, 100.0))
            .unwrap();

        let mut smoother = PoseSmoother::new(0.75);
        let first = smoother.update(&observed);
        assert_eq!(first, observed);
        assert!(smoother.palm().ready);
        assert!(smoother.fingers().iter().all(|f| f.ready));

        let second = smoother.update(&observed);
        assert!((second.palm.center - observed.palm.center).norm() < 1e-9);
        assert_eq!(second.openness, observed.openness);
    }
}
