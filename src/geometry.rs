// src/geometry.rs - Palm and finger poses from MediaPipe hand landmarks
use crate::config::{OpennessMethod, OverlayConfig};
use nalgebra::{Point2, Vector2};

// MediaPipe hand landmark indices
pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_TIP: usize = 20;

pub const LANDMARK_COUNT: usize = 21;

const PALM_BASE: [usize; 5] = [WRIST, INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP];

/// One detected hand: 21 points normalized to the frame, (0,0) top-left.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: [Point2<f64>; LANDMARK_COUNT],
}

impl LandmarkSet {
    pub fn new(points: [Point2<f64>; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// Returns `None` unless exactly 21 points are supplied.
    pub fn from_slice(points: &[(f64, f64)]) -> Option<Self> {
        if points.len() != LANDMARK_COUNT {
            return None;
        }
        let mut out = [Point2::origin(); LANDMARK_COUNT];
        for (dst, &(x, y)) in out.iter_mut().zip(points) {
            *dst = Point2::new(x, y);
        }
        Some(Self { points: out })
    }

    pub fn point(&self, index: usize) -> Point2<f64> {
        self.points[index]
    }

    /// Scales every point into pixel space of the given viewport.
    pub fn to_pixels(&self, viewport: Viewport) -> PixelLandmarks {
        let mut points = self.points;
        for p in points.iter_mut() {
            p.x *= viewport.width;
            p.y *= viewport.height;
        }
        PixelLandmarks { points }
    }
}

/// Landmarks in viewport pixels.
#[derive(Debug, Clone)]
pub struct PixelLandmarks {
    points: [Point2<f64>; LANDMARK_COUNT],
}

impl PixelLandmarks {
    pub fn point(&self, index: usize) -> Point2<f64> {
        self.points[index]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// (base, middle joint, tip) landmark indices.
    pub fn joints(self) -> (usize, usize, usize) {
        match self {
            Finger::Thumb => (THUMB_MCP, THUMB_IP, THUMB_TIP),
            Finger::Index => (INDEX_MCP, INDEX_PIP, INDEX_TIP),
            Finger::Middle => (MIDDLE_MCP, MIDDLE_PIP, MIDDLE_TIP),
            Finger::Ring => (RING_MCP, RING_PIP, RING_TIP),
            Finger::Pinky => (PINKY_MCP, PINKY_PIP, PINKY_TIP),
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PalmPose {
    pub center: Point2<f64>,
    /// Direction from the wrist to the middle knuckle, radians.
    pub angle: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerPose {
    pub center: Point2<f64>,
    /// Direction from base to tip, radians.
    pub angle: f64,
    pub length: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandPose {
    pub palm: PalmPose,
    pub fingers: [FingerPose; 5],
    /// Per-finger openness in [0, 1], indexed like [`Finger::ALL`].
    pub openness: [f64; 5],
}

pub fn direction(from: Point2<f64>, to: Point2<f64>) -> f64 {
    let d = to - from;
    d.y.atan2(d.x)
}

pub fn palm_pose(lm: &PixelLandmarks) -> PalmPose {
    let sum = PALM_BASE
        .iter()
        .fold(Vector2::zeros(), |acc, &i| acc + lm.point(i).coords);
    let center = Point2::from(sum / PALM_BASE.len() as f64);

    PalmPose {
        center,
        angle: direction(lm.point(WRIST), lm.point(MIDDLE_MCP)),
        width: nalgebra::distance(&lm.point(INDEX_MCP), &lm.point(PINKY_MCP)),
        height: nalgebra::distance(&lm.point(WRIST), &lm.point(MIDDLE_MCP)),
    }
}

pub fn finger_pose(lm: &PixelLandmarks, finger: Finger) -> FingerPose {
    let (base, _, tip) = finger.joints();
    let base = lm.point(base);
    let tip = lm.point(tip);

    FingerPose {
        center: nalgebra::center(&base, &tip),
        angle: direction(base, tip),
        length: nalgebra::distance(&base, &tip),
    }
}

/// Interior angle at `joint` between the segments to `a` and `b`, in degrees.
/// Degenerate segments count as a straight joint.
pub fn joint_angle_deg(a: Point2<f64>, joint: Point2<f64>, b: Point2<f64>) -> f64 {
    let v1 = a - joint;
    let v2 = b - joint;
    let mag1 = v1.norm();
    let mag2 = v2.norm();

    if mag1 < 1e-9 || mag2 < 1e-9 {
        return 180.0;
    }

    let cos_angle = (v1.dot(&v2) / (mag1 * mag2)).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees()
}

/// Maps a finger to how extended it is, 0 = curled into the palm, 1 = straight.
pub trait OpennessStrategy: Send {
    fn openness(&self, lm: &PixelLandmarks, palm: &PalmPose, finger: Finger) -> f64;
}

/// Rotation- and scale-invariant: reads the bend at the middle joint.
#[derive(Debug, Clone, Copy)]
pub struct JointAngleOpenness {
    pub closed_deg: f64,
    pub open_deg: f64,
}

impl OpennessStrategy for JointAngleOpenness {
    fn openness(&self, lm: &PixelLandmarks, _palm: &PalmPose, finger: Finger) -> f64 {
        let (base, mid, tip) = finger.joints();
        let angle = joint_angle_deg(lm.point(base), lm.point(mid), lm.point(tip));
        ((angle - self.closed_deg) / (self.open_deg - self.closed_deg)).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LengthRatioOpenness {
    /// Finger length, in palm heights, that counts as fully open.
    pub full_ratio: f64,
}

impl OpennessStrategy for LengthRatioOpenness {
    fn openness(&self, lm: &PixelLandmarks, palm: &PalmPose, finger: Finger) -> f64 {
        if palm.height <= f64::EPSILON {
            return 0.0;
        }
        let length = finger_pose(lm, finger).length;
        (length / (palm.height * self.full_ratio)).clamp(0.0, 1.0)
    }
}

pub fn openness_strategy(config: &OverlayConfig) -> Box<dyn OpennessStrategy> {
    match config.openness_method {
        OpennessMethod::JointAngle => Box::new(JointAngleOpenness {
            closed_deg: config.closed_angle_deg,
            open_deg: config.open_angle_deg,
        }),
        OpennessMethod::LengthRatio => Box::new(LengthRatioOpenness {
            full_ratio: config.length_full_ratio,
        }),
    }
}

/// Three-level discretization of openness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curl {
    Closed,
    Partial,
    Open,
}

impl Curl {
    pub fn from_openness(openness: f64, partial_threshold: f64, open_threshold: f64) -> Self {
        if openness >= open_threshold {
            Curl::Open
        } else if openness >= partial_threshold {
            Curl::Partial
        } else {
            Curl::Closed
        }
    }

    pub fn blend_factor(self) -> f64 {
        match self {
            Curl::Closed => 0.0,
            Curl::Partial => 0.5,
            Curl::Open => 1.0,
        }
    }
}

/// Converts one frame's landmarks into palm and finger poses.
pub struct PoseExtractor {
    strategy: Box<dyn OpennessStrategy>,
}

impl PoseExtractor {
    pub fn new(strategy: Box<dyn OpennessStrategy>) -> Self {
        Self { strategy }
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::new(openness_strategy(config))
    }

    /// No landmarks means no pose; the caller skips the frame.
    pub fn extract(&self, landmarks: Option<&LandmarkSet>, viewport: Viewport) -> Option<HandPose> {
        let lm = landmarks?.to_pixels(viewport);
        let palm = palm_pose(&lm);

        let fingers = Finger::ALL.map(|f| finger_pose(&lm, f));
        let openness = Finger::ALL.map(|f| self.strategy.openness(&lm, &palm, f));

        Some(HandPose {
            palm,
            fingers,
            openness,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// An upright right hand (fingers pointing to -y) in normalized space.
    /// `open` straightens every finger, otherwise the tips fold back over the palm.
    pub fn hand(open: bool) -> LandmarkSet {
        let mut pts = [(0.0, 0.0); LANDMARK_COUNT];
        pts[WRIST] = (0.5, 0.8);
        pts[THUMB_CMC] = (0.42, 0.74);
        pts[THUMB_MCP] = (0.38, 0.68);
        pts[THUMB_IP] = (0.38, 0.62);
        pts[THUMB_TIP] = if open { (0.38, 0.56) } else { (0.38, 0.66) };

        for (mcp, x) in [(INDEX_MCP, 0.44), (MIDDLE_MCP, 0.50), (RING_MCP, 0.56), (PINKY_MCP, 0.62)] {
            pts[mcp] = (x, 0.6);
            pts[mcp + 1] = (x, 0.54);
            if open {
                pts[mcp + 2] = (x, 0.48);
                pts[mcp + 3] = (x, 0.42);
            } else {
                // folded back past the middle joint
                pts[mcp + 2] = (x, 0.58);
                pts[mcp + 3] = (x, 0.61);
            }
        }
        LandmarkSet::from_slice(&pts).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::hand;
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    fn viewport() -> Viewport {
        Viewport::new(100.0, 100.0)
    }

    fn angle_strategy() -> JointAngleOpenness {
        JointAngleOpenness {
            closed_deg: 60.0,
            open_deg: 160.0,
        }
    }

    #[test]
    fn rejects_wrong_landmark_count() {
        assert!(LandmarkSet::from_slice(&[(0.0, 0.0); 20]).is_none());
        assert!(LandmarkSet::from_slice(&[(0.0, 0.0); 22]).is_none());
    }

    #[test]
    fn palm_pose_uses_base_landmarks() {
        let lm = hand(true).to_pixels(viewport());
        let palm = palm_pose(&lm);

        // (50 + 44 + 50 + 56 + 62) / 5, (80 + 60 * 4) / 5
        assert!((palm.center.x - 52.4).abs() < EPS);
        assert!((palm.center.y - 64.0).abs() < EPS);
        assert!((palm.width - 18.0).abs() < EPS);
        assert!((palm.height - 20.0).abs() < EPS);
        // wrist -> middle knuckle points straight up in image space
        assert!((palm.angle + FRAC_PI_2).abs() < EPS);
    }

    #[test]
    fn finger_pose_spans_base_to_tip() {
        let lm = hand(true).to_pixels(viewport());
        let index = finger_pose(&lm, Finger::Index);

        assert!((index.center.x - 44.0).abs() < EPS);
        assert!((index.center.y - 51.0).abs() < EPS);
        assert!((index.length - 18.0).abs() < EPS);
        assert!((index.angle + FRAC_PI_2).abs() < EPS);
    }

    #[test]
    fn joint_angle_for_straight_and_right_angles() {
        let a = Point2::new(0.0, 0.0);
        let j = Point2::new(1.0, 0.0);
        assert!((joint_angle_deg(a, j, Point2::new(2.0, 0.0)) - 180.0).abs() < 1e-6);
        assert!((joint_angle_deg(a, j, Point2::new(1.0, 1.0)) - 90.0).abs() < 1e-6);
        assert_eq!(joint_angle_deg(a, a, j), 180.0);
    }

    #[test]
    fn joint_angle_openness_separates_open_and_closed() {
        let strategy = angle_strategy();
        let open = hand(true).to_pixels(viewport());
        let closed = hand(false).to_pixels(viewport());
        let palm = palm_pose(&open);

        for finger in Finger::ALL {
            assert_eq!(strategy.openness(&open, &palm, finger), 1.0);
            assert_eq!(strategy.openness(&closed, &palm, finger), 0.0);
        }
    }

    #[test]
    fn joint_angle_openness_is_scale_invariant() {
        let strategy = angle_strategy();
        let small = hand(true).to_pixels(Viewport::new(100.0, 100.0));
        let large = hand(true).to_pixels(Viewport::new(1000.0, 1000.0));
        let palm_small = palm_pose(&small);
        let palm_large = palm_pose(&large);

        for finger in Finger::ALL {
            let a = strategy.openness(&small, &palm_small, finger);
            let b = strategy.openness(&large, &palm_large, finger);
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn length_ratio_openness_clamps() {
        let strategy = LengthRatioOpenness { full_ratio: 1.0 };
        let lm = hand(true).to_pixels(viewport());
        let palm = palm_pose(&lm);
        // 18 px finger over a 20 px palm
        let o = strategy.openness(&lm, &palm, Finger::Middle);
        assert!((o - 0.9).abs() < 1e-9);

        let generous = LengthRatioOpenness { full_ratio: 0.5 };
        assert_eq!(generous.openness(&lm, &palm, Finger::Middle), 1.0);
    }

    #[test]
    fn extractor_yields_nothing_without_landmarks() {
        let extractor = PoseExtractor::new(Box::new(angle_strategy()));
        assert!(extractor.extract(None, viewport()).is_none());

        let pose = extractor.extract(Some(&hand(true)), viewport()).unwrap();
        assert_eq!(pose.openness, [1.0; 5]);
    }

    #[test]
    fn curl_buckets() {
        assert_eq!(Curl::from_openness(0.1, 0.33, 0.66), Curl::Closed);
        assert_eq!(Curl::from_openness(0.33, 0.33, 0.66), Curl::Partial);
        assert_eq!(Curl::from_openness(0.9, 0.33, 0.66), Curl::Open);
        assert_eq!(Curl::Partial.blend_factor(), 0.5);
    }
}
