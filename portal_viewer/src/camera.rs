//! The orbiting camera rig and its screen-space projection.
//!
//! The scene core only issues one-shot look-at commands; everything about
//! how the camera actually moves lives here. The rig keeps an orbital frame
//! (yaw, polar angle, distance) around a focus point and eases the whole
//! frame toward the latest command with the same exponential pull used for
//! stage blends, just on its own time constant.

use std::f32::consts::PI;

use glam::{Mat4, Vec3, Vec4};
use portal_scene::{settle_fraction, CameraPose};

/// Vertical field of view of the stage view.
const FOV_Y: f32 = 50.0 * PI / 180.0;
const NEAR_CLIP: f32 = 0.1;
const FAR_CLIP: f32 = 100.0;

/// Polar band the rig may occupy, measured from the vertical axis. The
/// lower bound keeps the camera from flipping over the top; the upper bound
/// keeps it at or above the stage plane.
pub const POLAR_MIN: f32 = PI / 6.0;
pub const POLAR_MAX: f32 = PI / 2.0;

/// Rig smoothing time constant, seconds. Deliberately not the stage blend
/// constant; the rig is collaborator smoothing, not part of the core
/// contract.
const RIG_TIME_CONSTANT: f32 = 0.25;

/// Radians of orbit per pixel of mouse drag.
const DRAG_SENSITIVITY: f32 = 0.008;

const MIN_RADIUS: f32 = 0.5;

/// Orbital camera state: a current frame easing toward a goal frame.
#[derive(Debug, Clone)]
pub struct OrbitRig {
    yaw: f32,
    polar: f32,
    radius: f32,
    focus: Vec3,
    goal_yaw: f32,
    goal_polar: f32,
    goal_radius: f32,
    goal_focus: Vec3,
}

impl OrbitRig {
    /// Start the rig resting exactly on a commanded pose.
    pub fn from_pose(pose: &CameraPose) -> Self {
        let (yaw, polar, radius) = decompose(pose.eye_vec(), pose.target_vec());
        Self {
            yaw,
            polar,
            radius,
            focus: pose.target_vec(),
            goal_yaw: yaw,
            goal_polar: polar,
            goal_radius: radius,
            goal_focus: pose.target_vec(),
        }
    }

    /// Accept a new look-at command. The current frame is left alone and
    /// eases over on subsequent [`OrbitRig::advance`] calls.
    pub fn retarget(&mut self, pose: &CameraPose) {
        let (yaw, polar, radius) = decompose(pose.eye_vec(), pose.target_vec());
        self.goal_yaw = yaw;
        self.goal_polar = polar;
        self.goal_radius = radius;
        self.goal_focus = pose.target_vec();
    }

    /// Orbit by a mouse drag delta in pixels. The drag steers the goal
    /// frame; the ease keeps the motion smooth.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.goal_yaw = wrap_angle(self.goal_yaw - dx * DRAG_SENSITIVITY);
        self.goal_polar = (self.goal_polar - dy * DRAG_SENSITIVITY).clamp(POLAR_MIN, POLAR_MAX);
    }

    /// Pull the current frame toward the goal frame by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        let pull = settle_fraction(RIG_TIME_CONSTANT, dt);
        self.yaw = wrap_angle(self.yaw + wrap_angle(self.goal_yaw - self.yaw) * pull);
        self.polar += (self.goal_polar - self.polar) * pull;
        self.radius += (self.goal_radius - self.radius) * pull;
        self.focus = self.focus.lerp(self.goal_focus, pull);
    }

    pub fn eye(&self) -> Vec3 {
        self.focus + orbit_direction(self.yaw, self.polar) * self.radius
    }

    pub fn focus(&self) -> Vec3 {
        self.focus
    }

    /// Projection through the rig's current frame, or `None` for a
    /// degenerate surface size.
    pub fn projector(&self, aspect_ratio: f32) -> Option<CameraProjector> {
        CameraProjector::new(self.eye(), self.focus, aspect_ratio)
    }
}

/// Unit vector from the focus toward the eye for an orbital frame.
fn orbit_direction(yaw: f32, polar: f32) -> Vec3 {
    Vec3::new(polar.sin() * yaw.sin(), polar.cos(), polar.sin() * yaw.cos())
}

/// Split an eye/focus pair into (yaw, polar, radius), clamping into the
/// rig's legal band.
fn decompose(eye: Vec3, focus: Vec3) -> (f32, f32, f32) {
    let offset = eye - focus;
    let radius = offset.length().max(MIN_RADIUS);
    let polar = (offset.y / radius).clamp(-1.0, 1.0).acos();
    let yaw = if offset.x == 0.0 && offset.z == 0.0 {
        0.0
    } else {
        offset.x.atan2(offset.z)
    };
    (yaw, polar.clamp(POLAR_MIN, POLAR_MAX), radius)
}

/// Map an angle difference into (-pi, pi] so easing always takes the short
/// way around.
fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI { PI } else { wrapped }
}

/// World-to-NDC projection for marker placement and cursor hit-testing.
#[derive(Debug, Clone)]
pub struct CameraProjector {
    view_projection: Mat4,
}

/// A world point on screen: NDC coordinates plus its perspective depth
/// (larger is farther from the eye).
#[derive(Debug, Clone, Copy)]
pub struct ProjectedPoint {
    pub ndc: [f32; 2],
    pub depth: f32,
}

impl CameraProjector {
    pub fn new(eye: Vec3, target: Vec3, aspect_ratio: f32) -> Option<Self> {
        if !aspect_ratio.is_finite() || aspect_ratio <= 0.0 {
            return None;
        }
        let forward = target - eye;
        if forward.length_squared() <= f32::EPSILON {
            return None;
        }

        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let projection = Mat4::perspective_rh(FOV_Y, aspect_ratio, NEAR_CLIP, FAR_CLIP);
        Some(Self {
            view_projection: projection * view,
        })
    }

    pub fn matrix(&self) -> Mat4 {
        self.view_projection
    }

    pub fn project(&self, position: Vec3) -> Option<ProjectedPoint> {
        let clip = self.view_projection * Vec4::new(position.x, position.y, position.z, 1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        if !ndc.x.is_finite() || !ndc.y.is_finite() {
            return None;
        }
        Some(ProjectedPoint {
            ndc: [ndc.x, ndc.y],
            depth: clip.w,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_scene::{ACTIVE_EYE, DEFAULT_EYE};

    fn close(a: Vec3, b: Vec3, tolerance: f32) -> bool {
        (a - b).length() <= tolerance
    }

    #[test]
    fn rig_round_trips_the_default_pose() {
        let rig = OrbitRig::from_pose(&CameraPose::default());
        assert!(close(rig.eye(), DEFAULT_EYE, 1e-4), "eye {:?}", rig.eye());
        assert!(close(rig.focus(), Vec3::ZERO, 1e-6));
    }

    #[test]
    fn rig_settles_onto_a_retargeted_pose() {
        let mut rig = OrbitRig::from_pose(&CameraPose::default());
        let stage_focus = Vec3::new(-2.5, 0.0, -0.5);
        rig.retarget(&CameraPose::new(ACTIVE_EYE, stage_focus));

        rig.advance(10.0);
        assert!(close(rig.eye(), ACTIVE_EYE, 1e-2), "eye {:?}", rig.eye());
        assert!(close(rig.focus(), stage_focus, 1e-3));
    }

    #[test]
    fn easing_moves_part_way_each_step() {
        let mut rig = OrbitRig::from_pose(&CameraPose::default());
        rig.retarget(&CameraPose::new(ACTIVE_EYE, Vec3::ZERO));

        let start_distance = (rig.eye() - ACTIVE_EYE).length();
        rig.advance(0.25);
        let after_one = (rig.eye() - ACTIVE_EYE).length();
        rig.advance(0.25);
        let after_two = (rig.eye() - ACTIVE_EYE).length();

        assert!(after_one < start_distance);
        assert!(after_two < after_one);
    }

    #[test]
    fn dragging_stays_inside_the_polar_band() {
        let mut rig = OrbitRig::from_pose(&CameraPose::default());

        // Drag far past both ends of the band, settling after each.
        rig.orbit(0.0, -10_000.0);
        rig.advance(100.0);
        let height = (rig.eye() - rig.focus()).y;
        let radius = (rig.eye() - rig.focus()).length();
        assert!(height <= radius * POLAR_MIN.cos() + 1e-3, "over the top");

        rig.orbit(0.0, 10_000.0);
        rig.advance(100.0);
        let height = (rig.eye() - rig.focus()).y;
        assert!(height >= -1e-3, "below the stage plane");
    }

    #[test]
    fn yaw_easing_takes_the_short_way_around() {
        assert!((wrap_angle(2.0 * PI + 0.1) - 0.1).abs() < 1e-5);
        assert!((wrap_angle(-2.0 * PI - 0.1) + 0.1).abs() < 1e-5);
        assert!((wrap_angle(PI) - PI).abs() < 1e-5);

        let mut rig = OrbitRig::from_pose(&CameraPose::default());
        // A full lap of drag must not leave the rig unwinding for laps.
        rig.orbit(2.0 * PI / DRAG_SENSITIVITY, 0.0);
        rig.advance(100.0);
        assert!(close(rig.eye(), DEFAULT_EYE, 1e-2), "eye {:?}", rig.eye());
    }

    #[test]
    fn projector_centres_the_focus_and_orders_depth() {
        let projector =
            CameraProjector::new(DEFAULT_EYE, Vec3::ZERO, 16.0 / 9.0).expect("projector");

        let centre = projector.project(Vec3::ZERO).expect("focus projects");
        assert!(centre.ndc[0].abs() < 1e-5);
        assert!(centre.ndc[1].abs() < 1e-5);
        assert!((centre.depth - 10.0).abs() < 1e-4);

        let near = projector.project(Vec3::new(0.0, 0.0, 4.0)).expect("near");
        assert!(near.depth < centre.depth);

        let right = projector.project(Vec3::new(1.0, 0.0, 0.0)).expect("right");
        let above = projector.project(Vec3::new(0.0, 1.0, 0.0)).expect("above");
        assert!(right.ndc[0] > 0.0);
        assert!(above.ndc[1] > 0.0);
    }

    #[test]
    fn points_behind_the_eye_do_not_project() {
        let projector =
            CameraProjector::new(DEFAULT_EYE, Vec3::ZERO, 1.0).expect("projector");
        assert!(projector.project(Vec3::new(0.0, 0.0, 20.0)).is_none());
        assert!(CameraProjector::new(DEFAULT_EYE, DEFAULT_EYE, 1.0).is_none());
        assert!(CameraProjector::new(DEFAULT_EYE, Vec3::ZERO, 0.0).is_none());
    }
}
