//! Cursor-to-stage resolution.
//!
//! Each stage frame is a fixed-size quad in world space. Hit testing projects
//! the four frame corners through the camera, takes the screen-space bounding
//! rectangle, and maps the cursor into the same normalized coordinates. When
//! rectangles overlap, the stage closest to the eye wins.

use glam::{Mat4, Vec3};
use portal_scene::stage::{FRAME_HEIGHT, FRAME_WIDTH};
use portal_scene::StageId;
use winit::dpi::{PhysicalPosition, PhysicalSize};

use crate::camera::CameraProjector;

/// Screen-space footprint of one stage frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameBounds {
    min: [f32; 2],
    max: [f32; 2],
    depth: f32,
}

impl FrameBounds {
    pub fn contains(&self, ndc: [f32; 2]) -> bool {
        ndc[0] >= self.min[0]
            && ndc[0] <= self.max[0]
            && ndc[1] >= self.min[1]
            && ndc[1] <= self.max[1]
    }

    /// Distance from the eye to the frame center, used to break overlap ties.
    pub fn depth(&self) -> f32 {
        self.depth
    }
}

/// Maps a window cursor position into normalized device coordinates.
pub fn cursor_to_ndc(
    position: PhysicalPosition<f64>,
    size: PhysicalSize<u32>,
) -> Option<[f32; 2]> {
    if size.width == 0 || size.height == 0 {
        return None;
    }
    let x = (position.x / size.width as f64) as f32 * 2.0 - 1.0;
    let y = 1.0 - (position.y / size.height as f64) as f32 * 2.0;
    Some([x, y])
}

/// Projects one stage's frame rectangle into screen space.
///
/// Returns `None` when any corner lands behind the eye; a frame that close is
/// not hoverable.
pub fn project_frame_bounds(projector: &CameraProjector, model: &Mat4) -> Option<FrameBounds> {
    let half_width = FRAME_WIDTH / 2.0;
    let half_height = FRAME_HEIGHT / 2.0;
    let corners = [
        Vec3::new(-half_width, -half_height, 0.0),
        Vec3::new(half_width, -half_height, 0.0),
        Vec3::new(-half_width, half_height, 0.0),
        Vec3::new(half_width, half_height, 0.0),
    ];

    let mut min = [f32::INFINITY; 2];
    let mut max = [f32::NEG_INFINITY; 2];
    for corner in corners {
        let projected = projector.project(model.transform_point3(corner))?;
        min[0] = min[0].min(projected.ndc[0]);
        min[1] = min[1].min(projected.ndc[1]);
        max[0] = max[0].max(projected.ndc[0]);
        max[1] = max[1].max(projected.ndc[1]);
    }
    let center = projector.project(model.transform_point3(Vec3::ZERO))?;
    Some(FrameBounds {
        min,
        max,
        depth: center.depth,
    })
}

/// Picks the stage under the cursor, nearest first when frames overlap.
pub fn pick_stage(bounds: &[(StageId, FrameBounds)], cursor_ndc: [f32; 2]) -> Option<StageId> {
    bounds
        .iter()
        .filter(|(_, rect)| rect.contains(cursor_ndc))
        .min_by(|(_, a), (_, b)| a.depth.total_cmp(&b.depth))
        .map(|(id, _)| *id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_scene::PortalScene;

    fn straight_on_projector() -> CameraProjector {
        CameraProjector::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, 1.0)
            .expect("projector for a straight-on camera")
    }

    #[test]
    fn cursor_corners_map_to_ndc_corners() {
        let size = PhysicalSize::new(800, 600);
        let top_left = cursor_to_ndc(PhysicalPosition::new(0.0, 0.0), size).unwrap();
        assert!((top_left[0] + 1.0).abs() < 1e-6);
        assert!((top_left[1] - 1.0).abs() < 1e-6);
        let middle = cursor_to_ndc(PhysicalPosition::new(400.0, 300.0), size).unwrap();
        assert!(middle[0].abs() < 1e-6 && middle[1].abs() < 1e-6);
        let bottom_right = cursor_to_ndc(PhysicalPosition::new(800.0, 600.0), size).unwrap();
        assert!((bottom_right[0] - 1.0).abs() < 1e-6);
        assert!((bottom_right[1] + 1.0).abs() < 1e-6);
        assert!(
            cursor_to_ndc(PhysicalPosition::new(10.0, 10.0), PhysicalSize::new(0, 0)).is_none()
        );
    }

    #[test]
    fn frame_bounds_straddle_the_center_for_a_centered_stage() {
        let projector = straight_on_projector();
        let bounds = project_frame_bounds(&projector, &Mat4::IDENTITY).expect("bounds");
        assert!(bounds.contains([0.0, 0.0]));
        assert!(bounds.min[0] < 0.0 && bounds.max[0] > 0.0);
        assert!(bounds.min[1] < 0.0 && bounds.max[1] > 0.0);
        // A 50 degree vertical fov at distance 10 sees ~4.66 world units of
        // half-height, so a 2x3 frame stays well inside one NDC quadrant.
        assert!(bounds.max[0] < 0.3);
        assert!(bounds.max[1] < 0.4);
        assert!((bounds.depth() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn overlapping_frames_resolve_to_the_nearer_stage() {
        let scene = PortalScene::with_default_roster();
        let ids: Vec<_> = scene.stages().map(|(id, _)| id).collect();
        let projector = straight_on_projector();
        let far = project_frame_bounds(&projector, &Mat4::IDENTITY).expect("far bounds");
        let near_model = Mat4::from_translation(Vec3::new(0.0, 0.0, 4.0));
        let near = project_frame_bounds(&projector, &near_model).expect("near bounds");
        let bounds = vec![(ids[0], far), (ids[1], near)];

        assert_eq!(pick_stage(&bounds, [0.0, 0.0]), Some(ids[1]));
        assert_eq!(pick_stage(&bounds, [0.9, 0.9]), None);
    }

    #[test]
    fn offset_frames_each_claim_their_own_cursor_region() {
        let scene = PortalScene::with_default_roster();
        let ids: Vec<_> = scene.stages().map(|(id, _)| id).collect();
        let projector = straight_on_projector();
        let centered = project_frame_bounds(&projector, &Mat4::IDENTITY).expect("centered");
        let side_model = Mat4::from_translation(Vec3::new(2.0, 0.0, 4.0));
        let side = project_frame_bounds(&projector, &side_model).expect("side");
        let bounds = vec![(ids[0], centered), (ids[1], side)];

        assert_eq!(pick_stage(&bounds, [0.0, 0.0]), Some(ids[0]));
        assert_eq!(pick_stage(&bounds, [0.5, 0.0]), Some(ids[1]));
    }

    #[test]
    fn frames_behind_the_eye_are_not_hoverable() {
        let projector = straight_on_projector();
        let model = Mat4::from_translation(Vec3::new(0.0, 0.0, 20.0));
        assert!(project_frame_bounds(&projector, &model).is_none());
    }
}
