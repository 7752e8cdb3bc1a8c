//! Camera look-at commands derived from the selection.
//!
//! Commands are one-shot: a new pose is issued when the selection changes
//! and the camera collaborator eases toward it however it likes. Nothing
//! here runs per frame.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::stage::StageId;
use crate::state::PortalScene;

/// Eye position used while a stage is active.
pub const ACTIVE_EYE: Vec3 = Vec3::new(0.0, 0.0, 5.0);
/// Eye position used when no stage is active.
pub const DEFAULT_EYE: Vec3 = Vec3::new(0.0, 0.0, 10.0);
/// Focus point used when no stage is active.
pub const DEFAULT_TARGET: Vec3 = Vec3::ZERO;

/// A commanded eye/focus pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub eye: [f32; 3],
    pub target: [f32; 3],
}

impl CameraPose {
    pub fn new(eye: Vec3, target: Vec3) -> Self {
        Self {
            eye: eye.to_array(),
            target: target.to_array(),
        }
    }

    pub fn eye_vec(&self) -> Vec3 {
        Vec3::from_array(self.eye)
    }

    pub fn target_vec(&self) -> Vec3 {
        Vec3::from_array(self.target)
    }
}

impl Default for CameraPose {
    /// The no-selection pose: pulled back on the Z axis, looking at the
    /// scene origin.
    fn default() -> Self {
        Self::new(DEFAULT_EYE, DEFAULT_TARGET)
    }
}

/// The pose commanded for a selection: framing the active stage from the
/// close eye, or the default pose when nothing is active.
pub fn pose_for_selection(scene: &PortalScene, selection: Option<StageId>) -> CameraPose {
    match selection {
        Some(id) => CameraPose::new(ACTIVE_EYE, scene.stage(id).position()),
        None => CameraPose::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_selection_frames_the_stage_position() {
        let scene = PortalScene::with_default_roster();
        let lo = scene.stage_id("LO").expect("LO in stock roster");

        let pose = pose_for_selection(&scene, Some(lo));
        assert_eq!(pose.eye, ACTIVE_EYE.to_array());
        assert_eq!(pose.target, scene.stage(lo).position().to_array());
    }

    #[test]
    fn cleared_selection_returns_the_default_pose() {
        let scene = PortalScene::with_default_roster();
        let pose = pose_for_selection(&scene, None);
        assert_eq!(pose, CameraPose::default());
        assert_eq!(pose.eye, [0.0, 0.0, 10.0]);
        assert_eq!(pose.target, [0.0, 0.0, 0.0]);
    }
}
