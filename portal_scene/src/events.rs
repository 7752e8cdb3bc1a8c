//! Frame-stamped session records shared by the runner and the viewer.

use serde::{Deserialize, Serialize};

use crate::camera::{pose_for_selection, CameraPose};
use crate::state::{PortalScene, SelectionUpdate};

/// One interaction (or camera) record in a session event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneEvent {
    pub frame: u64,
    pub seconds: f32,
    #[serde(flatten)]
    pub kind: SceneEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneEventKind {
    StageActivated { stage: String },
    StageDeactivated { stage: String },
    HoverEntered { stage: String },
    HoverLeft { stage: String },
    CameraRetarget { eye: [f32; 3], target: [f32; 3] },
}

impl SceneEvent {
    pub fn new(frame: u64, seconds: f32, kind: SceneEventKind) -> Self {
        Self {
            frame,
            seconds,
            kind,
        }
    }
}

/// Events recorded for one selection update: the displaced stage (if any),
/// the newly active stage (if any), and the camera command the update
/// issued. An update that changed nothing records nothing.
pub fn selection_events(
    scene: &PortalScene,
    update: SelectionUpdate,
    frame: u64,
    seconds: f32,
) -> Vec<SceneEvent> {
    let mut events = Vec::new();
    if update.previous == update.current {
        return events;
    }
    if let Some(previous) = update.previous {
        events.push(SceneEvent::new(
            frame,
            seconds,
            SceneEventKind::StageDeactivated {
                stage: scene.stage(previous).name().to_string(),
            },
        ));
    }
    if let Some(current) = update.current {
        events.push(SceneEvent::new(
            frame,
            seconds,
            SceneEventKind::StageActivated {
                stage: scene.stage(current).name().to_string(),
            },
        ));
    }
    let pose = pose_for_selection(scene, update.current);
    events.push(SceneEvent::new(
        frame,
        seconds,
        SceneEventKind::CameraRetarget {
            eye: pose.eye,
            target: pose.target,
        },
    ));
    events
}

/// Per-stage sample inside a frame snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSample {
    pub name: String,
    pub blend: f32,
    pub target: f32,
}

/// Everything observable about the scene after one frame step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub frame: u64,
    pub seconds: f32,
    pub active: Option<String>,
    pub hovered: Option<String>,
    pub stages: Vec<StageSample>,
    pub camera: CameraPose,
}

impl FrameSnapshot {
    /// Sample the scene as of now. `camera` is the most recent commanded
    /// pose, not an interpolated rig position.
    pub fn capture(scene: &PortalScene, frame: u64, seconds: f32, camera: CameraPose) -> Self {
        let name_of = |id| scene.stage(id).name().to_string();
        Self {
            frame,
            seconds,
            active: scene.active().map(name_of),
            hovered: scene.hovered().map(name_of),
            stages: scene
                .stages()
                .map(|(id, stage)| StageSample {
                    name: stage.name().to_string(),
                    blend: stage.blend(),
                    target: scene.target(id),
                })
                .collect(),
            camera,
        }
    }
}
