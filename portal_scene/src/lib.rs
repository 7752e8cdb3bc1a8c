//! Shared portal-stage scene state.
//!
//! A scene holds a fixed roster of portal stages. Each stage owns a single
//! animated scalar, its `blend`, which eases between 0 (closed, background
//! texture showing) and 1 (open, diorama showing). At most one stage is
//! active at a time; the active stage's blend eases toward 1 while every
//! other stage eases back toward 0. This crate keeps the selection rules,
//! the easing step, and the session record types in one place so the
//! headless runner and the viewer stay in agreement.

pub mod blend;
pub mod camera;
pub mod events;
pub mod stage;
pub mod state;

use thiserror::Error;

pub use blend::{approach, settle_fraction, BLEND_TIME_CONSTANT};
pub use camera::{pose_for_selection, CameraPose, ACTIVE_EYE, DEFAULT_EYE, DEFAULT_TARGET};
pub use events::{selection_events, FrameSnapshot, SceneEvent, SceneEventKind, StageSample};
pub use stage::{default_roster, load_roster, StageConfig, StageId};
pub use state::{PortalScene, SelectionUpdate, Stage};

/// Errors raised while assembling a scene from a stage roster.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("stage roster is empty")]
    EmptyRoster,
    #[error("stage at index {0} has an empty name")]
    UnnamedStage(usize),
    #[error("duplicate stage name '{0}'")]
    DuplicateStage(String),
}
