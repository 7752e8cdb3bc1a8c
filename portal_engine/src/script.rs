//! Cue scripts: timed pointer and activation events replayed against a
//! scene at a fixed frame rate.
//!
//! Scripts are JSON: `{ "cues": [ { "at_seconds": 0.5, "action": "toggle",
//! "stage": "FA" } ] }`. Stage names resolve against the roster while the
//! script loads, so the session loop only ever sees valid ids.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use portal_scene::{PortalScene, StageId};

/// A resolved scripted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueAction {
    PointerEnter(StageId),
    PointerLeave(StageId),
    Toggle(StageId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cue {
    pub at_seconds: f32,
    pub action: CueAction,
}

#[derive(Debug, Deserialize)]
struct ScriptFile {
    cues: Vec<RawCue>,
}

#[derive(Debug, Deserialize)]
struct RawCue {
    at_seconds: f32,
    #[serde(flatten)]
    action: RawAction,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum RawAction {
    PointerEnter { stage: String },
    PointerLeave { stage: String },
    Toggle { stage: String },
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("cue {index} names unknown stage '{stage}'")]
    UnknownStage { index: usize, stage: String },
    #[error("cue {index} has a non-finite or negative timestamp")]
    BadTimestamp { index: usize },
}

/// Load and resolve a cue script against the scene's roster.
pub fn load_script(path: &Path, scene: &PortalScene) -> Result<Vec<Cue>> {
    let data = fs::read(path).with_context(|| format!("reading cue script {}", path.display()))?;
    let file: ScriptFile = serde_json::from_slice(&data)
        .with_context(|| format!("parsing cue script {}", path.display()))?;
    let cues = resolve_cues(file, scene)
        .with_context(|| format!("validating cue script {}", path.display()))?;
    Ok(cues)
}

fn resolve_cues(file: ScriptFile, scene: &PortalScene) -> Result<Vec<Cue>, ScriptError> {
    let mut cues = Vec::with_capacity(file.cues.len());
    for (index, raw) in file.cues.into_iter().enumerate() {
        if !raw.at_seconds.is_finite() || raw.at_seconds < 0.0 {
            return Err(ScriptError::BadTimestamp { index });
        }
        let resolve = |stage: &str| {
            scene
                .stage_id(stage)
                .ok_or_else(|| ScriptError::UnknownStage {
                    index,
                    stage: stage.to_string(),
                })
        };
        let action = match &raw.action {
            RawAction::PointerEnter { stage } => CueAction::PointerEnter(resolve(stage)?),
            RawAction::PointerLeave { stage } => CueAction::PointerLeave(resolve(stage)?),
            RawAction::Toggle { stage } => CueAction::Toggle(resolve(stage)?),
        };
        cues.push(Cue {
            at_seconds: raw.at_seconds,
            action,
        });
    }
    Ok(cues)
}

/// A cue pinned to the frame it lands on.
#[derive(Debug, Clone, Copy)]
pub struct ScheduledCue {
    pub due_frame: u64,
    pub cue: Cue,
}

/// Pending cues in schedule order plus the history of applied ones.
#[derive(Debug)]
pub struct CueQueue {
    pending: VecDeque<ScheduledCue>,
    applied: Vec<ScheduledCue>,
}

impl CueQueue {
    /// Schedule cues against a frame rate. A cue lands on the first frame
    /// whose start time is at or past its timestamp; cues sharing a frame
    /// keep their script order.
    pub fn new<C: IntoIterator<Item = Cue>>(cues: C, fps: u32) -> Self {
        let mut pending: Vec<ScheduledCue> = cues
            .into_iter()
            .map(|cue| ScheduledCue {
                due_frame: (cue.at_seconds * fps as f32).ceil() as u64,
                cue,
            })
            .collect();
        pending.sort_by_key(|scheduled| scheduled.due_frame);
        Self {
            pending: pending.into(),
            applied: Vec::new(),
        }
    }

    /// Pop every cue due on or before `frame`, recording it as applied.
    pub fn take_due(&mut self, frame: u64) -> Vec<Cue> {
        let mut due = Vec::new();
        while self
            .pending
            .front()
            .is_some_and(|scheduled| scheduled.due_frame <= frame)
        {
            if let Some(scheduled) = self.pending.pop_front() {
                self.applied.push(scheduled);
                due.push(scheduled.cue);
            }
        }
        due
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn applied(&self) -> &[ScheduledCue] {
        &self.applied
    }
}
