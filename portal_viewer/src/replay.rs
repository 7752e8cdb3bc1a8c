//! Recorded-session playback.
//!
//! A timeline artifact written by the headless runner replaces live input:
//! the viewer samples blends, selection names, and camera commands from the
//! recorded frames at the recorded rate instead of mutating the scene.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use portal_scene::{FrameSnapshot, PortalScene};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, PartialEq, Error)]
pub enum ReplayError {
    #[error("timeline holds no frames")]
    Empty,
    #[error("timeline fps must be positive")]
    ZeroFps,
    #[error("timeline stages [{timeline}] do not match the roster [{roster}]")]
    StageMismatch { timeline: String, roster: String },
}

#[derive(Debug, Deserialize)]
struct TimelineArtifact {
    fps: u32,
    tau: f32,
    frames: Vec<FrameSnapshot>,
}

/// A validated timeline plus the playback clock arithmetic.
#[derive(Debug)]
pub struct ReplayDriver {
    fps: u32,
    tau: f32,
    frames: Vec<FrameSnapshot>,
}

impl ReplayDriver {
    /// Snapshot for the given wall-clock offset into playback. Playback holds
    /// on the final frame once the recording runs out.
    pub fn frame_at(&self, elapsed_seconds: f32) -> &FrameSnapshot {
        let index = (elapsed_seconds.max(0.0) * self.fps as f32) as usize;
        &self.frames[index.min(self.frames.len() - 1)]
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn tau(&self) -> f32 {
        self.tau
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn duration_seconds(&self) -> f32 {
        self.frames.len() as f32 / self.fps as f32
    }

    pub fn finished(&self, elapsed_seconds: f32) -> bool {
        elapsed_seconds >= self.duration_seconds()
    }
}

/// Reads a timeline artifact and validates it against the loaded roster.
pub fn load_timeline(path: &Path, scene: &PortalScene) -> Result<ReplayDriver> {
    let data = fs::read(path).with_context(|| format!("reading timeline {}", path.display()))?;
    let artifact: TimelineArtifact = serde_json::from_slice(&data)
        .with_context(|| format!("parsing timeline {}", path.display()))?;
    let driver = validate_timeline(artifact, scene)
        .with_context(|| format!("checking timeline {}", path.display()))?;
    Ok(driver)
}

fn validate_timeline(
    artifact: TimelineArtifact,
    scene: &PortalScene,
) -> Result<ReplayDriver, ReplayError> {
    if artifact.fps == 0 {
        return Err(ReplayError::ZeroFps);
    }
    let Some(first) = artifact.frames.first() else {
        return Err(ReplayError::Empty);
    };
    let recorded: Vec<&str> = first
        .stages
        .iter()
        .map(|sample| sample.name.as_str())
        .collect();
    let roster: Vec<&str> = scene.stages().map(|(_, stage)| stage.name()).collect();
    let aligned = recorded.len() == roster.len()
        && recorded
            .iter()
            .zip(&roster)
            .all(|(recorded, roster)| recorded.eq_ignore_ascii_case(roster));
    if !aligned {
        return Err(ReplayError::StageMismatch {
            timeline: recorded.join(", "),
            roster: roster.join(", "),
        });
    }
    Ok(ReplayDriver {
        fps: artifact.fps,
        tau: artifact.tau,
        frames: artifact.frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_timeline(names: &[&str], frame_count: usize) -> serde_json::Value {
        let frames: Vec<_> = (0..frame_count)
            .map(|frame| {
                json!({
                    "frame": frame,
                    "seconds": (frame + 1) as f32 / 60.0,
                    "active": names.first(),
                    "hovered": null,
                    "stages": names
                        .iter()
                        .map(|name| json!({ "name": name, "blend": 0.25, "target": 1.0 }))
                        .collect::<Vec<_>>(),
                    "camera": { "eye": [0.0, 0.0, 5.0], "target": [0.0, 0.0, 0.0] },
                })
            })
            .collect();
        json!({ "fps": 60, "tau": 0.2, "frames": frames })
    }

    fn driver_from(value: serde_json::Value) -> Result<ReplayDriver, ReplayError> {
        let artifact: TimelineArtifact = serde_json::from_value(value).expect("decode fixture");
        validate_timeline(artifact, &PortalScene::with_default_roster())
    }

    #[test]
    fn playback_indexes_frames_at_the_recorded_rate() {
        let driver = driver_from(sample_timeline(&["FA", "LO", "PA"], 4)).expect("valid timeline");
        assert_eq!(driver.frame_at(0.0).frame, 0);
        assert_eq!(driver.frame_at(0.016).frame, 0);
        assert_eq!(driver.frame_at(0.017).frame, 1);
        assert_eq!(driver.frame_at(1000.0).frame, 3);
        assert_eq!(driver.frame_at(-5.0).frame, 0);
        assert!(!driver.finished(0.05));
        assert!(driver.finished(driver.duration_seconds()));
    }

    #[test]
    fn mismatched_rosters_are_rejected() {
        let err = driver_from(sample_timeline(&["FA", "LO"], 1)).expect_err("two-stage timeline");
        match err {
            ReplayError::StageMismatch { timeline, roster } => {
                assert_eq!(timeline, "FA, LO");
                assert_eq!(roster, "FA, LO, PA");
            }
            other => panic!("expected stage mismatch, got {other:?}"),
        }
    }

    #[test]
    fn stage_name_comparison_ignores_case() {
        assert!(driver_from(sample_timeline(&["fa", "lo", "pa"], 1)).is_ok());
    }

    #[test]
    fn empty_and_zero_rate_timelines_are_rejected() {
        let err = driver_from(sample_timeline(&["FA", "LO", "PA"], 0)).expect_err("no frames");
        assert_eq!(err, ReplayError::Empty);

        let mut value = sample_timeline(&["FA", "LO", "PA"], 1);
        value["fps"] = json!(0);
        let err = driver_from(value).expect_err("zero fps");
        assert_eq!(err, ReplayError::ZeroFps);
    }

    #[test]
    fn load_timeline_reports_the_failing_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.json");
        let err =
            load_timeline(&missing, &PortalScene::with_default_roster()).expect_err("no file");
        assert!(format!("{err:#}").contains("missing.json"));

        let path = dir.path().join("timeline.json");
        fs::write(&path, sample_timeline(&["FA", "LO", "PA"], 2).to_string()).expect("write");
        let driver = load_timeline(&path, &PortalScene::with_default_roster()).expect("load");
        assert_eq!(driver.fps(), 60);
        assert_eq!(driver.frame_count(), 2);
        assert!((driver.tau() - 0.2).abs() < 1e-6);
    }
}
