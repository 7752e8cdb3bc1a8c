use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use portal_scene::{
    default_roster, load_roster, pose_for_selection, selection_events, CameraPose, FrameSnapshot,
    PortalScene, SceneEvent, SceneEventKind, BLEND_TIME_CONSTANT,
};

use crate::cli::SessionArgs;
use crate::script::{load_script, Cue, CueAction, CueQueue};

/// Quiet time appended after the last cue so transitions settle on record.
const SETTLE_TAIL_SECONDS: f32 = 2.0;

#[derive(Debug, Serialize)]
struct TimelineArtifact {
    fps: u32,
    tau: f32,
    frames: Vec<FrameSnapshot>,
}

#[derive(Debug, Serialize)]
struct EventLogArtifact {
    events: Vec<SceneEvent>,
}

/// Everything a finished session leaves behind.
pub struct SessionReport {
    pub scene: PortalScene,
    pub frames: Vec<FrameSnapshot>,
    pub events: Vec<SceneEvent>,
    pub applied_cues: usize,
    pub leftover_cues: usize,
    pub duration_seconds: f32,
}

pub fn execute(args: SessionArgs) -> Result<()> {
    let SessionArgs {
        script,
        stages,
        duration_seconds,
        fps,
        timeline_json,
        event_log_json,
        summary,
    } = args;

    let roster = match stages.as_ref() {
        Some(path) => load_roster(path)?,
        None => default_roster(),
    };
    let scene = PortalScene::new(roster).context("assembling stage roster")?;

    let cues = match script.as_ref() {
        Some(path) => load_script(path, &scene)?,
        None => Vec::new(),
    };
    if cues.is_empty() && event_log_json.is_some() {
        eprintln!("[portal_engine] warning: no cues loaded; the event log will be empty");
    }

    let report = run_session(scene, cues, fps, duration_seconds);
    if report.leftover_cues > 0 {
        eprintln!(
            "[portal_engine] warning: {} cue(s) scheduled past the session end were never applied",
            report.leftover_cues
        );
    }

    if let Some(path) = timeline_json.as_ref() {
        let artifact = TimelineArtifact {
            fps,
            tau: BLEND_TIME_CONSTANT,
            frames: report.frames.clone(),
        };
        write_json(path, &artifact, "blend timeline")?;
    }

    if let Some(path) = event_log_json.as_ref() {
        let artifact = EventLogArtifact {
            events: report.events.clone(),
        };
        write_json(path, &artifact, "interaction event log")?;
    }

    println!(
        "Simulated {} frame(s) over {:.2}s at {} fps; applied {} cue(s), recorded {} event(s)",
        report.frames.len(),
        report.duration_seconds,
        fps,
        report.applied_cues,
        report.events.len()
    );

    if summary {
        print_summary(&report);
    }

    Ok(())
}

/// Run one deterministic session: apply due cues before each frame's easing
/// step, then sample the scene. Events and the damping step never interleave
/// mid-frame, so each step sees one consistent selection.
pub fn run_session(
    mut scene: PortalScene,
    cues: Vec<Cue>,
    fps: u32,
    duration_seconds: Option<f32>,
) -> SessionReport {
    let duration = duration_seconds.unwrap_or_else(|| {
        cues.iter()
            .map(|cue| cue.at_seconds)
            .fold(0.0f32, f32::max)
            + SETTLE_TAIL_SECONDS
    });
    let dt = 1.0 / fps as f32;
    let frame_count = (duration * fps as f32).ceil().max(1.0) as u64;

    let mut queue = CueQueue::new(cues, fps);
    let mut camera = CameraPose::default();
    let mut frames = Vec::with_capacity(frame_count as usize);
    let mut events = Vec::new();

    for frame in 0..frame_count {
        let now = frame as f32 * dt;
        for cue in queue.take_due(frame) {
            apply_cue(&mut scene, cue, frame, now, &mut camera, &mut events);
        }
        scene.advance(dt);
        let seconds = (frame + 1) as f32 * dt;
        frames.push(FrameSnapshot::capture(&scene, frame, seconds, camera));
    }

    SessionReport {
        scene,
        frames,
        events,
        applied_cues: queue.applied().len(),
        leftover_cues: queue.pending_len(),
        duration_seconds: duration,
    }
}

fn apply_cue(
    scene: &mut PortalScene,
    cue: Cue,
    frame: u64,
    now: f32,
    camera: &mut CameraPose,
    events: &mut Vec<SceneEvent>,
) {
    match cue.action {
        CueAction::Toggle(id) => {
            let update = scene.toggle_active(id);
            events.extend(selection_events(scene, update, frame, now));
            *camera = pose_for_selection(scene, update.current);
        }
        CueAction::PointerEnter(id) => {
            let before = scene.hovered();
            scene.pointer_enter(id);
            if before != scene.hovered() {
                events.push(SceneEvent::new(
                    frame,
                    now,
                    SceneEventKind::HoverEntered {
                        stage: scene.stage(id).name().to_string(),
                    },
                ));
            }
        }
        CueAction::PointerLeave(id) => {
            let before = scene.hovered();
            scene.pointer_leave(id);
            if before != scene.hovered() {
                events.push(SceneEvent::new(
                    frame,
                    now,
                    SceneEventKind::HoverLeft {
                        stage: scene.stage(id).name().to_string(),
                    },
                ));
            }
        }
    }
}

fn print_summary(report: &SessionReport) {
    println!("Session summary:");
    for (id, stage) in report.scene.stages() {
        let marker = if report.scene.active() == Some(id) {
            " (active)"
        } else {
            ""
        };
        println!(
            "  {:<4} blend {:.4} target {:.0}{}",
            stage.name(),
            stage.blend(),
            report.scene.target(id),
            marker
        );
    }
    match report.scene.hovered() {
        Some(id) => println!("  hovered: {}", report.scene.stage(id).name()),
        None => println!("  hovered: none"),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating artifact directory {}", parent.display()))?;
        }
    }
    let json =
        serde_json::to_string_pretty(value).with_context(|| format!("serializing {what}"))?;
    fs::write(path, &json).with_context(|| format!("writing {what} to {}", path.display()))?;
    println!("Saved {what} to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toggle(scene: &PortalScene, name: &str, at_seconds: f32) -> Cue {
        Cue {
            at_seconds,
            action: CueAction::Toggle(scene.stage_id(name).expect("stage")),
        }
    }

    fn hover(scene: &PortalScene, name: &str, at_seconds: f32, enter: bool) -> Cue {
        let id = scene.stage_id(name).expect("stage");
        Cue {
            at_seconds,
            action: if enter {
                CueAction::PointerEnter(id)
            } else {
                CueAction::PointerLeave(id)
            },
        }
    }

    fn stage_blend(snapshot: &FrameSnapshot, name: &str) -> f32 {
        snapshot
            .stages
            .iter()
            .find(|sample| sample.name == name)
            .map(|sample| sample.blend)
            .expect("stage sample")
    }

    #[test]
    fn session_defaults_to_the_settle_tail_after_the_last_cue() {
        let scene = PortalScene::with_default_roster();
        let cues = vec![toggle(&scene, "FA", 1.0)];
        let report = run_session(scene, cues, 60, None);
        assert_eq!(report.duration_seconds, 3.0);
        assert_eq!(report.frames.len(), 180);
        assert_eq!(report.applied_cues, 1);
        assert_eq!(report.leftover_cues, 0);
    }

    #[test]
    fn activation_opens_then_deactivation_settles_closed() {
        let scene = PortalScene::with_default_roster();
        let cues = vec![toggle(&scene, "FA", 0.0), toggle(&scene, "FA", 1.0)];
        let report = run_session(scene, cues, 60, Some(3.0));

        assert_eq!(report.frames.len(), 180);
        let opening_peak = stage_blend(&report.frames[59], "FA");
        assert!(
            (opening_peak - 0.99326).abs() < 1.0e-3,
            "one second of opening should settle near 1, got {opening_peak}"
        );
        let settled = stage_blend(&report.frames[179], "FA");
        assert!(
            settled < 0.01,
            "two seconds after deactivation blend should close, got {settled}"
        );

        let final_camera = &report.frames[179].camera;
        assert_eq!(*final_camera, CameraPose::default());
    }

    #[test]
    fn events_record_displacement_and_camera_commands() {
        let scene = PortalScene::with_default_roster();
        let cues = vec![toggle(&scene, "FA", 0.0), toggle(&scene, "LO", 0.5)];
        let report = run_session(scene, cues, 60, Some(1.0));

        let kinds: Vec<&SceneEventKind> = report.events.iter().map(|event| &event.kind).collect();
        assert_eq!(report.events.len(), 5);
        assert!(matches!(
            kinds[0],
            SceneEventKind::StageActivated { stage } if stage == "FA"
        ));
        assert!(matches!(kinds[1], SceneEventKind::CameraRetarget { .. }));
        assert!(matches!(
            kinds[2],
            SceneEventKind::StageDeactivated { stage } if stage == "FA"
        ));
        assert!(matches!(
            kinds[3],
            SceneEventKind::StageActivated { stage } if stage == "LO"
        ));
        assert!(matches!(kinds[4], SceneEventKind::CameraRetarget { .. }));
        assert_eq!(report.events[2].frame, 30);
    }

    #[test]
    fn hover_cues_log_only_real_transitions() {
        let scene = PortalScene::with_default_roster();
        let cues = vec![
            hover(&scene, "FA", 0.0, true),
            // Leaving LO while FA owns the hover is a no-op.
            hover(&scene, "LO", 0.1, false),
            hover(&scene, "FA", 0.2, false),
            hover(&scene, "FA", 0.3, false),
        ];
        let report = run_session(scene, cues, 60, Some(1.0));

        assert_eq!(report.events.len(), 2);
        assert!(matches!(
            &report.events[0].kind,
            SceneEventKind::HoverEntered { stage } if stage == "FA"
        ));
        assert!(matches!(
            &report.events[1].kind,
            SceneEventKind::HoverLeft { stage } if stage == "FA"
        ));
        assert_eq!(report.scene.hovered(), None);
    }

    #[test]
    fn blends_remain_bounded_at_coarse_frame_rates() {
        let scene = PortalScene::with_default_roster();
        let cues = vec![toggle(&scene, "PA", 0.0)];
        let report = run_session(scene, cues, 1, Some(10.0));

        for snapshot in &report.frames {
            for sample in &snapshot.stages {
                assert!(
                    (0.0..=1.0).contains(&sample.blend),
                    "frame {} sample {} out of range: {}",
                    snapshot.frame,
                    sample.name,
                    sample.blend
                );
            }
        }
        let last = report.frames.last().expect("frames recorded");
        assert!(stage_blend(last, "PA") > 0.999);
    }
}
