use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about = "Headless portal session runner that exports JSON artifacts",
    version
)]
pub struct Args {
    /// Path to the JSON cue script driving the session
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Optional JSON stage roster overriding the built-in trio
    #[arg(long)]
    pub stages: Option<PathBuf>,

    /// Session length in seconds (default: last cue plus the settle tail)
    #[arg(long)]
    pub duration_seconds: Option<f32>,

    /// Frames simulated per second
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Path to write the per-frame blend timeline JSON
    #[arg(long)]
    pub timeline_json: Option<PathBuf>,

    /// Path to write the interaction event log JSON
    #[arg(long)]
    pub event_log_json: Option<PathBuf>,

    /// Print a per-stage settle report after the run
    #[arg(long)]
    pub summary: bool,
}

#[derive(Debug)]
pub struct SessionArgs {
    pub script: Option<PathBuf>,
    pub stages: Option<PathBuf>,
    pub duration_seconds: Option<f32>,
    pub fps: u32,
    pub timeline_json: Option<PathBuf>,
    pub event_log_json: Option<PathBuf>,
    pub summary: bool,
}

pub fn parse() -> Result<SessionArgs> {
    Args::parse().into_session()
}

impl Args {
    fn into_session(self) -> Result<SessionArgs> {
        if self.fps == 0 {
            bail!("--fps must be at least 1");
        }
        if let Some(duration) = self.duration_seconds {
            if !duration.is_finite() || duration <= 0.0 {
                bail!("--duration-seconds must be a positive number of seconds");
            }
        }
        Ok(SessionArgs {
            script: self.script,
            stages: self.stages,
            duration_seconds: self.duration_seconds,
            fps: self.fps,
            timeline_json: self.timeline_json,
            event_log_json: self.event_log_json,
            summary: self.summary,
        })
    }
}
