//! Stage identity and roster configuration.
//!
//! A roster is the ordered list of portal stages a scene is built from.
//! Rosters come either from [`default_roster`] or from a JSON preset on
//! disk; either way the scene constructor assigns each entry a [`StageId`]
//! and validates the names, so ids held elsewhere always resolve.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Handle to a stage inside a scene. Ids are only minted while the scene is
/// built, so holding one guarantees the stage exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageId(pub(crate) usize);

impl StageId {
    /// Position of the stage in roster order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Width of a portal frame in world units.
pub const FRAME_WIDTH: f32 = 2.0;
/// Height of a portal frame in world units.
pub const FRAME_HEIGHT: f32 = 3.0;
/// Depth of a portal frame in world units.
pub const FRAME_DEPTH: f32 = 0.1;
/// Vertical anchor of the stage label on the frame plane.
pub const LABEL_OFFSET_Y: f32 = -1.3;
/// Radius of the inside-out background sphere behind each frame.
pub const BACKDROP_RADIUS: f32 = 5.0;

fn default_diorama_scale() -> f32 {
    0.6
}

fn default_diorama_offset() -> f32 {
    -1.0
}

/// Declarative description of one portal stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Unique short name, e.g. `FA`. Lookups are case-insensitive.
    pub name: String,
    /// Text rendered under the frame.
    pub label: String,
    /// Linear RGB tint for the label, frame highlight, and diorama interior.
    pub color: [f32; 3],
    /// Background texture reference, resolved against the asset root by the
    /// viewer. Opaque to everything else.
    pub texture: String,
    /// Frame centre in world space.
    #[serde(default)]
    pub position: [f32; 3],
    /// Rotation of the frame around the world Y axis, radians.
    #[serde(default)]
    pub rotation_y: f32,
    /// Uniform scale applied to the embedded diorama.
    #[serde(default = "default_diorama_scale")]
    pub diorama_scale: f32,
    /// Vertical offset of the diorama inside the frame.
    #[serde(default = "default_diorama_offset")]
    pub diorama_offset: f32,
}

impl StageConfig {
    fn new(name: &str, label: &str, color: [f32; 3], texture: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            color,
            texture: texture.to_string(),
            position: [0.0; 3],
            rotation_y: 0.0,
            diorama_scale: default_diorama_scale(),
            diorama_offset: default_diorama_offset(),
        }
    }

    fn placed(mut self, position: [f32; 3], rotation_y: f32) -> Self {
        self.position = position;
        self.rotation_y = rotation_y;
        self
    }
}

/// The stock three-stage roster: a centre stage flanked by two angled ones.
pub fn default_roster() -> Vec<StageConfig> {
    use std::f32::consts::PI;
    vec![
        StageConfig::new("FA", "Fairy", [0.90, 0.28, 0.33], "cave.png"),
        StageConfig::new("LO", "Lobster", [0.30, 0.75, 0.42], "undersea.png")
            .placed([-2.5, 0.0, -0.5], PI / 8.0),
        StageConfig::new("PA", "Paladin", [0.32, 0.48, 0.92], "outer-space.png")
            .placed([2.5, 0.0, -0.5], -PI / 8.0),
    ]
}

#[derive(Debug, Deserialize)]
struct RosterFile {
    stages: Vec<StageConfig>,
}

/// Load a roster preset from JSON: `{ "stages": [ { "name": ... } ] }`.
pub fn load_roster(path: &Path) -> Result<Vec<StageConfig>> {
    let data =
        fs::read(path).with_context(|| format!("reading stage roster {}", path.display()))?;
    let roster: RosterFile = serde_json::from_slice(&data)
        .with_context(|| format!("parsing stage roster {}", path.display()))?;
    Ok(roster.stages)
}
