//! Scene state: the stage roster, the single active/hover selection, and
//! the per-frame easing step.

use glam::Vec3;

use crate::blend::{approach, BLEND_TIME_CONSTANT};
use crate::stage::{StageConfig, StageId};
use crate::SceneError;

/// One portal stage: immutable configuration plus the animated blend.
#[derive(Debug, Clone)]
pub struct Stage {
    config: StageConfig,
    blend: f32,
}

impl Stage {
    fn new(config: StageConfig) -> Self {
        Self { config, blend: 0.0 }
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Frame centre in world space.
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.config.position)
    }

    /// Portal openness in [0, 1].
    pub fn blend(&self) -> f32 {
        self.blend
    }
}

/// Outcome of an activation toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionUpdate {
    pub previous: Option<StageId>,
    pub current: Option<StageId>,
}

/// The whole mutable scene: stages plus the selection pair.
///
/// The "at most one active stage" rule is carried by `active` being a single
/// optional value; there is no per-stage flag to fall out of sync. Hover is
/// tracked the same way and is independent of activation.
#[derive(Debug, Clone)]
pub struct PortalScene {
    stages: Vec<Stage>,
    active: Option<StageId>,
    hovered: Option<StageId>,
}

impl PortalScene {
    /// Build a scene from a roster. Names must be non-empty and unique
    /// (case-insensitively, matching lookup).
    pub fn new(roster: Vec<StageConfig>) -> Result<Self, SceneError> {
        if roster.is_empty() {
            return Err(SceneError::EmptyRoster);
        }
        for (index, config) in roster.iter().enumerate() {
            if config.name.trim().is_empty() {
                return Err(SceneError::UnnamedStage(index));
            }
            let clash = roster[..index]
                .iter()
                .any(|earlier| earlier.name.eq_ignore_ascii_case(&config.name));
            if clash {
                return Err(SceneError::DuplicateStage(config.name.clone()));
            }
        }
        Ok(Self {
            stages: roster.into_iter().map(Stage::new).collect(),
            active: None,
            hovered: None,
        })
    }

    /// Scene over the stock roster.
    pub fn with_default_roster() -> Self {
        Self::new(crate::stage::default_roster()).expect("stock roster is valid")
    }

    /// Case-insensitive name lookup.
    pub fn stage_id(&self, name: &str) -> Option<StageId> {
        self.stages
            .iter()
            .position(|stage| stage.config.name.eq_ignore_ascii_case(name))
            .map(StageId)
    }

    pub fn stage(&self, id: StageId) -> &Stage {
        &self.stages[id.0]
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Stages in roster order with their ids.
    pub fn stages(&self) -> impl Iterator<Item = (StageId, &Stage)> {
        self.stages
            .iter()
            .enumerate()
            .map(|(index, stage)| (StageId(index), stage))
    }

    pub fn active(&self) -> Option<StageId> {
        self.active
    }

    pub fn hovered(&self) -> Option<StageId> {
        self.hovered
    }

    pub fn blend(&self, id: StageId) -> f32 {
        self.stages[id.0].blend
    }

    /// Easing target for a stage: 1 while it is the active one, else 0.
    pub fn target(&self, id: StageId) -> f32 {
        if self.active == Some(id) {
            1.0
        } else {
            0.0
        }
    }

    /// Apply the double-activation gesture to a stage: activating it if it
    /// was not the active one (displacing any previous active stage in the
    /// same update), clearing the selection if it was.
    pub fn toggle_active(&mut self, id: StageId) -> SelectionUpdate {
        let previous = self.active;
        self.active = if previous == Some(id) { None } else { Some(id) };
        SelectionUpdate {
            previous,
            current: self.active,
        }
    }

    pub fn pointer_enter(&mut self, id: StageId) {
        self.hovered = Some(id);
    }

    /// Clears hover only when this stage owns it; leaving a stage the
    /// pointer was never over must not disturb an unrelated hover.
    pub fn pointer_leave(&mut self, id: StageId) {
        if self.hovered == Some(id) {
            self.hovered = None;
        }
    }

    /// Ease every stage's blend toward its target by `dt` seconds. Stages
    /// are independent; order does not matter. The clamp pins down the
    /// [0, 1] bound against float rounding at the extremes.
    pub fn advance(&mut self, dt: f32) {
        let active = self.active;
        for (index, stage) in self.stages.iter_mut().enumerate() {
            let target = if active == Some(StageId(index)) { 1.0 } else { 0.0 };
            stage.blend = approach(stage.blend, target, BLEND_TIME_CONSTANT, dt).clamp(0.0, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::default_roster;

    fn scene() -> PortalScene {
        PortalScene::with_default_roster()
    }

    fn id(scene: &PortalScene, name: &str) -> StageId {
        scene.stage_id(name).expect("stage in stock roster")
    }

    #[test]
    fn construction_rejects_duplicate_names_case_insensitively() {
        let mut roster = default_roster();
        roster[2].name = "fa".to_string();
        match PortalScene::new(roster) {
            Err(SceneError::DuplicateStage(name)) => assert_eq!(name, "fa"),
            other => panic!("expected duplicate-name error, got {other:?}"),
        }
    }

    #[test]
    fn construction_rejects_blank_names_and_empty_rosters() {
        assert!(matches!(
            PortalScene::new(Vec::new()),
            Err(SceneError::EmptyRoster)
        ));
        let mut roster = default_roster();
        roster[1].name = "  ".to_string();
        assert!(matches!(
            PortalScene::new(roster),
            Err(SceneError::UnnamedStage(1))
        ));
    }

    #[test]
    fn stage_lookup_ignores_case() {
        let scene = scene();
        assert_eq!(scene.stage_id("fa"), scene.stage_id("FA"));
        assert_eq!(scene.stage_id("missing"), None);
    }

    #[test]
    fn toggle_activates_then_clears() {
        let mut scene = scene();
        let fa = id(&scene, "FA");

        let update = scene.toggle_active(fa);
        assert_eq!(update.previous, None);
        assert_eq!(update.current, Some(fa));
        assert_eq!(scene.target(fa), 1.0);

        let update = scene.toggle_active(fa);
        assert_eq!(update.previous, Some(fa));
        assert_eq!(update.current, None);
        assert_eq!(scene.active(), None);
        for (stage_id, _) in scene.stages() {
            assert_eq!(scene.target(stage_id), 0.0);
        }
    }

    #[test]
    fn activating_one_stage_displaces_another_in_the_same_update() {
        let mut scene = scene();
        let fa = id(&scene, "FA");
        let lo = id(&scene, "LO");

        scene.toggle_active(lo);
        let update = scene.toggle_active(fa);

        assert_eq!(update.previous, Some(lo));
        assert_eq!(update.current, Some(fa));
        assert_eq!(scene.target(lo), 0.0);
        assert_eq!(scene.target(fa), 1.0);
        let open_targets = scene
            .stages()
            .filter(|(stage_id, _)| scene.target(*stage_id) == 1.0)
            .count();
        assert_eq!(open_targets, 1);
    }

    #[test]
    fn hover_clearing_is_scoped_to_the_hovered_stage() {
        let mut scene = scene();
        let fa = id(&scene, "FA");
        let lo = id(&scene, "LO");

        scene.pointer_enter(fa);
        scene.pointer_leave(lo);
        assert_eq!(scene.hovered(), Some(fa), "unrelated leave must not clear");

        scene.pointer_leave(fa);
        assert_eq!(scene.hovered(), None);
        scene.pointer_leave(fa);
        assert_eq!(scene.hovered(), None, "repeated leave stays a no-op");
    }

    #[test]
    fn hover_and_activation_are_independent() {
        let mut scene = scene();
        let fa = id(&scene, "FA");
        let lo = id(&scene, "LO");

        scene.pointer_enter(fa);
        scene.toggle_active(lo);
        assert_eq!(scene.hovered(), Some(fa));
        assert_eq!(scene.active(), Some(lo));

        scene.pointer_leave(fa);
        assert_eq!(scene.active(), Some(lo), "leave must not touch activation");
    }

    #[test]
    fn blends_stay_in_unit_range_for_any_frame_spacing() {
        let mut scene = scene();
        let fa = id(&scene, "FA");
        scene.toggle_active(fa);

        for dt in [0.0, 1.0e-4, 0.016, 0.1, 1.0, 50.0, f32::INFINITY] {
            scene.advance(dt);
            for (stage_id, stage) in scene.stages() {
                let blend = stage.blend();
                assert!(
                    (0.0..=1.0).contains(&blend),
                    "stage {:?} blend {blend} out of range after dt {dt}",
                    stage_id
                );
            }
        }
        assert!(scene.blend(fa) > 0.999);
    }

    #[test]
    fn advance_moves_only_toward_targets() {
        let mut scene = scene();
        let fa = id(&scene, "FA");
        let lo = id(&scene, "LO");

        scene.toggle_active(fa);
        for _ in 0..20 {
            scene.advance(0.1);
        }
        assert!(scene.blend(fa) > 0.99);
        assert_eq!(scene.blend(lo), 0.0);

        // Retargeting mid-flight just redirects the easing.
        scene.toggle_active(lo);
        scene.advance(0.1);
        assert!(scene.blend(fa) < 0.99);
        assert!(scene.blend(lo) > 0.0);
    }

    #[test]
    fn deactivated_stage_settles_closed_within_two_seconds() {
        let mut scene = scene();
        let fa = id(&scene, "FA");

        scene.toggle_active(fa);
        for _ in 0..600 {
            scene.advance(1.0 / 60.0);
        }
        assert!(scene.blend(fa) > 0.999, "stage should be settled open");

        scene.toggle_active(fa);
        for _ in 0..120 {
            scene.advance(1.0 / 60.0);
        }
        assert!(
            scene.blend(fa) < 0.01,
            "blend {} still open after two seconds",
            scene.blend(fa)
        );
    }
}
