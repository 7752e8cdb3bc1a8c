//! Pointer and keyboard routing. Replay playback ignores all of this so the
//! recorded timeline stays authoritative.

use std::time::{Duration, Instant};

use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, KeyEvent, MouseButton},
    keyboard::Key,
};

use portal_scene::{pose_for_selection, StageId};

use crate::picking::{cursor_to_ndc, pick_stage};

use super::ViewerApp;

/// Two presses on the same stage inside this window count as a double-click.
const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);

pub(super) fn handle_cursor_moved(app: &mut ViewerApp, position: PhysicalPosition<f64>) {
    if app.replay.is_some() {
        return;
    }
    let previous = app.cursor.replace(position);
    if app.dragging {
        if let Some(previous) = previous {
            let dx = (position.x - previous.x) as f32;
            let dy = (position.y - previous.y) as f32;
            app.rig.orbit(dx, dy);
        }
    }
}

pub(super) fn handle_cursor_left(app: &mut ViewerApp) {
    app.cursor = None;
    app.dragging = false;
}

pub(super) fn handle_mouse_button(
    app: &mut ViewerApp,
    state: ElementState,
    button: MouseButton,
) {
    if app.replay.is_some() || button != MouseButton::Left {
        return;
    }
    match state {
        ElementState::Pressed => handle_press(app),
        ElementState::Released => app.dragging = false,
    }
}

fn handle_press(app: &mut ViewerApp) {
    let picked = app
        .cursor
        .and_then(|position| cursor_to_ndc(position, app.size))
        .and_then(|ndc| pick_stage(&app.frame_bounds, ndc));

    match picked {
        Some(id) => {
            let now = Instant::now();
            let double = matches!(
                app.last_press,
                Some((previous, at)) if previous == id && now.duration_since(at) <= DOUBLE_CLICK_WINDOW
            );
            if double {
                toggle_stage(app, id);
                app.last_press = None;
            } else {
                app.last_press = Some((id, now));
            }
        }
        None => {
            app.last_press = None;
            app.dragging = true;
        }
    }
}

/// Digits select stages by roster position, `0` clears the selection.
pub(super) fn handle_key(app: &mut ViewerApp, event: &KeyEvent) {
    if app.replay.is_some() || !event.state.is_pressed() || event.repeat {
        return;
    }
    let Key::Character(symbol) = event.logical_key.as_ref() else {
        return;
    };
    match symbol.as_bytes() {
        [b'0'] => {
            if let Some(active) = app.scene.active() {
                toggle_stage(app, active);
            }
        }
        [digit @ b'1'..=b'9'] => {
            let index = (*digit - b'1') as usize;
            let id = app.scene.stages().nth(index).map(|(id, _)| id);
            if let Some(id) = id {
                toggle_stage(app, id);
            }
        }
        _ => {}
    }
}

fn toggle_stage(app: &mut ViewerApp, id: StageId) {
    let update = app.scene.toggle_active(id);
    let pose = pose_for_selection(&app.scene, update.current);
    app.rig.retarget(&pose);

    let name = app.scene.stage(id).name();
    match update.current {
        Some(_) => log::info!("stage {name} selected"),
        None => log::info!("stage {name} cleared"),
    }
}
