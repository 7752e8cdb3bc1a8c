//! Per-frame update and draw. Live mode advances the scene and camera from
//! wall-clock time; replay mode reads the recorded snapshot for the current
//! elapsed time instead. Draw order is stage quads (painter-sorted), then
//! dioramas with a fresh depth buffer, then markers and HUD panels.

use std::f32::consts::PI;
use std::time::Instant;

use bytemuck::cast_slice;
use wgpu::SurfaceError;
use winit::window::CursorIcon;

use crate::camera::CameraProjector;
use crate::picking::{cursor_to_ndc, pick_stage, project_frame_bounds};

use super::hud::{status_lines, PanelRect, StageStatusRow, StatusMode};
use super::stages::{
    diorama_instance, marker_instance, scene_uniform, stage_instance, DioramaInstance,
    DioramaShape, MarkerInstance, StageFrameState, MARKER_VERTICES,
};
use super::{TextPanel, ViewerApp};

/// Diorama idle spin in radians per second.
const DIORAMA_SPIN_RATE: f32 = 0.6;
const HUD_MARGIN: f32 = 12.0;

pub(super) fn render(app: &mut ViewerApp) -> Result<(), SurfaceError> {
    let now = Instant::now();
    let dt = now.duration_since(app.last_frame).as_secs_f32();
    app.last_frame = now;

    advance(app, dt);

    let aspect = app.size.width.max(1) as f32 / app.size.height.max(1) as f32;
    let projector = app.rig.projector(aspect);

    refresh_frame_bounds(app, projector.as_ref());
    refresh_hover(app);

    let inputs = gather_frame_inputs(app);
    let label_draws = update_hud(app, &inputs, projector.as_ref());

    let frame = app.surface.get_current_texture()?;
    let view = frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());
    let mut encoder = app
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("portal-viewer-encoder"),
        });

    draw_stages(app, &inputs, projector.as_ref(), &view, &mut encoder);
    draw_dioramas(app, &inputs, projector.as_ref(), &view, &mut encoder);
    draw_markers(app, &inputs, projector.as_ref(), &view, &mut encoder);
    draw_hud(app, &label_draws, &view, &mut encoder);

    app.queue.submit(std::iter::once(encoder.finish()));
    frame.present();
    Ok(())
}

fn advance(app: &mut ViewerApp, dt: f32) {
    if let Some(replay) = app.replay.as_mut() {
        let elapsed = replay.started.elapsed().as_secs_f32();
        let camera = replay.driver.frame_at(elapsed).camera;
        if camera != replay.last_camera {
            replay.last_camera = camera;
            app.rig.retarget(&camera);
        }
        if replay.driver.finished(elapsed) && !replay.finish_logged {
            replay.finish_logged = true;
            log::info!(
                "replay finished after {:.2}s; holding the last frame",
                replay.driver.duration_seconds()
            );
        }
    } else {
        app.scene.advance(dt);
    }
    app.rig.advance(dt);
    app.diorama_spin = (app.diorama_spin + DIORAMA_SPIN_RATE * dt) % (2.0 * PI);
}

fn refresh_frame_bounds(app: &mut ViewerApp, projector: Option<&CameraProjector>) {
    app.frame_bounds.clear();
    let Some(projector) = projector else {
        return;
    };
    let scene = &app.scene;
    let placements = &app.placements;
    let bounds = &mut app.frame_bounds;
    for ((id, _), placement) in scene.stages().zip(placements) {
        if let Some(frame) = project_frame_bounds(projector, placement.model()) {
            bounds.push((id, frame));
        }
    }
}

/// Hover follows the cursor against the freshly projected frame bounds, so
/// it stays accurate while the camera eases underneath a resting pointer.
fn refresh_hover(app: &mut ViewerApp) {
    if app.replay.is_some() || app.dragging {
        return;
    }
    let picked = app
        .cursor
        .and_then(|position| cursor_to_ndc(position, app.size))
        .and_then(|ndc| pick_stage(&app.frame_bounds, ndc));
    let current = app.scene.hovered();
    if picked == current {
        return;
    }
    if let Some(previous) = current {
        app.scene.pointer_leave(previous);
    }
    if let Some(next) = picked {
        app.scene.pointer_enter(next);
    }
    app.window.set_cursor_icon(if picked.is_some() {
        CursorIcon::Pointer
    } else {
        CursorIcon::Default
    });
}

/// Everything a frame draws with, resolved from either the live scene or the
/// replay snapshot before any buffers are touched.
struct FrameInputs {
    states: Vec<StageFrameState>,
    rows: Vec<StageStatusRow>,
    active_name: Option<String>,
    hovered_name: Option<String>,
    mode: StatusMode,
}

fn gather_frame_inputs(app: &ViewerApp) -> FrameInputs {
    let scene = &app.scene;
    let mut states = Vec::with_capacity(scene.stage_count());
    let mut rows = Vec::with_capacity(scene.stage_count());

    if let Some(replay) = app.replay.as_ref() {
        let elapsed = replay.started.elapsed().as_secs_f32();
        let snapshot = replay.driver.frame_at(elapsed);
        for (sample, (_, stage)) in snapshot.stages.iter().zip(scene.stages()) {
            let name = stage.name();
            let active = snapshot
                .active
                .as_deref()
                .is_some_and(|selected| selected.eq_ignore_ascii_case(name));
            let hovered = snapshot
                .hovered
                .as_deref()
                .is_some_and(|under| under.eq_ignore_ascii_case(name));
            states.push(StageFrameState {
                blend: sample.blend,
                hovered,
                active,
            });
            rows.push(StageStatusRow {
                name: name.to_string(),
                label: stage.config().label.clone(),
                blend: sample.blend,
                target: sample.target,
            });
        }
        FrameInputs {
            states,
            rows,
            active_name: snapshot.active.clone(),
            hovered_name: snapshot.hovered.clone(),
            mode: StatusMode::Replay {
                elapsed,
                duration: replay.driver.duration_seconds(),
                fps: replay.driver.fps(),
                tau: replay.driver.tau(),
            },
        }
    } else {
        let active = scene.active();
        let hovered = scene.hovered();
        for (id, stage) in scene.stages() {
            states.push(StageFrameState {
                blend: stage.blend(),
                hovered: hovered == Some(id),
                active: active == Some(id),
            });
            rows.push(StageStatusRow {
                name: stage.name().to_string(),
                label: stage.config().label.clone(),
                blend: stage.blend(),
                target: scene.target(id),
            });
        }
        FrameInputs {
            states,
            rows,
            active_name: active.map(|id| scene.stage(id).name().to_string()),
            hovered_name: hovered.map(|id| scene.stage(id).name().to_string()),
            mode: StatusMode::Live,
        }
    }
}

/// Refresh panel contents and rects. Returns the label panels that landed on
/// screen this frame.
fn update_hud(
    app: &mut ViewerApp,
    inputs: &FrameInputs,
    projector: Option<&CameraProjector>,
) -> Vec<usize> {
    let Some(hud) = app.hud.as_mut() else {
        return Vec::new();
    };

    let lines = status_lines(
        &inputs.mode,
        inputs.active_name.as_deref(),
        inputs.hovered_name.as_deref(),
        &inputs.rows,
        app.rig.eye(),
        app.rig.focus(),
    );
    hud.status.set_lines(&lines);
    let (status_width, status_height) = hud.status.size();
    hud.status.set_rect(
        &app.queue,
        app.size,
        PanelRect {
            x: HUD_MARGIN,
            y: app.size.height as f32 - status_height as f32 - HUD_MARGIN,
            width: status_width as f32,
            height: status_height as f32,
        },
    );

    let mut visible = Vec::new();
    if let Some(projector) = projector {
        for (index, (panel, placement)) in
            hud.labels.iter_mut().zip(&app.placements).enumerate()
        {
            let Some(projected) = projector.project(placement.label_anchor()) else {
                continue;
            };
            let (width, height) = panel.size();
            let x = (projected.ndc[0] * 0.5 + 0.5) * app.size.width as f32 - width as f32 / 2.0;
            let y = (0.5 - projected.ndc[1] * 0.5) * app.size.height as f32 - height as f32 / 2.0;
            panel.set_rect(
                &app.queue,
                app.size,
                PanelRect {
                    x,
                    y,
                    width: width as f32,
                    height: height as f32,
                },
            );
            visible.push(index);
        }
    }

    hud.status.upload(&app.queue);
    for panel in &mut hud.labels {
        panel.upload(&app.queue);
    }
    visible
}

fn draw_stages(
    app: &ViewerApp,
    inputs: &FrameInputs,
    projector: Option<&CameraProjector>,
    view: &wgpu::TextureView,
    encoder: &mut wgpu::CommandEncoder,
) {
    let mut draw_order: Vec<usize> = Vec::new();
    if let Some(projector) = projector {
        let uniform = scene_uniform(projector.matrix());
        app.queue
            .write_buffer(&app.scene_uniform_buffer, 0, cast_slice(&[uniform]));

        let eye = app.rig.eye();
        let mut instances = Vec::with_capacity(app.placements.len());
        for (((_, stage), placement), state) in app
            .scene
            .stages()
            .zip(&app.placements)
            .zip(&inputs.states)
        {
            instances.push(stage_instance(placement, stage.config(), *state, eye));
        }
        app.queue
            .write_buffer(&app.stage_instance_buffer, 0, cast_slice(&instances));

        // Painter order: farthest frame first so nearer alpha quads cover it.
        let mut order: Vec<(usize, f32)> = app
            .frame_bounds
            .iter()
            .map(|(id, bounds)| (id.index(), bounds.depth()))
            .collect();
        order.sort_by(|a, b| b.1.total_cmp(&a.1));
        draw_order = order.into_iter().map(|(index, _)| index).collect();
    }

    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("stage-pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(app.background),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    if draw_order.is_empty() {
        return;
    }
    pass.set_pipeline(&app.stage_pipeline);
    pass.set_bind_group(1, &app.scene_bind_group, &[]);
    pass.set_vertex_buffer(0, app.stage_vertex_buffer.slice(..));
    pass.set_vertex_buffer(1, app.stage_instance_buffer.slice(..));
    pass.set_index_buffer(app.stage_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
    for index in draw_order {
        pass.set_bind_group(0, &app.stage_bindings[index].bind_group, &[]);
        pass.draw_indexed(
            0..app.stage_index_count,
            0,
            index as u32..index as u32 + 1,
        );
    }
}

fn draw_dioramas(
    app: &mut ViewerApp,
    inputs: &FrameInputs,
    projector: Option<&CameraProjector>,
    view: &wgpu::TextureView,
    encoder: &mut wgpu::CommandEncoder,
) {
    if projector.is_none() {
        return;
    }

    let mut sphere = Vec::new();
    let mut cube = Vec::new();
    let mut cone = Vec::new();
    for (((_, stage), placement), state) in app
        .scene
        .stages()
        .zip(&app.placements)
        .zip(&inputs.states)
    {
        let Some(instance) =
            diorama_instance(placement, stage.config(), *state, app.diorama_spin)
        else {
            continue;
        };
        match placement.shape() {
            DioramaShape::Sphere => sphere.push(instance),
            DioramaShape::Cube => cube.push(instance),
            DioramaShape::Cone => cone.push(instance),
        }
    }

    let total = sphere.len() + cube.len() + cone.len();
    if total == 0 {
        return;
    }
    ensure_diorama_capacity(app, total);

    let mut combined = Vec::with_capacity(total);
    let sphere_range = append_instances(&mut combined, &sphere);
    let cube_range = append_instances(&mut combined, &cube);
    let cone_range = append_instances(&mut combined, &cone);
    app.queue
        .write_buffer(&app.diorama_instance_buffer, 0, cast_slice(&combined));

    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("diorama-pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: &app.depth_view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    pass.set_pipeline(&app.diorama_pipeline);
    pass.set_bind_group(0, &app.scene_bind_group, &[]);
    let instance_bytes = (combined.len() * std::mem::size_of::<DioramaInstance>()) as u64;
    pass.set_vertex_buffer(1, app.diorama_instance_buffer.slice(0..instance_bytes));

    for (shape, range) in [
        (DioramaShape::Sphere, sphere_range),
        (DioramaShape::Cube, cube_range),
        (DioramaShape::Cone, cone_range),
    ] {
        if range.count == 0 {
            continue;
        }
        let buffers = app.diorama_library.buffers(shape);
        pass.set_vertex_buffer(0, buffers.vertex.slice(..));
        pass.set_index_buffer(buffers.index.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(
            0..buffers.index_count,
            0,
            range.offset..range.offset + range.count,
        );
    }
}

fn draw_markers(
    app: &mut ViewerApp,
    inputs: &FrameInputs,
    projector: Option<&CameraProjector>,
    view: &wgpu::TextureView,
    encoder: &mut wgpu::CommandEncoder,
) {
    let Some(projector) = projector else {
        return;
    };
    let mut instances = Vec::with_capacity(app.placements.len());
    for (((_, stage), placement), state) in app
        .scene
        .stages()
        .zip(&app.placements)
        .zip(&inputs.states)
    {
        if let Some(marker) = marker_instance(projector, placement, stage.config(), *state) {
            instances.push(marker);
        }
    }
    if instances.is_empty() {
        return;
    }
    ensure_marker_capacity(app, instances.len());
    app.queue
        .write_buffer(&app.marker_instance_buffer, 0, cast_slice(&instances));

    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("marker-pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    pass.set_pipeline(&app.marker_pipeline);
    pass.set_vertex_buffer(0, app.marker_vertex_buffer.slice(..));
    let instance_bytes = (instances.len() * std::mem::size_of::<MarkerInstance>()) as u64;
    pass.set_vertex_buffer(1, app.marker_instance_buffer.slice(0..instance_bytes));
    pass.draw(0..MARKER_VERTICES.len() as u32, 0..instances.len() as u32);
}

fn draw_hud(
    app: &ViewerApp,
    label_draws: &[usize],
    view: &wgpu::TextureView,
    encoder: &mut wgpu::CommandEncoder,
) {
    let Some(hud) = app.hud.as_ref() else {
        return;
    };
    if hud.status.is_visible() {
        draw_panel(app, &hud.status, "status-panel-pass", view, encoder);
    }
    for &index in label_draws {
        let panel = &hud.labels[index];
        if panel.is_visible() {
            draw_panel(app, panel, "label-panel-pass", view, encoder);
        }
    }
}

fn draw_panel(
    app: &ViewerApp,
    panel: &TextPanel,
    label: &'static str,
    view: &wgpu::TextureView,
    encoder: &mut wgpu::CommandEncoder,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    pass.set_pipeline(&app.overlay_pipeline);
    pass.set_bind_group(0, panel.bind_group(), &[]);
    pass.set_vertex_buffer(0, panel.vertex_buffer().slice(..));
    pass.set_index_buffer(app.stage_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
    pass.draw_indexed(0..app.stage_index_count, 0, 0..1);
}

#[derive(Clone, Copy, Default)]
struct InstanceRange {
    offset: u32,
    count: u32,
}

/// Append `source` instances into `target`, returning the range to draw.
fn append_instances(target: &mut Vec<DioramaInstance>, source: &[DioramaInstance]) -> InstanceRange {
    let offset = target.len() as u32;
    target.extend_from_slice(source);
    InstanceRange {
        offset,
        count: source.len() as u32,
    }
}

fn ensure_diorama_capacity(app: &mut ViewerApp, required: usize) {
    if required <= app.diorama_capacity {
        return;
    }
    let mut capacity = app.diorama_capacity.max(1);
    while capacity < required {
        capacity *= 2;
    }
    let label = format!("diorama-instance-buffer({capacity})");
    app.diorama_instance_buffer = app.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label.as_str()),
        size: (capacity * std::mem::size_of::<DioramaInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    app.diorama_capacity = capacity;
}

fn ensure_marker_capacity(app: &mut ViewerApp, required: usize) {
    if required <= app.marker_capacity {
        return;
    }
    let mut capacity = app.marker_capacity.max(1);
    while capacity < required {
        capacity *= 2;
    }
    let label = format!("marker-instance-buffer({capacity})");
    app.marker_instance_buffer = app.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label.as_str()),
        size: (capacity * std::mem::size_of::<MarkerInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    app.marker_capacity = capacity;
}
