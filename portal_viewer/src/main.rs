//! Interactive viewer for the portal stage scene. Boots wgpu over a winit
//! window, renders the stage roster with hover/selection feedback, and can
//! replay a timeline artifact recorded by the headless runner.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pollster::FutureExt;
use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

use portal_scene::{default_roster, load_roster, PortalScene, StageConfig};

mod camera;
mod cli;
mod picking;
mod replay;
mod texture;
mod viewer;

use cli::Args;
use texture::{load_stage_texture, scene_clear_color};
use viewer::ViewerApp;

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let roster = match args.stages.as_deref() {
        Some(path) => load_roster(path)?,
        None => default_roster(),
    };

    if args.print_roster {
        print_roster(&roster);
        return Ok(());
    }

    let background = scene_clear_color(&roster);
    let textures: Vec<_> = roster
        .iter()
        .map(|config| load_stage_texture(args.assets.as_deref(), config))
        .collect();

    match args.font.as_deref() {
        Some(path) => {
            if let Err(err) = viewer::install_font(path) {
                log::warn!("HUD disabled: {err:#}");
            }
        }
        None => log::info!("no --font given; HUD text panels disabled"),
    }

    let scene = PortalScene::new(roster)?;
    let replay = match args.replay.as_deref() {
        Some(path) => {
            let driver = replay::load_timeline(path, &scene)?;
            log::info!(
                "replay loaded: {} frames ({:.2}s at {} fps, tau {:.2})",
                driver.frame_count(),
                driver.duration_seconds(),
                driver.fps(),
                driver.tau()
            );
            Some(driver)
        }
        None => None,
    };

    let event_loop = EventLoop::new().context("creating winit event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("portal stages")
            .with_inner_size(PhysicalSize::new(args.width, args.height))
            .build(&event_loop)
            .context("creating viewer window")?,
    );

    let mut app = ViewerApp::new(window, scene, background, textures, replay).block_on()?;

    event_loop
        .run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { window_id, event } if window_id == app.window().id() => {
                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key: Key::Named(NamedKey::Escape),
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => target.exit(),
                        WindowEvent::KeyboardInput {
                            event: key_event, ..
                        } => app.handle_key(&key_event),
                        WindowEvent::Resized(new_size) => app.resize(new_size),
                        WindowEvent::CursorMoved { position, .. } => {
                            app.handle_cursor_moved(position)
                        }
                        WindowEvent::CursorLeft { .. } => app.handle_cursor_left(),
                        WindowEvent::MouseInput { state, button, .. } => {
                            app.handle_mouse_button(state, button)
                        }
                        WindowEvent::RedrawRequested => match app.render() {
                            Ok(_) => {}
                            Err(SurfaceError::Lost) => app.resize(app.size()),
                            Err(SurfaceError::OutOfMemory) => target.exit(),
                            Err(err) => eprintln!("[portal_viewer] render error: {err:?}"),
                        },
                        _ => {}
                    }
                }
                Event::AboutToWait => app.window().request_redraw(),
                _ => {}
            }
        })
        .context("running viewer application")?;
    Ok(())
}

fn print_roster(roster: &[StageConfig]) {
    use portal_scene::stage::{BACKDROP_RADIUS, FRAME_DEPTH, FRAME_HEIGHT, FRAME_WIDTH};

    println!("{} stages", roster.len());
    println!(
        "frame {FRAME_WIDTH:.1} x {FRAME_HEIGHT:.1} x {FRAME_DEPTH:.1}, backdrop radius {BACKDROP_RADIUS:.1}"
    );
    for config in roster {
        println!(
            "  {:<3} {:<12} color ({:.2}, {:.2}, {:.2})  texture {}  at ({:.1}, {:.1}, {:.1})  yaw {:.2}",
            config.name,
            config.label,
            config.color[0],
            config.color[1],
            config.color[2],
            config.texture,
            config.position[0],
            config.position[1],
            config.position[2],
            config.rotation_y,
        );
    }
}
