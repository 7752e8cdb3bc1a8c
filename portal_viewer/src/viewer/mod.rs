//! Central runtime state for the viewer. Owns the wgpu device/surface, the
//! portal scene, the easing camera rig, and the GPU resources for the stage,
//! diorama, marker, and HUD passes. Submodules cover lifecycle slices:
//! `init` for setup, `input` for pointer/key routing, `render` for the
//! per-frame update and draw, `stages` for instance assembly, `hud` for text
//! panels, and `shaders` for the WGSL sources.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use wgpu::SurfaceError;
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, KeyEvent, MouseButton},
    window::Window,
};

use portal_scene::{CameraPose, PortalScene, StageId};

use crate::camera::OrbitRig;
use crate::picking::FrameBounds;
use crate::replay::ReplayDriver;
use crate::texture::StageTexture;

mod hud;
mod init;
mod input;
mod render;
mod shaders;
mod stages;

pub use hud::{font_ready, install_font};

use hud::TextPanel;
use stages::StagePlacement;

/// GPU handles for one stage's backdrop texture.
struct StageBinding {
    bind_group: wgpu::BindGroup,
    _texture: wgpu::Texture,
    _view: wgpu::TextureView,
}

struct PrimitiveBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

/// One uploaded mesh per diorama silhouette.
struct DioramaLibrary {
    sphere: PrimitiveBuffers,
    cube: PrimitiveBuffers,
    cone: PrimitiveBuffers,
}

impl DioramaLibrary {
    fn buffers(&self, shape: stages::DioramaShape) -> &PrimitiveBuffers {
        match shape {
            stages::DioramaShape::Sphere => &self.sphere,
            stages::DioramaShape::Cube => &self.cube,
            stages::DioramaShape::Cone => &self.cone,
        }
    }
}

/// Text panels, present only when a HUD font was installed.
struct HudPanels {
    status: TextPanel,
    labels: Vec<TextPanel>,
}

/// Timeline playback state. While this is set, the scene is driven from the
/// recorded frames and pointer/key input is ignored.
struct ReplayState {
    driver: ReplayDriver,
    started: Instant,
    last_camera: CameraPose,
    finish_logged: bool,
}

pub struct ViewerApp {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    background: wgpu::Color,

    stage_pipeline: wgpu::RenderPipeline,
    stage_vertex_buffer: wgpu::Buffer,
    stage_index_buffer: wgpu::Buffer,
    stage_index_count: u32,
    stage_instance_buffer: wgpu::Buffer,
    stage_bindings: Vec<StageBinding>,
    _stage_sampler: wgpu::Sampler,
    scene_uniform_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,

    diorama_pipeline: wgpu::RenderPipeline,
    diorama_instance_buffer: wgpu::Buffer,
    diorama_capacity: usize,
    diorama_library: DioramaLibrary,
    _depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,

    marker_pipeline: wgpu::RenderPipeline,
    marker_vertex_buffer: wgpu::Buffer,
    marker_instance_buffer: wgpu::Buffer,
    marker_capacity: usize,

    overlay_pipeline: wgpu::RenderPipeline,
    hud: Option<HudPanels>,

    scene: PortalScene,
    placements: Vec<StagePlacement>,
    rig: OrbitRig,
    replay: Option<ReplayState>,

    cursor: Option<PhysicalPosition<f64>>,
    dragging: bool,
    last_press: Option<(StageId, Instant)>,
    frame_bounds: Vec<(StageId, FrameBounds)>,
    diorama_spin: f32,
    last_frame: Instant,
}

impl ViewerApp {
    pub async fn new(
        window: Arc<Window>,
        scene: PortalScene,
        background: wgpu::Color,
        textures: Vec<StageTexture>,
        replay: Option<ReplayDriver>,
    ) -> Result<Self> {
        init::new(window, scene, background, textures, replay).await
    }

    pub fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        let (depth_texture, depth_view) = init::create_depth_texture(&self.device, new_size);
        self._depth_texture = depth_texture;
        self.depth_view = depth_view;
    }

    pub fn render(&mut self) -> Result<(), SurfaceError> {
        render::render(self)
    }

    pub fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        input::handle_cursor_moved(self, position);
    }

    pub fn handle_cursor_left(&mut self) {
        input::handle_cursor_left(self);
    }

    pub fn handle_mouse_button(&mut self, state: ElementState, button: MouseButton) {
        input::handle_mouse_button(self, state, button);
    }

    pub fn handle_key(&mut self, event: &KeyEvent) {
        input::handle_key(self, event);
    }
}
