use std::{borrow::Cow, sync::Arc, time::Instant};

use anyhow::{Context, Result};
use bytemuck::cast_slice;
use glam::Mat4;
use wgpu::util::DeviceExt;
use winit::{dpi::PhysicalSize, window::Window};

use portal_scene::{pose_for_selection, PortalScene};

use crate::camera::OrbitRig;
use crate::replay::ReplayDriver;
use crate::texture::{prepare_rgba_upload, StageTexture};

use super::hud::{self, PanelConfig, TextPanel};
use super::shaders::{
    QuadVertex, DIORAMA_SHADER_SOURCE, MARKER_SHADER_SOURCE, OVERLAY_SHADER_SOURCE, QUAD_INDICES,
    STAGE_SHADER_SOURCE,
};
use super::stages::{
    scene_uniform, DioramaInstance, DioramaShape, DioramaVertex, MarkerInstance, MarkerVertex,
    SceneUniform, StageInstance, StagePlacement, MARKER_VERTICES, STAGE_VERTICES,
};
use super::{DioramaLibrary, HudPanels, PrimitiveBuffers, ReplayState, StageBinding, ViewerApp};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const INITIAL_DIORAMA_CAPACITY: usize = 8;
const INITIAL_MARKER_CAPACITY: usize = 4;

const PANEL_PADDING: u32 = 8;
const STATUS_PANEL_WIDTH: u32 = 520;
const STATUS_PANEL_HEIGHT: u32 = 168;
const STATUS_FOREGROUND: [u8; 4] = [235, 235, 235, 240];
const LABEL_ALPHA: u8 = 240;

/// Bundles the wgpu objects tied to the viewer window.
struct WgpuBootstrap {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    present_mode: wgpu::PresentMode,
    alpha_mode: wgpu::CompositeAlphaMode,
}

/// Bind group layouts shared across the pipelines.
struct BindLayouts {
    texture: wgpu::BindGroupLayout,
    uniform: wgpu::BindGroupLayout,
}

/// Bootstraps wgpu, uploads the stage backdrops, builds the four render
/// pipelines, and seeds the camera rig so frame rendering stays lightweight.
pub(super) async fn new(
    window: Arc<Window>,
    scene: PortalScene,
    background: wgpu::Color,
    textures: Vec<StageTexture>,
    replay: Option<ReplayDriver>,
) -> Result<ViewerApp> {
    let size = window.inner_size();
    let wgpu = bootstrap_wgpu(window.clone()).await?;
    let layouts = create_bind_layouts(&wgpu.device);

    let stage_sampler = create_stage_sampler(&wgpu.device);
    let stage_bindings = create_stage_bindings(
        &wgpu.device,
        &wgpu.queue,
        &layouts.texture,
        &stage_sampler,
        &scene,
        &textures,
    )?;

    let scene_uniform_buffer = wgpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("scene-uniform-buffer"),
        contents: cast_slice(&[scene_uniform(Mat4::IDENTITY)]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let scene_bind_group = wgpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("scene-uniform-bind-group"),
        layout: &layouts.uniform,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: scene_uniform_buffer.as_entire_binding(),
        }],
    });

    let stage_pipeline = create_stage_pipeline(&wgpu.device, &layouts, wgpu.surface_format);
    let diorama_pipeline = create_diorama_pipeline(&wgpu.device, &layouts, wgpu.surface_format);
    let marker_pipeline = create_marker_pipeline(&wgpu.device, wgpu.surface_format);
    let overlay_pipeline =
        create_overlay_pipeline(&wgpu.device, &layouts.texture, wgpu.surface_format);

    let stage_vertex_buffer = wgpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("stage-quad-vertex-buffer"),
        contents: cast_slice(&STAGE_VERTICES),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let stage_index_buffer = wgpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("stage-quad-index-buffer"),
        contents: cast_slice(&QUAD_INDICES),
        usage: wgpu::BufferUsages::INDEX,
    });
    let stage_instance_buffer = wgpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("stage-instance-buffer"),
        size: (scene.stage_count() * std::mem::size_of::<StageInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let diorama_library = DioramaLibrary {
        sphere: upload_primitive(&wgpu.device, "diorama-sphere", DioramaShape::Sphere),
        cube: upload_primitive(&wgpu.device, "diorama-cube", DioramaShape::Cube),
        cone: upload_primitive(&wgpu.device, "diorama-cone", DioramaShape::Cone),
    };
    let diorama_instance_buffer = wgpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("diorama-instance-buffer"),
        size: (INITIAL_DIORAMA_CAPACITY * std::mem::size_of::<DioramaInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let marker_vertex_buffer = wgpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("marker-vertex-buffer"),
        contents: cast_slice(&MARKER_VERTICES),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let marker_instance_buffer = wgpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("marker-instance-buffer"),
        size: (INITIAL_MARKER_CAPACITY * std::mem::size_of::<MarkerInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let (depth_texture, depth_view) = create_depth_texture(&wgpu.device, size);

    let hud = build_hud(&wgpu.device, &wgpu.queue, &layouts.texture, size, &scene)?;

    let placements: Vec<StagePlacement> = scene
        .stages()
        .map(|(id, stage)| StagePlacement::new(stage.config(), id.index()))
        .collect();

    let initial_pose = match &replay {
        Some(driver) => driver.frame_at(0.0).camera,
        None => pose_for_selection(&scene, scene.active()),
    };
    let rig = OrbitRig::from_pose(&initial_pose);
    let replay = replay.map(|driver| ReplayState {
        driver,
        started: Instant::now(),
        last_camera: initial_pose,
        finish_logged: false,
    });

    let app = ViewerApp {
        window,
        surface: wgpu.surface,
        device: wgpu.device,
        queue: wgpu.queue,
        config: wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: wgpu.surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu.present_mode,
            alpha_mode: wgpu.alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        },
        size,
        background,
        stage_pipeline,
        stage_vertex_buffer,
        stage_index_buffer,
        stage_index_count: QUAD_INDICES.len() as u32,
        stage_instance_buffer,
        stage_bindings,
        _stage_sampler: stage_sampler,
        scene_uniform_buffer,
        scene_bind_group,
        diorama_pipeline,
        diorama_instance_buffer,
        diorama_capacity: INITIAL_DIORAMA_CAPACITY,
        diorama_library,
        _depth_texture: depth_texture,
        depth_view,
        marker_pipeline,
        marker_vertex_buffer,
        marker_instance_buffer,
        marker_capacity: INITIAL_MARKER_CAPACITY,
        overlay_pipeline,
        hud,
        scene,
        placements,
        rig,
        replay,
        cursor: None,
        dragging: false,
        last_press: None,
        frame_bounds: Vec::new(),
        diorama_spin: 0.0,
        last_frame: Instant::now(),
    };

    app.surface.configure(&app.device, &app.config);
    Ok(app)
}

async fn bootstrap_wgpu(window: Arc<Window>) -> Result<WgpuBootstrap> {
    let instance = wgpu::Instance::default();
    let surface = instance
        .create_surface(window.clone())
        .context("creating wgpu surface")?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        })
        .await
        .context("requesting wgpu adapter")?;

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("portal-viewer-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        )
        .await
        .context("requesting wgpu device")?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .copied()
        .find(|format| format.is_srgb())
        .unwrap_or(surface_caps.formats[0]);
    let present_mode = surface_caps
        .present_modes
        .iter()
        .copied()
        .find(|mode| *mode == wgpu::PresentMode::Mailbox)
        .unwrap_or(wgpu::PresentMode::Fifo);
    let alpha_mode = surface_caps
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Opaque);

    Ok(WgpuBootstrap {
        surface,
        device,
        queue,
        surface_format,
        present_mode,
        alpha_mode,
    })
}

fn create_bind_layouts(device: &wgpu::Device) -> BindLayouts {
    let texture = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("stage-texture-layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });

    let uniform = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("scene-uniform-layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<SceneUniform>() as u64),
            },
            count: None,
        }],
    });

    BindLayouts { texture, uniform }
}

fn create_stage_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("stage-backdrop-sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

fn create_stage_bindings(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    scene: &PortalScene,
    textures: &[StageTexture],
) -> Result<Vec<StageBinding>> {
    let mut bindings = Vec::with_capacity(textures.len());
    for ((_, stage), stage_texture) in scene.stages().zip(textures) {
        let name = stage.name();
        match &stage_texture.source {
            Some(path) => log::info!("stage {name} backdrop from {}", path.display()),
            None => log::info!("stage {name} backdrop generated"),
        }

        let extent = wgpu::Extent3d {
            width: stage_texture.width,
            height: stage_texture.height,
            depth_or_array_layers: 1,
        };
        let label = format!("stage-backdrop-{}", name.to_ascii_lowercase());
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label.as_str()),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let upload =
            prepare_rgba_upload(stage_texture.width, stage_texture.height, &stage_texture.data)?;
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            upload.pixels(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(upload.bytes_per_row()),
                rows_per_image: Some(stage_texture.height),
            },
            extent,
        );

        let bind_label = format!("stage-bind-group-{}", name.to_ascii_lowercase());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(bind_label.as_str()),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        bindings.push(StageBinding {
            bind_group,
            _texture: texture,
            _view: view,
        });
    }
    Ok(bindings)
}

fn create_stage_pipeline(
    device: &wgpu::Device,
    layouts: &BindLayouts,
    surface_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("stage-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(STAGE_SHADER_SOURCE)),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("stage-pipeline-layout"),
        bind_group_layouts: &[&layouts.texture, &layouts.uniform],
        push_constant_ranges: &[],
    });

    let vertex_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
    };
    let instance_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<StageInstance>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &wgpu::vertex_attr_array![
            2 => Float32x4,
            3 => Float32x4,
            4 => Float32x4,
            5 => Float32x4,
            6 => Float32x4,
            7 => Float32x4
        ],
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("stage-pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[vertex_layout, instance_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

fn create_diorama_pipeline(
    device: &wgpu::Device,
    layouts: &BindLayouts,
    surface_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("diorama-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(DIORAMA_SHADER_SOURCE)),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("diorama-pipeline-layout"),
        bind_group_layouts: &[&layouts.uniform],
        push_constant_ranges: &[],
    });

    let vertex_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<DioramaVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
    };
    let instance_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<DioramaInstance>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &wgpu::vertex_attr_array![
            2 => Float32x4,
            3 => Float32x4,
            4 => Float32x4,
            5 => Float32x4,
            6 => Float32x4
        ],
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("diorama-pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[vertex_layout, instance_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            cull_mode: Some(wgpu::Face::Back),
            ..wgpu::PrimitiveState::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

fn create_marker_pipeline(
    device: &wgpu::Device,
    surface_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("marker-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(MARKER_SHADER_SOURCE)),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("marker-pipeline-layout"),
        bind_group_layouts: &[],
        push_constant_ranges: &[],
    });

    let vertex_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<MarkerVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x2],
    };
    let instance_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<MarkerInstance>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32,
            },
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 4,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("marker-pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[vertex_layout, instance_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

fn create_overlay_pipeline(
    device: &wgpu::Device,
    texture_layout: &wgpu::BindGroupLayout,
    surface_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("overlay-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(OVERLAY_SHADER_SOURCE)),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("overlay-pipeline-layout"),
        bind_group_layouts: &[texture_layout],
        push_constant_ranges: &[],
    });

    let vertex_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("overlay-pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[vertex_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

fn upload_primitive(device: &wgpu::Device, label: &str, shape: DioramaShape) -> PrimitiveBuffers {
    let mesh = shape.mesh();
    let vertex_label = format!("{label}-vertex-buffer");
    let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&vertex_label),
        contents: cast_slice(&mesh.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let index_label = format!("{label}-index-buffer");
    let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&index_label),
        contents: cast_slice(&mesh.indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    PrimitiveBuffers {
        vertex,
        index,
        index_count: mesh.indices.len() as u32,
    }
}

pub(super) fn create_depth_texture(
    device: &wgpu::Device,
    size: PhysicalSize<u32>,
) -> (wgpu::Texture, wgpu::TextureView) {
    let extent = wgpu::Extent3d {
        width: size.width.max(1),
        height: size.height.max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("diorama-depth-texture"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn build_hud(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    overlay_layout: &wgpu::BindGroupLayout,
    window_size: PhysicalSize<u32>,
    scene: &PortalScene,
) -> Result<Option<HudPanels>> {
    if !hud::font_ready() {
        return Ok(None);
    }
    let (advance, line_height) = hud::cell_metrics().unwrap_or((9, 19));

    let status = TextPanel::new(
        device,
        queue,
        overlay_layout,
        window_size,
        PanelConfig {
            width: STATUS_PANEL_WIDTH,
            height: STATUS_PANEL_HEIGHT,
            padding_x: PANEL_PADDING,
            padding_y: PANEL_PADDING,
            label: "status-panel".to_string(),
            foreground: STATUS_FOREGROUND,
        },
    )?;

    let mut labels = Vec::with_capacity(scene.stage_count());
    for (_, stage) in scene.stages() {
        let config = stage.config();
        let width = (config.label.chars().count() as u32 + 2) * advance + PANEL_PADDING * 2;
        let height = line_height + PANEL_PADDING * 2;
        let mut panel = TextPanel::new(
            device,
            queue,
            overlay_layout,
            window_size,
            PanelConfig {
                width,
                height,
                padding_x: PANEL_PADDING,
                padding_y: PANEL_PADDING,
                label: format!("label-panel-{}", config.name.to_ascii_lowercase()),
                foreground: hud::color_to_rgba(config.color, LABEL_ALPHA),
            },
        )?;
        panel.set_lines(std::slice::from_ref(&config.label));
        labels.push(panel);
    }

    Ok(Some(HudPanels { status, labels }))
}
