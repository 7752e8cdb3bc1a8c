//! HUD text panels rasterized with a runtime-loaded font.
//!
//! Each panel owns an RGBA strip that glyph cells are blitted into, uploaded
//! as a texture and drawn as a screen-space quad. The font arrives via
//! `--font` at startup; without one the panels stay disabled and the viewer
//! runs unlabelled.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use bytemuck::cast_slice;
use fontdue::{Font, FontSettings};
use glam::Vec3;
use once_cell::sync::{Lazy, OnceCell};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use super::shaders::QuadVertex;
use crate::texture::prepare_rgba_upload;

const FONT_SIZE_PX: f32 = 15.0;
const BG_COLOR: [u8; 4] = [8, 9, 12, 110];

static FONT: OnceCell<Font> = OnceCell::new();
static GLYPH_LAYOUT: OnceCell<GlyphLayout> = OnceCell::new();
static GLYPH_CACHE: Lazy<Mutex<HashMap<char, GlyphBitmap>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Install the HUD font from disk. Panels can only be built afterwards, and
/// the font cannot be swapped once installed.
pub fn install_font(path: &Path) -> Result<()> {
    let data = fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
    let font = Font::from_bytes(data, FontSettings::default())
        .map_err(|err| anyhow!("parsing font {}: {err}", path.display()))?;
    let layout = GlyphLayout::from_font(&font, FONT_SIZE_PX);
    FONT.set(font)
        .map_err(|_| anyhow!("HUD font already installed"))?;
    GLYPH_LAYOUT
        .set(layout)
        .map_err(|_| anyhow!("HUD font already installed"))?;
    Ok(())
}

pub fn font_ready() -> bool {
    FONT.get().is_some() && GLYPH_LAYOUT.get().is_some()
}

/// Cell metrics of the installed font as (advance, line height) pixels.
pub(super) fn cell_metrics() -> Option<(u32, u32)> {
    let layout = GLYPH_LAYOUT.get()?;
    Some((layout.cell_advance, layout.line_height))
}

/// Screen-pixel rectangle a panel is drawn into.
#[derive(Clone, Copy, Debug)]
pub(super) struct PanelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

pub(super) struct PanelConfig {
    pub width: u32,
    pub height: u32,
    pub padding_x: u32,
    pub padding_y: u32,
    pub label: String,
    pub foreground: [u8; 4],
}

pub(super) struct TextPanel {
    texture: wgpu::Texture,
    _view: wgpu::TextureView,
    _sampler: wgpu::Sampler,
    bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padding_x: u32,
    padding_y: u32,
    foreground: [u8; 4],
    pixels: Vec<u8>,
    last_lines: Vec<String>,
    dirty: bool,
    visible: bool,
}

impl TextPanel {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bind_group_layout: &wgpu::BindGroupLayout,
        window_size: PhysicalSize<u32>,
        config: PanelConfig,
    ) -> Result<Self> {
        let extent = wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        };
        let texture_label = format!("{}-texture", config.label);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(texture_label.as_str()),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler_label = format!("{}-sampler", config.label);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(sampler_label.as_str()),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_label = format!("{}-bind-group", config.label);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(bind_group_label.as_str()),
            layout: bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let mut pixels = vec![0u8; (config.width * config.height * 4) as usize];
        fill_background(&mut pixels);
        let upload = prepare_rgba_upload(config.width, config.height, &pixels)?;
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
                rows_per_image: Some(config.height),
            },
            extent,
        );

        let initial_rect = PanelRect {
            x: 0.0,
            y: 0.0,
            width: config.width as f32,
            height: config.height as f32,
        };
        let vertex_label = format!("{}-vertices", config.label);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(vertex_label.as_str()),
            contents: cast_slice(&panel_vertices(initial_rect, window_size)),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Ok(Self {
            texture,
            _view: view,
            _sampler: sampler,
            bind_group,
            vertex_buffer,
            width: config.width,
            height: config.height,
            padding_x: config.padding_x,
            padding_y: config.padding_y,
            foreground: config.foreground,
            pixels,
            last_lines: Vec::new(),
            dirty: false,
            visible: false,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Move the panel quad. Panels that follow projected anchors call this
    /// every frame, so the vertices are written in place.
    pub fn set_rect(
        &self,
        queue: &wgpu::Queue,
        window_size: PhysicalSize<u32>,
        rect: PanelRect,
    ) {
        let vertices = panel_vertices(rect, window_size);
        queue.write_buffer(&self.vertex_buffer, 0, cast_slice(&vertices));
    }

    /// Re-rasterize the panel content. Unchanged lines are a no-op.
    pub fn set_lines(&mut self, lines: &[String]) {
        if self.last_lines.as_slice() == lines {
            return;
        }
        self.last_lines = lines.to_vec();
        fill_background(&mut self.pixels);

        let Some(layout) = GLYPH_LAYOUT.get() else {
            self.visible = false;
            return;
        };

        let usable_width = self.width.saturating_sub(self.padding_x * 2);
        let usable_height = self.height.saturating_sub(self.padding_y * 2);
        let advance = layout.cell_advance.max(1);
        let line_height = layout.line_height.max(1);
        let max_cols = (usable_width / advance) as usize;
        let max_rows = (usable_height / line_height) as usize;

        let display = fit_lines(lines, max_cols, max_rows);
        for (row, line) in display.iter().enumerate() {
            let line_top = self.padding_y + row as u32 * line_height;
            for (col, ch) in line.chars().enumerate() {
                if ch == '\r' {
                    continue;
                }
                let glyph = glyph_for_char(ch);
                let cell_x = self.padding_x + col as u32 * advance;
                blit_glyph(
                    &mut self.pixels,
                    self.width,
                    self.height,
                    self.foreground,
                    cell_x,
                    line_top,
                    &glyph,
                    layout,
                );
            }
        }

        self.dirty = true;
        self.visible = !display.is_empty();
    }

    pub fn upload(&mut self, queue: &wgpu::Queue) {
        if !self.dirty {
            return;
        }
        let upload = match prepare_rgba_upload(self.width, self.height, &self.pixels) {
            Ok(upload) => upload,
            Err(err) => {
                log::warn!(
                    "panel upload failed ({}x{}): {err:#}",
                    self.width,
                    self.height
                );
                return;
            }
        };
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            upload.pixels(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(upload.bytes_per_row()),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.dirty = false;
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

fn fill_background(buffer: &mut [u8]) {
    for chunk in buffer.chunks_exact_mut(4) {
        chunk.copy_from_slice(&BG_COLOR);
    }
}

/// Map a pixel rectangle onto the window as clip-space quad corners.
fn panel_vertices(rect: PanelRect, window: PhysicalSize<u32>) -> [QuadVertex; 4] {
    let width = window.width.max(1) as f32;
    let height = window.height.max(1) as f32;

    let left = (rect.x / width) * 2.0 - 1.0;
    let right = ((rect.x + rect.width) / width) * 2.0 - 1.0;
    let top = 1.0 - (rect.y / height) * 2.0;
    let bottom = 1.0 - ((rect.y + rect.height) / height) * 2.0;

    [
        QuadVertex {
            position: [left, top],
            uv: [0.0, 0.0],
        },
        QuadVertex {
            position: [right, top],
            uv: [1.0, 0.0],
        },
        QuadVertex {
            position: [left, bottom],
            uv: [0.0, 1.0],
        },
        QuadVertex {
            position: [right, bottom],
            uv: [1.0, 1.0],
        },
    ]
}

/// Clip lines to the panel grid, truncating overlong lines with an ellipsis.
fn fit_lines(lines: &[String], max_cols: usize, max_rows: usize) -> Vec<String> {
    if max_cols == 0 || max_rows == 0 {
        return Vec::new();
    }
    let mut fitted = Vec::new();
    for line in lines {
        for segment in line.split('\n') {
            if fitted.len() == max_rows {
                return fitted;
            }
            let mut row: String = segment.chars().take(max_cols).collect();
            if segment.chars().count() > max_cols {
                row.pop();
                row.push('…');
            }
            fitted.push(row);
        }
    }
    fitted
}

#[allow(clippy::too_many_arguments)]
fn blit_glyph(
    pixels: &mut [u8],
    panel_width: u32,
    panel_height: u32,
    foreground: [u8; 4],
    cell_x: u32,
    line_top: u32,
    glyph: &GlyphBitmap,
    layout: &GlyphLayout,
) {
    if glyph.width == 0 || glyph.height == 0 {
        return;
    }

    let start_x = cell_x as i32 + layout.left_bearing + glyph.xmin;
    let baseline = line_top as i32 + layout.ascent;
    let start_y = baseline - (glyph.ymin + glyph.height as i32);

    for gy in 0..glyph.height {
        let dest_y = start_y + gy as i32;
        if dest_y < 0 || dest_y >= panel_height as i32 {
            continue;
        }
        let source_row = gy as usize * glyph.width as usize;
        for gx in 0..glyph.width {
            let coverage = glyph.alpha[source_row + gx as usize];
            if coverage == 0 {
                continue;
            }
            let dest_x = start_x + gx as i32;
            if dest_x < 0 || dest_x >= panel_width as i32 {
                continue;
            }
            let index = ((dest_y as u32 * panel_width + dest_x as u32) * 4) as usize;
            let alpha = ((coverage as u16 * foreground[3] as u16) / u8::MAX as u16) as u8;
            pixels[index..index + 4].copy_from_slice(&[
                foreground[0],
                foreground[1],
                foreground[2],
                alpha,
            ]);
        }
    }
}

#[derive(Clone)]
struct GlyphBitmap {
    width: u32,
    height: u32,
    xmin: i32,
    ymin: i32,
    alpha: Arc<[u8]>,
}

impl GlyphBitmap {
    fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            xmin: 0,
            ymin: 0,
            alpha: Arc::<[u8]>::from([]),
        }
    }
}

struct GlyphLayout {
    line_height: u32,
    cell_advance: u32,
    ascent: i32,
    left_bearing: i32,
}

#[derive(Clone, Copy)]
struct GlyphExtents {
    min_xmin: i32,
    max_xmax: i32,
    min_ymin: i32,
    max_ymax: i32,
}

impl GlyphLayout {
    fn from_font(font: &Font, size: f32) -> Self {
        let mut extents: Option<GlyphExtents> = None;
        let mut max_advance = 0.0f32;

        for ch in sample_chars() {
            let metrics = font.metrics_indexed(font.lookup_glyph_index(ch), size);
            max_advance = max_advance.max(metrics.advance_width);
            if metrics.width == 0 && metrics.height == 0 {
                continue;
            }
            let xmax = metrics.xmin + metrics.width as i32;
            let ymax = metrics.ymin + metrics.height as i32;
            let entry = extents.get_or_insert(GlyphExtents {
                min_xmin: metrics.xmin,
                max_xmax: xmax,
                min_ymin: metrics.ymin,
                max_ymax: ymax,
            });
            entry.min_xmin = entry.min_xmin.min(metrics.xmin);
            entry.max_xmax = entry.max_xmax.max(xmax);
            entry.min_ymin = entry.min_ymin.min(metrics.ymin);
            entry.max_ymax = entry.max_ymax.max(ymax);
        }

        let Some(extents) = extents else {
            return Self {
                line_height: 1,
                cell_advance: 1,
                ascent: 0,
                left_bearing: 0,
            };
        };

        let left_bearing = -extents.min_xmin;
        let ascent = extents.max_ymax;
        let descent = -extents.min_ymin;
        let cell_width = (left_bearing + extents.max_xmax).max(1) as u32;
        Self {
            line_height: (ascent + descent).max(1) as u32,
            cell_advance: (max_advance.max(cell_width as f32).ceil() as u32).max(1),
            ascent,
            left_bearing,
        }
    }
}

fn sample_chars() -> impl Iterator<Item = char> {
    (32u8..=126).map(|byte| byte as char).chain(['?', '…'])
}

fn glyph_for_char(ch: char) -> GlyphBitmap {
    load_or_cache_glyph(ch)
        .or_else(|| load_or_cache_glyph('?'))
        .unwrap_or_else(GlyphBitmap::empty)
}

fn load_or_cache_glyph(ch: char) -> Option<GlyphBitmap> {
    if let Some(glyph) = GLYPH_CACHE.lock().unwrap().get(&ch).cloned() {
        return Some(glyph);
    }

    let font = FONT.get()?;
    let glyph_index = font.lookup_glyph_index(ch);
    if glyph_index == 0 && ch != '?' && ch != ' ' {
        return None;
    }

    let (metrics, bitmap) = font.rasterize_indexed(glyph_index, FONT_SIZE_PX);
    let glyph = GlyphBitmap {
        width: metrics.width as u32,
        height: metrics.height as u32,
        xmin: metrics.xmin,
        ymin: metrics.ymin,
        alpha: Arc::from(bitmap.into_boxed_slice()),
    };
    GLYPH_CACHE.lock().unwrap().insert(ch, glyph.clone());
    Some(glyph)
}

/// Converts a stage tint to panel text color.
pub(super) fn color_to_rgba(color: [f32; 3], alpha: u8) -> [u8; 4] {
    let byte = |channel: f32| (channel.clamp(0.0, 1.0) * 255.0).round() as u8;
    [byte(color[0]), byte(color[1]), byte(color[2]), alpha]
}

pub(super) enum StatusMode {
    Live,
    Replay {
        elapsed: f32,
        duration: f32,
        fps: u32,
        tau: f32,
    },
}

pub(super) struct StageStatusRow {
    pub name: String,
    pub label: String,
    pub blend: f32,
    pub target: f32,
}

/// Status panel content: mode header, selection summary, one row per stage,
/// and the camera pose.
pub(super) fn status_lines(
    mode: &StatusMode,
    active: Option<&str>,
    hovered: Option<&str>,
    rows: &[StageStatusRow],
    eye: Vec3,
    focus: Vec3,
) -> Vec<String> {
    let mut lines = Vec::with_capacity(rows.len() + 4);
    match mode {
        StatusMode::Live => lines.push("portal stages  live".to_string()),
        StatusMode::Replay {
            elapsed,
            duration,
            fps,
            tau,
        } => lines.push(format!(
            "portal stages  replay {:.2}s / {:.2}s at {} fps (tau {:.2})",
            elapsed.min(*duration),
            duration,
            fps,
            tau
        )),
    }
    lines.push(format!(
        "active {}  hover {}",
        active.unwrap_or("-"),
        hovered.unwrap_or("-")
    ));
    for row in rows {
        lines.push(format!(
            "{:<3} {:<9} blend {:.3} -> {:.0}",
            row.name, row.label, row.blend, row.target
        ));
    }
    lines.push(format!(
        "eye ({:.1}, {:.1}, {:.1}) looking at ({:.1}, {:.1}, {:.1})",
        eye.x, eye.y, eye.z, focus.x, focus.y, focus.z
    ));
    if matches!(mode, StatusMode::Live) {
        lines.push("1-3 toggle  0 clear  drag orbits  esc quits".to_string());
    }
    lines
}
