//! Stage background textures: disk discovery, decoding, and the procedural
//! fallback that keeps the viewer interactive when an image is missing.

use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, ensure};
use portal_scene::StageConfig;
use walkdir::WalkDir;

const PLACEHOLDER_SIDE: u32 = 256;
const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Decoded RGBA8 pixels for one stage background.
#[derive(Debug, Clone)]
pub struct StageTexture {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Path the pixels came from; `None` marks the procedural fallback.
    pub source: Option<PathBuf>,
}

/// Find the image file backing a texture reference.
///
/// The reference is tried verbatim relative to the asset root first; failing
/// that, the root is walked recursively for any supported image whose file
/// stem matches the reference's stem, case-insensitively. The walk is sorted
/// so repeated runs resolve the same file.
pub fn discover_texture_file(root: &Path, reference: &str) -> Option<PathBuf> {
    let direct = root.join(reference);
    if direct.is_file() {
        return Some(direct);
    }

    let wanted = Path::new(reference).file_stem()?.to_str()?.to_owned();
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| {
            let path = entry.path();
            let stem_matches = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.eq_ignore_ascii_case(&wanted));
            stem_matches && has_supported_extension(path)
        })
        .map(|entry| entry.into_path())
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Load the background texture for a stage, degrading to the placeholder on
/// any failure. Missing art must never keep the window from opening.
pub fn load_stage_texture(asset_root: Option<&Path>, config: &StageConfig) -> StageTexture {
    let Some(root) = asset_root else {
        return generate_stage_placeholder(config);
    };

    let Some(path) = discover_texture_file(root, &config.texture) else {
        log::warn!(
            "no texture matching '{}' under {}; using placeholder for stage {}",
            config.texture,
            root.display(),
            config.name
        );
        return generate_stage_placeholder(config);
    };

    match decode_texture_file(&path) {
        Ok(texture) => texture,
        Err(err) => {
            log::warn!(
                "failed to decode {} for stage {}: {err:#}; using placeholder",
                path.display(),
                config.name
            );
            generate_stage_placeholder(config)
        }
    }
}

fn decode_texture_file(path: &Path) -> Result<StageTexture> {
    let image = image::open(path)
        .with_context(|| format!("decoding texture {}", path.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    ensure!(width > 0 && height > 0, "texture {} is empty", path.display());
    Ok(StageTexture {
        data: image.into_raw(),
        width,
        height,
        source: Some(path.to_path_buf()),
    })
}

/// Deterministic stand-in pattern: the stage tint banded with a weave derived
/// from the stage name, so each missing texture still reads as "its" stage.
pub fn generate_stage_placeholder(config: &StageConfig) -> StageTexture {
    let side = PLACEHOLDER_SIDE;
    let mut data = vec![0u8; (side * side * 4) as usize];
    let seed = config
        .name
        .bytes()
        .fold(0x2Du8, |acc, byte| acc.rotate_left(3) ^ byte);
    let tint = config.color.map(|channel| channel.clamp(0.0, 1.0));

    for y in 0..side {
        let band = 0.55 + 0.45 * (y as f32 / side.max(1) as f32);
        for x in 0..side {
            let weave = ((x / 16).wrapping_add(y / 16).wrapping_add(seed as u32)) % 2;
            let gain = if weave == 0 { band } else { band * 0.72 };
            let idx = ((y * side + x) * 4) as usize;
            for channel in 0..3 {
                data[idx + channel] = (tint[channel] * gain * 255.0) as u8;
            }
            data[idx + 3] = 0xFF;
        }
    }

    StageTexture {
        data,
        width: side,
        height: side,
        source: None,
    }
}

/// Clear color behind all stages: the roster tints averaged and dimmed so
/// frames and markers stay readable against it.
pub fn scene_clear_color(roster: &[StageConfig]) -> wgpu::Color {
    if roster.is_empty() {
        return wgpu::Color::BLACK;
    }
    let mut sum = [0.0f64; 3];
    for config in roster {
        for (total, channel) in sum.iter_mut().zip(config.color) {
            *total += channel as f64;
        }
    }
    let scale = 0.08 / roster.len() as f64;
    wgpu::Color {
        r: sum[0] * scale,
        g: sum[1] * scale,
        b: sum[2] * scale,
        a: 1.0,
    }
}

pub struct TextureUpload<'a> {
    data: Cow<'a, [u8]>,
    bytes_per_row: u32,
}

impl<'a> TextureUpload<'a> {
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.bytes_per_row
    }
}

/// Lay RGBA rows out for `queue.write_texture`, padding each row up to
/// `COPY_BYTES_PER_ROW_ALIGNMENT` when the source pitch is not aligned.
pub fn prepare_rgba_upload<'a>(
    width: u32,
    height: u32,
    data: &'a [u8],
) -> Result<TextureUpload<'a>> {
    ensure!(width > 0 && height > 0, "texture has no dimensions");
    let row_bytes = 4usize * width as usize;
    let alignment = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;
    ensure!(
        data.len() >= row_bytes * height as usize,
        "texture buffer ({}) smaller than {}x{} RGBA ({})",
        data.len(),
        width,
        height,
        row_bytes * height as usize
    );

    if row_bytes % alignment == 0 && data.len() == row_bytes * height as usize {
        return Ok(TextureUpload {
            data: Cow::Borrowed(data),
            bytes_per_row: row_bytes as u32,
        });
    }

    let padded_row_bytes = row_bytes.div_ceil(alignment) * alignment;
    let mut buffer = vec![0u8; padded_row_bytes * height as usize];
    for row in 0..height as usize {
        let src_offset = row * row_bytes;
        let dst_offset = row * padded_row_bytes;
        buffer[dst_offset..dst_offset + row_bytes]
            .copy_from_slice(&data[src_offset..src_offset + row_bytes]);
    }

    Ok(TextureUpload {
        data: Cow::Owned(buffer),
        bytes_per_row: padded_row_bytes as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_scene::default_roster;
    use std::fs;
    use tempfile::tempdir;

    fn fairy() -> StageConfig {
        default_roster().remove(0)
    }

    #[test]
    fn placeholder_is_deterministic_and_follows_the_stage_tint() {
        let config = fairy();
        let first = generate_stage_placeholder(&config);
        let second = generate_stage_placeholder(&config);
        assert_eq!(first.data, second.data);
        assert_eq!(first.width, PLACEHOLDER_SIDE);
        assert!(first.source.is_none());

        // Fairy is red-dominant, so red must dominate the generated pixels.
        let (mut red, mut green) = (0u64, 0u64);
        for pixel in first.data.chunks_exact(4) {
            red += pixel[0] as u64;
            green += pixel[1] as u64;
        }
        assert!(red > green);

        let mut renamed = config.clone();
        renamed.name = "ZZ".to_string();
        assert_ne!(generate_stage_placeholder(&renamed).data, second.data);
    }

    #[test]
    fn discovery_tries_the_reference_verbatim_before_walking() {
        let temp = tempdir().expect("temp dir");
        fs::create_dir_all(temp.path().join("nested")).expect("nested dir");
        fs::write(temp.path().join("cave.png"), b"direct").expect("direct file");
        fs::write(temp.path().join("nested/cave.png"), b"nested").expect("nested file");

        let found = discover_texture_file(temp.path(), "cave.png").expect("found");
        assert_eq!(found, temp.path().join("cave.png"));
    }

    #[test]
    fn discovery_matches_nested_files_by_stem_across_extensions() {
        let temp = tempdir().expect("temp dir");
        fs::create_dir_all(temp.path().join("backdrops")).expect("nested dir");
        fs::write(temp.path().join("backdrops/UNDERSEA.jpeg"), b"art").expect("file");
        fs::write(temp.path().join("backdrops/undersea.txt"), b"notes").expect("decoy");

        let found = discover_texture_file(temp.path(), "undersea.png").expect("found");
        assert_eq!(found, temp.path().join("backdrops/UNDERSEA.jpeg"));
        assert_eq!(discover_texture_file(temp.path(), "missing.png"), None);
    }

    #[test]
    fn loading_decodes_real_images_and_shrugs_off_garbage() {
        let temp = tempdir().expect("temp dir");
        let good = temp.path().join("cave.png");
        image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]))
            .save(&good)
            .expect("write png");

        let config = fairy();
        let decoded = load_stage_texture(Some(temp.path()), &config);
        assert_eq!((decoded.width, decoded.height), (4, 2));
        assert_eq!(decoded.source.as_deref(), Some(good.as_path()));
        assert_eq!(&decoded.data[..4], &[10, 20, 30, 255]);

        fs::write(&good, b"not an image").expect("corrupt file");
        let fallback = load_stage_texture(Some(temp.path()), &config);
        assert!(fallback.source.is_none());
        assert_eq!(fallback.data, generate_stage_placeholder(&config).data);
    }

    #[test]
    fn uploads_pad_unaligned_rows_and_borrow_aligned_ones() {
        let aligned = vec![0xABu8; 64 * 2 * 4];
        let upload = prepare_rgba_upload(64, 2, &aligned).expect("aligned upload");
        assert_eq!(upload.bytes_per_row(), 256);
        assert_eq!(upload.pixels().len(), aligned.len());

        let unaligned = vec![0xCDu8; 3 * 2 * 4];
        let upload = prepare_rgba_upload(3, 2, &unaligned).expect("padded upload");
        assert_eq!(upload.bytes_per_row() % wgpu::COPY_BYTES_PER_ROW_ALIGNMENT, 0);
        assert_eq!(upload.pixels().len(), upload.bytes_per_row() as usize * 2);
        assert_eq!(&upload.pixels()[..12], &unaligned[..12]);
        assert_eq!(upload.pixels()[12], 0, "padding must be zeroed");

        assert!(prepare_rgba_upload(4, 4, &unaligned).is_err());
    }

    #[test]
    fn clear_color_averages_and_dims_the_roster() {
        let color = scene_clear_color(&default_roster());
        assert!(color.r > 0.0 && color.r < 0.1);
        assert!(color.g > 0.0 && color.g < 0.1);
        assert!(color.b > 0.0 && color.b < 0.1);
        assert_eq!(color.a, 1.0);

        let empty = scene_clear_color(&[]);
        assert_eq!(empty.r, 0.0);
    }
}
