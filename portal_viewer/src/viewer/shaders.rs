use bytemuck::{Pod, Zeroable};

/// Instanced stage-frame quads. The fragment stage crossfades the closed
/// backdrop texture into the tinted chamber interior as the blend opens, and
/// paints the frame border, brightened while the cursor is over the stage.
/// The backdrop sample shifts with the view direction so the texture reads
/// as a distant sphere rather than a decal on the frame.
pub(super) const STAGE_SHADER_SOURCE: &str = r#"
struct SceneUniform {
    view_projection: mat4x4<f32>,
};

@group(1) @binding(0)
var<uniform> scene: SceneUniform;

struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    @location(6) tint: vec4<f32>,
    @location(7) params: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) tint: vec4<f32>,
    @location(2) params: vec4<f32>,
};

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    let model = mat4x4<f32>(input.model_0, input.model_1, input.model_2, input.model_3);
    var out: VertexOutput;
    out.position = scene.view_projection * model * vec4<f32>(input.position, 0.0, 1.0);
    out.uv = input.uv;
    out.tint = input.tint;
    out.params = input.params;
    return out;
}

@group(0) @binding(0)
var stage_texture: texture_2d<f32>;
@group(0) @binding(1)
var stage_sampler: sampler;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let uv = clamp(input.uv, vec2<f32>(0.0, 0.0), vec2<f32>(1.0, 1.0));
    let shifted = clamp(uv + input.params.yz, vec2<f32>(0.0, 0.0), vec2<f32>(1.0, 1.0));
    let backdrop = textureSample(stage_texture, stage_sampler, shifted);

    let offset = uv - vec2<f32>(0.5, 0.5);
    let chamber = mix(1.0, 0.35, length(offset) * 1.41421356);
    let interior = vec4<f32>(input.tint.rgb * chamber, 1.0);
    let opened = clamp(input.tint.a, 0.0, 1.0);
    var color = mix(backdrop, interior, opened);

    let edge = min(min(uv.x, 1.0 - uv.x), min(uv.y, 1.0 - uv.y));
    let border = 1.0 - smoothstep(0.03, 0.05, edge);
    let frame_color = mix(vec3<f32>(0.12, 0.13, 0.16), vec3<f32>(1.0, 0.95, 0.72), input.params.x);
    color = vec4<f32>(mix(color.rgb, frame_color, border), 1.0);
    return color;
}
"#;

/// Instanced diorama primitives with a fixed key light. Alpha rides the stage
/// blend so dioramas fade in as their portal opens.
pub(super) const DIORAMA_SHADER_SOURCE: &str = r#"
struct SceneUniform {
    view_projection: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> scene: SceneUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    @location(6) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) color: vec4<f32>,
};

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    let model = mat4x4<f32>(input.model_0, input.model_1, input.model_2, input.model_3);
    var out: VertexOutput;
    out.position = scene.view_projection * model * vec4<f32>(input.position, 1.0);
    out.normal = normalize((model * vec4<f32>(input.normal, 0.0)).xyz);
    out.color = input.color;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    if input.color.a < 0.01 {
        discard;
    }
    let key_light = normalize(vec3<f32>(0.4, 0.85, 0.3));
    let diffuse = max(dot(normalize(input.normal), key_light), 0.0);
    let shade = 0.35 + 0.65 * diffuse;
    return vec4<f32>(input.color.rgb * shade, input.color.a);
}
"#;

/// Instanced screen-space anchor rings, one per stage, drawn over everything
/// except the text panels.
pub(super) const MARKER_SHADER_SOURCE: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) corner: vec2<f32>,
    @location(2) highlight: f32,
};

struct VertexIn {
    @location(0) corner: vec2<f32>,
    @location(1) translate: vec2<f32>,
    @location(2) size: f32,
    @location(3) highlight: f32,
    @location(4) color: vec3<f32>,
};

@vertex
fn vs_main(input: VertexIn) -> VertexOutput {
    let scale = input.size * (1.0 + input.highlight * 0.5);
    var out: VertexOutput;
    out.position = vec4<f32>(input.corner * scale + input.translate, 0.0, 1.0);
    out.color = input.color;
    out.corner = input.corner;
    out.highlight = input.highlight;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let radius = length(input.corner) * 1.41421356;
    let fill = 1.0 - smoothstep(0.6, 0.95, radius);
    let ring = smoothstep(0.58, 0.9, radius) * (1.0 - smoothstep(0.9, 1.05, radius));
    let base = mix(input.color, vec3<f32>(1.0, 1.0, 1.0), input.highlight * 0.3);
    let rim = mix(vec3<f32>(0.16, 0.18, 0.22), vec3<f32>(1.0, 0.96, 0.8), input.highlight);
    let color = base * fill + rim * ring;
    let alpha = max(fill * 0.85, ring);
    if alpha < 0.03 {
        discard;
    }
    return vec4<f32>(color, alpha);
}
"#;

/// Screen-space textured quads for the HUD text panels.
pub(super) const OVERLAY_SHADER_SOURCE: &str = r#"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(input.position, 0.0, 1.0);
    out.uv = input.uv;
    return out;
}

@group(0) @binding(0)
var panel_texture: texture_2d<f32>;
@group(0) @binding(1)
var panel_sampler: sampler;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let uv = clamp(input.uv, vec2<f32>(0.0, 0.0), vec2<f32>(1.0, 1.0));
    return textureSample(panel_texture, panel_sampler, uv);
}
"#;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(super) struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

/// Index order shared by the stage quads and every HUD panel quad.
pub(super) const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];
