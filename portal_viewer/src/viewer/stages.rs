//! Stage placement and per-frame GPU instance assembly.
//!
//! Placements bake each stage's frame pose into matrices once at startup.
//! The per-frame builders turn scene state (blend, hover, selection) into
//! instance data for the stage, diorama, and marker passes.

use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec2, Vec3};
use portal_scene::stage::{BACKDROP_RADIUS, FRAME_DEPTH, FRAME_HEIGHT, FRAME_WIDTH, LABEL_OFFSET_Y};
use portal_scene::StageConfig;

use super::shaders::QuadVertex;
use crate::camera::CameraProjector;

const HALF_WIDTH: f32 = FRAME_WIDTH / 2.0;
const HALF_HEIGHT: f32 = FRAME_HEIGHT / 2.0;

/// How far the frame-local view direction shifts the backdrop texture. The
/// backdrop reads as a sphere of `BACKDROP_RADIUS` behind the frame plane,
/// so a wider frame against a shallower backdrop shifts more.
const BACKDROP_PARALLAX_GAIN: f32 = FRAME_WIDTH / (2.0 * BACKDROP_RADIUS);

/// How far the diorama stand-in sits behind the frame plane.
const DIORAMA_RECESS: f32 = 0.45;

/// Blends below this leave the diorama out of the pass entirely.
const DIORAMA_VISIBILITY_FLOOR: f32 = 0.003;

/// Marker half-size in NDC units before the highlight growth.
const MARKER_SIZE: f32 = 0.035;

pub(super) const STAGE_VERTICES: [QuadVertex; 4] = [
    QuadVertex {
        position: [-HALF_WIDTH, HALF_HEIGHT],
        uv: [0.0, 0.0],
    },
    QuadVertex {
        position: [HALF_WIDTH, HALF_HEIGHT],
        uv: [1.0, 0.0],
    },
    QuadVertex {
        position: [-HALF_WIDTH, -HALF_HEIGHT],
        uv: [0.0, 1.0],
    },
    QuadVertex {
        position: [HALF_WIDTH, -HALF_HEIGHT],
        uv: [1.0, 1.0],
    },
];

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(super) struct StageInstance {
    pub model: [[f32; 4]; 4],
    /// rgb is the stage color, a is the current blend.
    pub tint: [f32; 4],
    /// x is the border highlight, yz the backdrop parallax shift.
    pub params: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(super) struct DioramaVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(super) struct DioramaInstance {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(super) struct MarkerVertex {
    pub position: [f32; 2],
}

#[repr(C, align(16))]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(super) struct MarkerInstance {
    pub translate: [f32; 2],
    pub size: f32,
    pub highlight: f32,
    pub color: [f32; 3],
    pub _padding: f32,
}

pub(super) const MARKER_VERTICES: [MarkerVertex; 6] = [
    MarkerVertex {
        position: [-0.5, -0.5],
    },
    MarkerVertex {
        position: [0.5, -0.5],
    },
    MarkerVertex {
        position: [-0.5, 0.5],
    },
    MarkerVertex {
        position: [-0.5, 0.5],
    },
    MarkerVertex {
        position: [0.5, -0.5],
    },
    MarkerVertex {
        position: [0.5, 0.5],
    },
];

/// Per-frame camera uniform shared by the stage and diorama pipelines.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(super) struct SceneUniform {
    pub view_projection: [[f32; 4]; 4],
}

pub(super) fn scene_uniform(view_projection: Mat4) -> SceneUniform {
    SceneUniform {
        view_projection: view_projection.to_cols_array_2d(),
    }
}

/// Scene state one stage contributes to a rendered frame. Live mode fills
/// this from the scene, replay mode from a recorded snapshot.
#[derive(Clone, Copy)]
pub(super) struct StageFrameState {
    pub blend: f32,
    pub hovered: bool,
    pub active: bool,
}

/// World-space pose of one stage, baked at startup from its config.
pub(super) struct StagePlacement {
    model: Mat4,
    diorama_base: Mat4,
    label_anchor: Vec3,
    marker_anchor: Vec3,
    shape: DioramaShape,
}

impl StagePlacement {
    pub fn new(config: &StageConfig, stage_index: usize) -> Self {
        let rotation = Quat::from_rotation_y(config.rotation_y);
        let model = Mat4::from_rotation_translation(rotation, Vec3::from_array(config.position));
        let lift = config.diorama_offset + config.diorama_scale * 0.5;
        let diorama_base = model * Mat4::from_translation(Vec3::new(0.0, lift, -DIORAMA_RECESS));
        Self {
            model,
            diorama_base,
            label_anchor: model.transform_point3(Vec3::new(0.0, LABEL_OFFSET_Y, FRAME_DEPTH / 2.0)),
            marker_anchor: model.transform_point3(Vec3::new(
                0.0,
                HALF_HEIGHT + FRAME_DEPTH,
                0.0,
            )),
            shape: DioramaShape::for_stage(stage_index),
        }
    }

    pub fn model(&self) -> &Mat4 {
        &self.model
    }

    pub fn label_anchor(&self) -> Vec3 {
        self.label_anchor
    }

    pub fn shape(&self) -> DioramaShape {
        self.shape
    }
}

pub(super) fn stage_instance(
    placement: &StagePlacement,
    config: &StageConfig,
    state: StageFrameState,
    eye: Vec3,
) -> StageInstance {
    let highlight = if state.hovered {
        1.0
    } else if state.active {
        0.45
    } else {
        0.0
    };
    let local_eye = placement.model.inverse().transform_point3(eye);
    let parallax = if local_eye.length_squared() > 1.0e-6 {
        let direction = local_eye.normalize();
        Vec2::new(direction.x, -direction.y) * BACKDROP_PARALLAX_GAIN
    } else {
        Vec2::ZERO
    };
    StageInstance {
        model: placement.model.to_cols_array_2d(),
        tint: [config.color[0], config.color[1], config.color[2], state.blend],
        params: [highlight, parallax.x, parallax.y, 0.0],
    }
}

pub(super) fn diorama_instance(
    placement: &StagePlacement,
    config: &StageConfig,
    state: StageFrameState,
    spin: f32,
) -> Option<DioramaInstance> {
    if state.blend < DIORAMA_VISIBILITY_FLOOR {
        return None;
    }
    let model = placement.diorama_base
        * Mat4::from_rotation_y(spin)
        * Mat4::from_scale(Vec3::splat(config.diorama_scale.max(0.01)));
    Some(DioramaInstance {
        model: model.to_cols_array_2d(),
        color: [config.color[0], config.color[1], config.color[2], state.blend],
    })
}

/// Markers flag the selected stage; hover brightens the frame border instead,
/// so the two signals stay readable at the same time.
pub(super) fn marker_instance(
    projector: &CameraProjector,
    placement: &StagePlacement,
    config: &StageConfig,
    state: StageFrameState,
) -> Option<MarkerInstance> {
    let projected = projector.project(placement.marker_anchor)?;
    let highlight = if state.active {
        1.0
    } else if state.hovered {
        0.5
    } else {
        0.0
    };
    Some(MarkerInstance {
        translate: projected.ndc,
        size: MARKER_SIZE,
        highlight,
        color: config.color,
        _padding: 0.0,
    })
}

/// Stand-in silhouettes for the roster characters, cycled by roster order.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(super) enum DioramaShape {
    Sphere,
    Cube,
    Cone,
}

impl DioramaShape {
    pub const ALL: [DioramaShape; 3] = [
        DioramaShape::Sphere,
        DioramaShape::Cube,
        DioramaShape::Cone,
    ];

    pub fn for_stage(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn mesh(self) -> DioramaMesh {
        match self {
            DioramaShape::Sphere => build_sphere(12, 18),
            DioramaShape::Cube => build_cube(),
            DioramaShape::Cone => build_cone(16),
        }
    }
}

/// Unit-scale geometry for one diorama shape, indexed for the mesh pipeline.
pub(super) struct DioramaMesh {
    pub vertices: Vec<DioramaVertex>,
    pub indices: Vec<u16>,
}

fn build_sphere(bands: u32, sectors: u32) -> DioramaMesh {
    let bands = bands.max(3);
    let sectors = sectors.max(6);
    let mut vertices = Vec::with_capacity(((bands + 1) * (sectors + 1)) as usize);
    let mut indices = Vec::with_capacity((bands * sectors * 6) as usize);

    for band in 0..=bands {
        let theta = band as f32 / bands as f32 * PI;
        for sector in 0..=sectors {
            let phi = sector as f32 / sectors as f32 * 2.0 * PI;
            let direction = Vec3::new(
                theta.sin() * phi.cos(),
                theta.cos(),
                theta.sin() * phi.sin(),
            );
            vertices.push(DioramaVertex {
                position: (direction * 0.5).to_array(),
                normal: direction.to_array(),
            });
        }
    }

    // The sector sweep runs +x toward +z, so listing the next sector before
    // the next band keeps the triangles winding outward.
    let stride = (sectors + 1) as u16;
    for band in 0..bands as u16 {
        for sector in 0..sectors as u16 {
            let here = band * stride + sector;
            let below = here + stride;
            indices.extend_from_slice(&[here, here + 1, below, here + 1, below + 1, below]);
        }
    }

    DioramaMesh { vertices, indices }
}

fn build_cube() -> DioramaMesh {
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    // One face per axis and sign; the other two axes span the face. The axis
    // triples (0,1,2), (1,2,0), (2,0,1) are all right-handed, so the same
    // corner order winds outward on every positive face.
    for axis in 0..3 {
        let u_axis = (axis + 1) % 3;
        let v_axis = (axis + 2) % 3;
        for sign in [1.0f32, -1.0] {
            let base = vertices.len() as u16;
            for (du, dv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
                let mut position = [0.0f32; 3];
                position[axis] = 0.5 * sign;
                position[u_axis] = du;
                position[v_axis] = dv;
                let mut normal = [0.0f32; 3];
                normal[axis] = sign;
                vertices.push(DioramaVertex { position, normal });
            }
            if sign > 0.0 {
                indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
            } else {
                indices.extend_from_slice(&[base, base + 2, base + 1, base, base + 3, base + 2]);
            }
        }
    }

    DioramaMesh { vertices, indices }
}

fn build_cone(segments: u32) -> DioramaMesh {
    let segments = segments.max(3);
    let ring = (segments + 1) as u16;
    let mut vertices = Vec::with_capacity((2 * ring + 2) as usize);
    let mut indices = Vec::with_capacity((segments * 6) as usize);

    vertices.push(DioramaVertex {
        position: [0.0, 0.5, 0.0],
        normal: [0.0, 1.0, 0.0],
    });
    for i in 0..=segments {
        let angle = i as f32 / segments as f32 * 2.0 * PI;
        let (sin, cos) = angle.sin_cos();
        let normal = Vec3::new(cos, 0.5, sin).normalize();
        vertices.push(DioramaVertex {
            position: [cos * 0.5, -0.5, sin * 0.5],
            normal: normal.to_array(),
        });
    }
    for i in 0..segments as u16 {
        indices.extend_from_slice(&[0, i + 2, i + 1]);
    }

    let center = vertices.len() as u16;
    vertices.push(DioramaVertex {
        position: [0.0, -0.5, 0.0],
        normal: [0.0, -1.0, 0.0],
    });
    for i in 0..=segments {
        let angle = i as f32 / segments as f32 * 2.0 * PI;
        let (sin, cos) = angle.sin_cos();
        vertices.push(DioramaVertex {
            position: [cos * 0.5, -0.5, sin * 0.5],
            normal: [0.0, -1.0, 0.0],
        });
    }
    for i in 0..segments as u16 {
        indices.extend_from_slice(&[center, center + 1 + i, center + 2 + i]);
    }

    DioramaMesh { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_scene::default_roster;

    fn frame_state(blend: f32) -> StageFrameState {
        StageFrameState {
            blend,
            hovered: false,
            active: false,
        }
    }

    #[test]
    fn placements_carry_the_frame_pose() {
        let roster = default_roster();
        let lobster = StagePlacement::new(&roster[1], 1);
        let center = lobster.model().transform_point3(Vec3::ZERO);
        assert!((center - Vec3::new(-2.5, 0.0, -0.5)).length() < 1.0e-6);
        assert!((lobster.label_anchor().y - LABEL_OFFSET_Y).abs() < 1.0e-6);
        assert!(lobster.label_anchor().x < -2.0);
        assert!(lobster.marker_anchor.y > FRAME_HEIGHT / 2.0);
    }

    #[test]
    fn stage_instances_carry_blend_and_highlight() {
        let roster = default_roster();
        let fairy = StagePlacement::new(&roster[0], 0);
        let hovered = stage_instance(
            &fairy,
            &roster[0],
            StageFrameState {
                blend: 0.25,
                hovered: true,
                active: false,
            },
            Vec3::new(0.0, 0.0, 10.0),
        );
        assert_eq!(hovered.tint[3], 0.25);
        assert_eq!(hovered.params[0], 1.0);
        // Straight-on view leaves the backdrop unshifted.
        assert!(hovered.params[1].abs() < 1.0e-6);
        assert!(hovered.params[2].abs() < 1.0e-6);

        let from_the_side = stage_instance(
            &fairy,
            &roster[0],
            frame_state(0.0),
            Vec3::new(5.0, 0.0, 10.0),
        );
        assert!(from_the_side.params[1] > 0.0);
    }

    #[test]
    fn dioramas_fade_with_blend_and_hide_when_closed() {
        let roster = default_roster();
        let fairy = StagePlacement::new(&roster[0], 0);
        assert!(diorama_instance(&fairy, &roster[0], frame_state(0.0), 0.0).is_none());

        let open = diorama_instance(&fairy, &roster[0], frame_state(0.7), 0.0)
            .expect("open stage shows its diorama");
        assert_eq!(open.color[3], 0.7);

        let model = Mat4::from_cols_array_2d(&open.model);
        let scaled = model.transform_vector3(Vec3::X).length();
        assert!((scaled - roster[0].diorama_scale).abs() < 1.0e-5);
    }

    #[test]
    fn markers_prefer_the_active_signal_over_hover() {
        let roster = default_roster();
        let fairy = StagePlacement::new(&roster[0], 0);
        let projector = CameraProjector::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, 1.0)
            .expect("projector");
        let marker = marker_instance(
            &projector,
            &fairy,
            &roster[0],
            StageFrameState {
                blend: 1.0,
                hovered: true,
                active: true,
            },
        )
        .expect("marker above the frame projects");
        assert_eq!(marker.highlight, 1.0);
        assert!(marker.translate[1] > 0.0);
        assert_eq!(marker.color, roster[0].color);
    }

    #[test]
    fn diorama_shapes_cycle_in_roster_order() {
        assert_eq!(DioramaShape::for_stage(0), DioramaShape::Sphere);
        assert_eq!(DioramaShape::for_stage(1), DioramaShape::Cube);
        assert_eq!(DioramaShape::for_stage(2), DioramaShape::Cone);
        assert_eq!(DioramaShape::for_stage(3), DioramaShape::Sphere);
    }

    #[test]
    fn generated_meshes_stay_within_u16_indexing() {
        for shape in DioramaShape::ALL {
            let mesh = shape.mesh();
            assert!(!mesh.vertices.is_empty());
            assert_eq!(mesh.indices.len() % 3, 0);
            let max_index = *mesh.indices.iter().max().expect("indices") as usize;
            assert!(max_index < mesh.vertices.len());
            for vertex in &mesh.vertices {
                let length = Vec3::from_array(vertex.normal).length();
                assert!((length - 1.0).abs() < 1.0e-4);
            }
        }
    }

    // The diorama pipeline culls back faces, so every non-degenerate
    // triangle of these origin-centered shapes must wind outward.
    #[test]
    fn generated_triangles_wind_outward() {
        for shape in DioramaShape::ALL {
            let mesh = shape.mesh();
            for triangle in mesh.indices.chunks_exact(3) {
                let a = Vec3::from_array(mesh.vertices[triangle[0] as usize].position);
                let b = Vec3::from_array(mesh.vertices[triangle[1] as usize].position);
                let c = Vec3::from_array(mesh.vertices[triangle[2] as usize].position);
                let normal = (b - a).cross(c - a);
                if normal.length_squared() < 1.0e-10 {
                    continue;
                }
                let centroid = (a + b + c) / 3.0;
                assert!(
                    normal.dot(centroid) > 0.0,
                    "{shape:?} triangle {triangle:?} winds inward"
                );
            }
        }
    }
}
