//! WGSL sources and the shared quad geometry.

use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex {
        position: [-1.0, 1.0],
        uv: [0.0, 0.0],
    },
    QuadVertex {
        position: [-1.0, -1.0],
        uv: [0.0, 1.0],
    },
    QuadVertex {
        position: [1.0, 1.0],
        uv: [1.0, 0.0],
    },
    QuadVertex {
        position: [1.0, -1.0],
        uv: [1.0, 1.0],
    },
];

pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];

/// Full-viewport fill in a uniform color. The quad sits at the far plane and
/// always writes depth, which doubles as the per-view depth reset: every
/// view's border pass wipes the depth left behind by views drawn below it.
pub const SOLID_SHADER: &str = r#"
struct SolidUniforms {
    color: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> solid: SolidUniforms;

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 1.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return solid.color;
}
"#;

/// Textured quad scaled in clip space to letterbox the image into the view.
pub const TEXTURED_QUAD_SHADER: &str = r#"
struct FitUniforms {
    scale: vec2<f32>,
    _pad: vec2<f32>,
};

@group(0) @binding(0)
var quad_texture: texture_2d<f32>;
@group(0) @binding(1)
var quad_sampler: sampler;
@group(0) @binding(2)
var<uniform> fit: FitUniforms;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) uv: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(position * fit.scale, 0.5, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(quad_texture, quad_sampler, in.uv);
}
"#;

/// Instanced solids with a fixed headlight. Instance tint multiplies the
/// vertex color; the alpha channel carries the highlight volume's pulse.
pub const MESH_SHADER: &str = r#"
struct ViewUniforms {
    view_projection: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> view: ViewUniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec3<f32>,
};

struct InstanceInput {
    @location(3) model_0: vec4<f32>,
    @location(4) model_1: vec4<f32>,
    @location(5) model_2: vec4<f32>,
    @location(6) model_3: vec4<f32>,
    @location(7) tint: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) color: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let world = model * vec4<f32>(vertex.position, 1.0);
    var out: VertexOutput;
    out.position = view.view_projection * world;
    out.normal = normalize((model * vec4<f32>(vertex.normal, 0.0)).xyz);
    out.color = vec4<f32>(vertex.color, 1.0) * instance.tint;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let light_dir = normalize(vec3<f32>(0.4, 0.8, 0.5));
    let lighting = 0.35 + 0.65 * max(dot(normalize(in.normal), light_dir), 0.0);
    return vec4<f32>(in.color.rgb * lighting, in.color.a);
}
"#;

/// Shared by the line and point pipelines; only the primitive topology
/// differs between them.
pub const FLAT_SHADER: &str = r#"
struct ViewUniforms {
    view_projection: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> view: ViewUniforms;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) color: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = view.view_projection * vec4<f32>(position, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(in.color, 1.0);
}
"#;
