use std::borrow::Cow;

use anyhow::Result;
use wgpu::naga::ShaderStage;

/// The three fragment passes of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pass {
    Interaction,
    Update,
    Present,
}

impl Pass {
    pub fn label(self) -> &'static str {
        match self {
            Pass::Interaction => "interaction",
            Pass::Update => "update",
            Pass::Present => "present",
        }
    }

    fn body(self) -> &'static str {
        match self {
            Pass::Interaction => INTERACTION_FRAGMENT,
            Pass::Update => UPDATE_FRAGMENT,
            Pass::Present => PRESENT_FRAGMENT,
        }
    }
}

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    }))
}

pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    pass: Pass,
) -> Result<wgpu::ShaderModule> {
    let source = fragment_source(pass);
    tracing::trace!(pass = pass.label(), bytes = source.len(), "compiling fragment pass");
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(pass.label()),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    }))
}

/// Prepends the shared bindings and helpers to a pass body.
pub(crate) fn fragment_source(pass: Pass) -> String {
    format!("{HEADER}\n{body}", body = pass.body())
}

/// Bindings and helpers shared by every pass.
///
/// `SimParams` must match `SimUniforms` in `gpu/uniforms.rs`; `mix32` and
/// `random_color` must match `automaton::hash`.
const HEADER: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform SimParams {
    vec4 resolution;
    vec4 pointer;
    vec4 brush;
    vec4 birth;
    vec4 survival;
    vec4 kernel;
    uvec4 counters;
    vec4 color_mix[3];
} sim;

layout(set = 0, binding = 1) uniform texture2D state_texture;
layout(set = 0, binding = 2) uniform texture2D kernel_texture;
layout(set = 0, binding = 3) uniform sampler point_sampler;

ivec2 grid_size() {
    return ivec2(sim.resolution.xy);
}

ivec2 cell_coord() {
    return ivec2(gl_FragCoord.xy);
}

vec3 fetch_state(ivec2 cell) {
    return texelFetch(sampler2D(state_texture, point_sampler), cell, 0).rgb;
}

uint mix32(uint x) {
    x ^= x >> 16u;
    x *= 0x7feb352du;
    x ^= x >> 15u;
    x *= 0x846ca68bu;
    x ^= x >> 16u;
    return x;
}

float unit_float(uint h) {
    return float(h >> 8u) * (1.0 / 16777216.0);
}

vec3 random_color(uvec2 cell, uint frame) {
    uint base = mix32(mix32(mix32(cell.x ^ 0x9e3779b9u) ^ cell.y) ^ frame);
    return vec3(
        unit_float(mix32(base ^ 0u)),
        unit_float(mix32(base ^ 1u)),
        unit_float(mix32(base ^ 2u))
    );
}
";

/// Brush, then reseed, then clear; later edits win.
const INTERACTION_FRAGMENT: &str = r"void main() {
    ivec2 cell = cell_coord();
    vec3 value = fetch_state(cell);

    if (sim.pointer.z > 0.5) {
        vec2 d = vec2(cell) - sim.pointer.xy;
        float radius = max(sim.pointer.w, 0.0);
        if (dot(d, d) <= radius * radius) {
            value = sim.brush.rgb;
        }
    }
    if (sim.counters.z != 0u) {
        value = random_color(uvec2(cell), sim.counters.x);
    }
    if (sim.counters.w != 0u) {
        value = vec3(0.0);
    }

    outColor = vec4(value, 1.0);
}
";

const UPDATE_FRAGMENT: &str = r"float smoothstep_safe(float e0, float e1, float x) {
    float t = clamp((x - e0) / (e1 - e0), 0.0, 1.0);
    return t * t * (3.0 - 2.0 * t);
}

float bump(float lo, float hi, float soft, float x) {
    return smoothstep_safe(lo, lo + soft, x) * (1.0 - smoothstep_safe(hi - soft, hi, x));
}

float lobe(vec3 interval, float x) {
    float lo = interval.x;
    float hi = interval.y;
    if (!(hi > lo)) {
        return 0.0;
    }
    float width = hi - lo;
    float soft = clamp(interval.z, 0.001, 1.0) * width / 2.0;
    return bump(lo, hi, soft, x)
        - bump(lo - width, lo, soft, x)
        - bump(hi, hi + width, soft, x);
}

float growth(float n, float m) {
    float alive = isnan(m) ? 0.0 : clamp(m, 0.0, 1.0);
    return (1.0 - alive) * lobe(sim.birth.xyz, n) + alive * lobe(sim.survival.xyz, n);
}

float integrate(float previous, float rate) {
    float delta = sim.brush.w * rate;
    if (isnan(delta) || isinf(delta)) {
        delta = 0.0;
    }
    float next = previous + delta;
    return isnan(next) ? 0.0 : clamp(next, 0.0, 1.0);
}

void main() {
    ivec2 size = grid_size();
    ivec2 cell = cell_coord();
    int reach = int(sim.counters.y);
    ivec2 lift = size * (reach / max(min(size.x, size.y), 1) + 1);

    vec3 ring = vec3(0.0);
    vec3 core = vec3(0.0);
    for (int dy = -reach; dy <= reach; dy++) {
        for (int dx = -reach; dx <= reach; dx++) {
            vec2 w = texelFetch(sampler2D(kernel_texture, point_sampler), ivec2(dx + reach, dy + reach), 0).xy;
            if (w.x <= 0.0 && w.y <= 0.0) {
                continue;
            }
            ivec2 source = (cell + ivec2(dx, dy) + lift) % size;
            vec3 v = fetch_state(source);
            ring += w.x * v;
            core += w.y * v;
        }
    }
    ring = sim.kernel.x > 0.0 ? ring / sim.kernel.x : vec3(0.0);
    core = sim.kernel.y > 0.0 ? core / sim.kernel.y : vec3(0.0);

    vec3 previous = fetch_state(cell);
    vec3 m = sim.kernel.z > 0.5 ? core : previous;
    vec3 g = vec3(growth(ring.r, m.r), growth(ring.g, m.g), growth(ring.b, m.b));
    vec3 coupled = vec3(
        dot(sim.color_mix[0].xyz, g),
        dot(sim.color_mix[1].xyz, g),
        dot(sim.color_mix[2].xyz, g)
    );

    outColor = vec4(
        integrate(previous.r, coupled.r),
        integrate(previous.g, coupled.g),
        integrate(previous.b, coupled.b),
        1.0
    );
}
";

/// Nearest-neighbour upscale of the grid onto the surface.
const PRESENT_FRAGMENT: &str = r"void main() {
    ivec2 size = grid_size();
    vec2 scale = sim.resolution.xy / sim.resolution.zw;
    ivec2 cell = clamp(ivec2(gl_FragCoord.xy * scale), ivec2(0), size - 1);
    outColor = vec4(fetch_state(cell), 1.0);
}
";

/// Minimal full-screen triangle vertex shader.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";
