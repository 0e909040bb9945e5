#![forbid(unsafe_code)]

//! Built-in GLSL stages for every pass, each paired with the manifest of what it binds.
//!
//! All stages target `#version 330 core` and share one attribute layout:
//! `a_position` (vec3) and `a_texcoord` (vec2). Post stages sample `u_texture` on unit 0.

use dewarp_graph::{
    AttributeDecl, PassKind, PostPass, ShaderStage, StageManifest, UniformDecl, UniformKind,
};

pub const A_POSITION: &str = "a_position";
pub const A_TEXCOORD: &str = "a_texcoord";

const QUAD_ATTRIBUTES: &[AttributeDecl] = &[
    AttributeDecl { name: A_POSITION, components: 3 },
    AttributeDecl { name: A_TEXCOORD, components: 2 },
];

const fn uniform(name: &'static str, kind: UniformKind) -> UniformDecl {
    UniformDecl { name, kind }
}

// -------------------------------------------------------------------------------------------------
// Vertex stages
// -------------------------------------------------------------------------------------------------

pub const QUAD_VERT: &str = r#"#version 330 core
in vec3 a_position;
in vec2 a_texcoord;
uniform mat4 u_matrix;
out vec2 v_texcoord;
void main() {
    v_texcoord = a_texcoord;
    gl_Position = u_matrix * vec4(a_position, 1.0);
}
"#;

pub const PERSPECTIVE_VERT: &str = r#"#version 330 core
in vec3 a_position;
in vec2 a_texcoord;
uniform mat4 u_projection;
uniform mat4 u_view;
uniform mat4 u_model;
out vec2 v_texcoord;
void main() {
    v_texcoord = a_texcoord;
    gl_Position = u_projection * u_view * u_model * vec4(a_position, 1.0);
}
"#;

pub const QUAD: ShaderStage = ShaderStage {
    source: QUAD_VERT,
    manifest: StageManifest {
        attributes: QUAD_ATTRIBUTES,
        uniforms: &[uniform("u_matrix", UniformKind::Mat4)],
    },
};

pub const PERSPECTIVE: ShaderStage = ShaderStage {
    source: PERSPECTIVE_VERT,
    manifest: StageManifest {
        attributes: QUAD_ATTRIBUTES,
        uniforms: &[
            uniform("u_projection", UniformKind::Mat4),
            uniform("u_view", UniformKind::Mat4),
            uniform("u_model", UniformKind::Mat4),
        ],
    },
};

// -------------------------------------------------------------------------------------------------
// Fragment stages
// -------------------------------------------------------------------------------------------------

pub const PASSTHROUGH_FRAG: &str = r#"#version 330 core
in vec2 v_texcoord;
uniform sampler2D u_texture;
out vec4 color;
void main() { color = texture(u_texture, v_texcoord); }
"#;

/// Fisheye → virtual camera. Pixels whose source coordinate leaves [0, 1) are black.
pub const DEWARP_FRAG: &str = r#"#version 330 core
in vec2 v_texcoord;

uniform sampler2D u_texture;
uniform vec2 u_video_size;
uniform float u_tan_half_fov;
uniform vec3 u_rotation;
uniform vec4 u_lens_profile;
uniform float u_lambda_offset;

out vec4 color;

float lens_radius(float theta) {
    float t2 = theta * theta;
    float t3 = t2 * theta;
    float t4 = t3 * theta;
    return u_lens_profile.x * t4 + u_lens_profile.y * t3 + u_lens_profile.z * t2 + u_lens_profile.w * theta;
}

vec3 to_cartesian(float theta, float lambda) {
    return vec3(sin(theta) * cos(lambda), sin(theta) * sin(lambda), abs(cos(theta)));
}

vec2 to_spherical(vec3 c) {
    return vec2(acos(min(c.z, 1.0)), atan(c.y, c.x));
}

vec2 rotate_ray(float theta, float lambda) {
    vec3 c = to_cartesian(theta, lambda);
    vec2 abscos = abs(cos(u_rotation.xy));
    if (u_rotation.x != 0.0) {
        c.yz = vec2(c.y * abscos.x + c.z * sin(u_rotation.x),
                    c.z * abscos.x - c.y * sin(u_rotation.x));
    }
    if (u_rotation.y != 0.0) {
        c.xz = vec2(c.x * abscos.y + c.z * sin(u_rotation.y),
                    c.z * abscos.y - c.x * sin(u_rotation.y));
    }
    vec2 s = to_spherical(c);
    s.y += u_rotation.z;
    return s;
}

void main() {
    vec2 sep = (v_texcoord - 0.5) * u_video_size.x;
    float theta = atan(length(sep) / (u_video_size.y * 0.5) * u_tan_half_fov);
    float lambda = u_lambda_offset - atan(sep.y, -sep.x);

    vec2 r = rotate_ray(theta, lambda);
    float radius = lens_radius(r.x);
    lambda = -r.y;

    vec2 tab = 0.5 + radius * vec2(cos(lambda), sin(lambda)) / u_video_size;
    if (tab.x < 0.0 || tab.y < 0.0 || tab.x >= 1.0 || tab.y >= 1.0) {
        color = vec4(0.0, 0.0, 0.0, 1.0);
    } else {
        color = vec4(texture(u_texture, tab).rgb, 1.0);
    }
}
"#;

/// 4-neighbour contrast-adaptive sharpening.
pub const SHARPEN_FRAG: &str = r#"#version 330 core
in vec2 v_texcoord;
uniform sampler2D u_texture;
uniform float u_sharpness;
out vec4 color;

void main() {
    vec2 texel = 1.0 / vec2(textureSize(u_texture, 0));
    vec3 c = texture(u_texture, v_texcoord).rgb;
    vec3 n = texture(u_texture, v_texcoord + vec2(0.0, -texel.y)).rgb;
    vec3 e = texture(u_texture, v_texcoord + vec2(texel.x, 0.0)).rgb;
    vec3 s = texture(u_texture, v_texcoord + vec2(0.0, texel.y)).rgb;
    vec3 w = texture(u_texture, v_texcoord - vec2(texel.x, 0.0)).rgb;

    float max_g = max(c.g, max(max(n.g, e.g), max(s.g, w.g)));
    float min_g = min(c.g, min(min(n.g, e.g), min(s.g, w.g)));
    float a = sqrt(max(min(min_g, 1.0 - max_g), 0.0) / max(max_g, 1e-5));
    a *= mix(-0.125, -0.2, u_sharpness);

    color = vec4((c + (n + e + s + w) * a) / (1.0 + 4.0 * a), 1.0);
}
"#;

pub const GRAIN_FRAG: &str = r#"#version 330 core
in vec2 v_texcoord;
uniform sampler2D u_texture;
uniform uint u_frame_counter;
uniform float u_grain_strength;
out vec4 color;

float noise(vec2 co) {
    return fract(sin(dot(co, vec2(12.9898, 78.233))) * 43758.5453);
}

void main() {
    vec4 c = texture(u_texture, v_texcoord);
    float offset = float(u_frame_counter) / 15.0;
    float g = noise(vec2(v_texcoord.x + offset, v_texcoord.y - offset));
    color = vec4(mix(c.rgb, vec3(g), u_grain_strength), 1.0);
}
"#;

pub const EDGE_FRAG: &str = r#"#version 330 core
in vec2 v_texcoord;
uniform sampler2D u_texture;
uniform vec2 u_texel;
uniform float u_edge_strength;
out vec4 color;

float intensity(vec4 c) {
    return length(c.rgb);
}

float sobel(vec2 uv) {
    float tl = intensity(texture(u_texture, uv + vec2(-u_texel.x,  u_texel.y)));
    float l  = intensity(texture(u_texture, uv + vec2(-u_texel.x,  0.0)));
    float bl = intensity(texture(u_texture, uv + vec2(-u_texel.x, -u_texel.y)));
    float t  = intensity(texture(u_texture, uv + vec2( 0.0,        u_texel.y)));
    float b  = intensity(texture(u_texture, uv + vec2( 0.0,       -u_texel.y)));
    float tr = intensity(texture(u_texture, uv + vec2( u_texel.x,  u_texel.y)));
    float r  = intensity(texture(u_texture, uv + vec2( u_texel.x,  0.0)));
    float br = intensity(texture(u_texture, uv + vec2( u_texel.x, -u_texel.y)));
    float x = tl + 2.0 * l + bl - tr - 2.0 * r - br;
    float y = -tl - 2.0 * t - tr + bl + 2.0 * b + br;
    return sqrt(x * x + y * y);
}

void main() {
    vec4 c = texture(u_texture, v_texcoord);
    color = vec4(c.rgb - vec3(sobel(v_texcoord)) * u_edge_strength, 1.0);
}
"#;

/// Offscreen targets come out upside down relative to the window; flip V on the way out.
pub const PRESENT_FRAG: &str = r#"#version 330 core
in vec2 v_texcoord;
uniform sampler2D u_texture;
out vec4 color;
void main() { color = texture(u_texture, vec2(v_texcoord.x, 1.0 - v_texcoord.y)); }
"#;

const TEXTURE_ONLY: &[UniformDecl] = &[uniform("u_texture", UniformKind::Sampler2D)];

pub const PASSTHROUGH: ShaderStage = ShaderStage {
    source: PASSTHROUGH_FRAG,
    manifest: StageManifest { attributes: &[], uniforms: TEXTURE_ONLY },
};

pub const DEWARP: ShaderStage = ShaderStage {
    source: DEWARP_FRAG,
    manifest: StageManifest {
        attributes: &[],
        uniforms: &[
            uniform("u_texture", UniformKind::Sampler2D),
            uniform("u_video_size", UniformKind::Vec2),
            uniform("u_tan_half_fov", UniformKind::Float),
            uniform("u_rotation", UniformKind::Vec3),
            uniform("u_lens_profile", UniformKind::Vec4),
            uniform("u_lambda_offset", UniformKind::Float),
        ],
    },
};

pub const SHARPEN: ShaderStage = ShaderStage {
    source: SHARPEN_FRAG,
    manifest: StageManifest {
        attributes: &[],
        uniforms: &[
            uniform("u_texture", UniformKind::Sampler2D),
            uniform("u_sharpness", UniformKind::Float),
        ],
    },
};

pub const GRAIN: ShaderStage = ShaderStage {
    source: GRAIN_FRAG,
    manifest: StageManifest {
        attributes: &[],
        uniforms: &[
            uniform("u_texture", UniformKind::Sampler2D),
            uniform("u_frame_counter", UniformKind::Uint),
            uniform("u_grain_strength", UniformKind::Float),
        ],
    },
};

pub const EDGE: ShaderStage = ShaderStage {
    source: EDGE_FRAG,
    manifest: StageManifest {
        attributes: &[],
        uniforms: &[
            uniform("u_texture", UniformKind::Sampler2D),
            uniform("u_texel", UniformKind::Vec2),
            uniform("u_edge_strength", UniformKind::Float),
        ],
    },
};

pub const PRESENT: ShaderStage = ShaderStage {
    source: PRESENT_FRAG,
    manifest: StageManifest { attributes: &[], uniforms: TEXTURE_ONLY },
};

/// Vertex and fragment stage for a built-in pass.
pub fn stages_for(kind: PassKind) -> (ShaderStage, ShaderStage) {
    match kind {
        PassKind::Dewarp => (QUAD, DEWARP),
        PassKind::Perspective => (PERSPECTIVE, PASSTHROUGH),
        PassKind::Post(PostPass::Sharpen) => (QUAD, SHARPEN),
        PassKind::Post(PostPass::Grain) => (QUAD, GRAIN),
        PassKind::Post(PostPass::EdgeDetect) => (QUAD, EDGE),
        PassKind::Present => (QUAD, PRESENT),
    }
}
