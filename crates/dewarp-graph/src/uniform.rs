use glam::{Mat4, Vec2, Vec3, Vec4};

/// GLSL uniform types the pipeline uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
    Sampler2D,
    Uint,
}

impl UniformKind {
    pub fn glsl_name(self) -> &'static str {
        match self {
            UniformKind::Float => "float",
            UniformKind::Vec2 => "vec2",
            UniformKind::Vec3 => "vec3",
            UniformKind::Vec4 => "vec4",
            UniformKind::Mat4 => "mat4",
            UniformKind::Sampler2D => "sampler2D",
            UniformKind::Uint => "uint",
        }
    }

    /// Inverse of [`UniformKind::glsl_name`]; also accepts `unsigned int`.
    pub fn from_glsl(name: &str) -> Option<Self> {
        Some(match name {
            "float" => UniformKind::Float,
            "vec2" => UniformKind::Vec2,
            "vec3" => UniformKind::Vec3,
            "vec4" => UniformKind::Vec4,
            "mat4" => UniformKind::Mat4,
            "sampler2D" => UniformKind::Sampler2D,
            "uint" | "unsigned int" => UniformKind::Uint,
            _ => return None,
        })
    }
}

/// A typed uniform value. Each variant maps to exactly one upload call in the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
    /// Texture unit index.
    Sampler2D(i32),
    Uint(u32),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Sampler2D(_) => UniformKind::Sampler2D,
            UniformValue::Uint(_) => UniformKind::Uint,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            UniformValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}
