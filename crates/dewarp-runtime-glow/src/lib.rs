//! dewarp runtime (glow/OpenGL backend)
//
// This crate owns every GPU object of the virtual PTZ view:
// - compile/link the built-in stages and resolve their bindings
// - sample the external frame into the square working texture
// - run the per-tick pass plan (dewarp or perspective → post chain → present)
//
// It does NOT create windows or GL contexts; hosts hand in a current context.
#![allow(clippy::missing_safety_doc)]
#![deny(missing_debug_implementations)]

pub mod backend;
pub mod component;
pub mod config;
pub mod pipeline;
pub mod program;
pub mod quad;
pub mod sampler;
pub mod source;
pub mod target;

pub use backend::{GpuBackend, TextureFilter, UploadMode};
pub use component::{DewarpView, ViewConfig};
pub use config::{CropMode, RenderConfig};
pub use pipeline::{Phase, RenderGraph, TickOutcome};
pub use program::{ShaderProgram, ShaderRegistry};
pub use quad::QuadMesh;
pub use sampler::{FrameSampler, SampleOutcome};
pub use source::{FrameSource, FrameView, Viewport, ViewportRect};
pub use target::RenderTarget;

pub use dewarp_control::{OrientationState, PtzConfig, PtzController, SharedOrientation};
pub use dewarp_core::EngineError;
pub use dewarp_graph::{PassKind, PostPass, UniformKind, UniformValue};
pub use dewarp_lens::{LensProfile, LensSetup, MountMode};
