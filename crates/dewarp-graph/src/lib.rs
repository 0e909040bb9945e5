#![forbid(unsafe_code)]

//! Render graph vocabulary for the dewarp pipeline.
//!
//! This crate is **contract-only**: no windowing, no GL handles. It names the passes,
//! declares what each shader stage binds (attributes and typed uniforms), and compiles a
//! pass chain into a flat [`Plan`] of reads and writes that a runtime executes in order.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

mod manifest;
mod plan;
mod uniform;

pub use manifest::{AttributeDecl, ShaderStage, StageManifest, UniformDecl};
pub use plan::{InputSlot, PassStep, Plan, TargetSlot};
pub use uniform::{UniformKind, UniformValue};

use serde::{Deserialize, Serialize};

/// Post-process stages that can appear in the configurable chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostPass {
    /// Contrast-adaptive sharpening.
    Sharpen,
    /// Deterministic per-frame noise.
    Grain,
    /// Sobel edge darkening.
    EdgeDetect,
}

/// Every pass the pipeline can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Fisheye → virtual camera reprojection.
    Dewarp,
    /// Raw frame on a perspective quad (dewarp disabled).
    Perspective,
    Post(PostPass),
    /// Final V-flipped draw to the screen.
    Present,
}

impl PassKind {
    pub fn label(&self) -> &'static str {
        match self {
            PassKind::Dewarp => "dewarp",
            PassKind::Perspective => "perspective",
            PassKind::Post(PostPass::Sharpen) => "sharpen",
            PassKind::Post(PostPass::Grain) => "grain",
            PassKind::Post(PostPass::EdgeDetect) => "edge_detect",
            PassKind::Present => "present",
        }
    }

    /// Every kind, in the order the registry compiles them.
    pub const ALL: [PassKind; 6] = [
        PassKind::Dewarp,
        PassKind::Perspective,
        PassKind::Post(PostPass::Sharpen),
        PassKind::Post(PostPass::Grain),
        PassKind::Post(PostPass::EdgeDetect),
        PassKind::Present,
    ];
}
