//! Compile-only compatibility crate.
//!
//! This crate exists to ensure the backend-agnostic surface (lens math, pass plans, PTZ
//! control) stays usable by third-party consumers. It is not shipped or run; it must only
//! build.

use std::time::Instant;

use dewarp_control::{PtzConfig, PtzController};
use dewarp_core::EngineError;
use dewarp_graph::{PassKind, Plan, PostPass};
use dewarp_lens::{DewarpParams, LensProfile, LensSetup, MountMode};
use glam::Vec2;

#[allow(dead_code)]
pub fn _compile_witness() -> Result<(), EngineError> {
    // Lens setup is constructible without serde.
    let lens = LensSetup::new(
        LensProfile::from_coefficients(&[113.889694, -60.882477, 751.488831, 0.0]),
        MountMode::Ceiling,
    );

    // Plans compile for both reprojection modes from public pass names.
    let plan = Plan::compile(true, &[PostPass::Sharpen, PostPass::Grain])?;
    let _ = (plan.pingpong_targets(), PassKind::ALL.map(|k| k.label()));
    let _flat = Plan::compile(false, &[])?;

    // Controller drives a shared orientation that a renderer can read.
    let mut ptz = PtzController::new(PtzConfig::default(), lens.mount)?;
    ptz.resize(640.0, 480.0);
    ptz.set_ptz(0.0, 0.0, None);
    ptz.advance(Instant::now());
    let o = ptz.orientation().snapshot();

    // CPU-side reprojection mirrors the shader.
    let params = DewarpParams::new(lens.profile, lens.mount, o.rotation, o.fov, Vec2::splat(2048.0));
    let _ = params.source_uv(Vec2::splat(0.5));
    Ok(())
}
