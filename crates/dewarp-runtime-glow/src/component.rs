//! Host-facing facade: one object that owns the controller, the render graph and the GPU
//! handle, and forwards host events to the right one.

use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

use dewarp_control::{PtzConfig, PtzController, SharedOrientation};
use dewarp_core::{load_typed_json, EngineError};
use dewarp_lens::{LensProfile, LensSetup};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::backend::GpuBackend;
use crate::config::RenderConfig;
use crate::pipeline::{RenderGraph, TickOutcome};
use crate::source::{FrameSource, Viewport};

/// Everything a view needs at construction. Every section may be omitted in JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub ptz: PtzConfig,
    #[serde(default)]
    pub lens: LensSetup,
}

impl ViewConfig {
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let cfg: ViewConfig = load_typed_json(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.render.validate()?;
        self.ptz.validate()
    }
}

/// A configured virtual PTZ view bound to one GPU context.
///
/// Dropping the view shuts it down.
#[derive(Debug)]
pub struct DewarpView<B: GpuBackend> {
    gpu: B,
    controller: PtzController,
    graph: RenderGraph<B>,
    viewport: Rc<dyn Viewport>,
}

impl<B: GpuBackend> DewarpView<B> {
    /// Build and configure the view.
    ///
    /// # Safety
    /// `gpu` must stay current on this thread for the lifetime of the view.
    pub unsafe fn new(gpu: B, viewport: Rc<dyn Viewport>, cfg: ViewConfig) -> Result<Self, EngineError> {
        cfg.validate()?;
        let controller = PtzController::new(cfg.ptz, cfg.lens.mount)?;
        let mut graph = RenderGraph::new(cfg.render)?;
        graph.configure(&gpu, viewport.clone(), cfg.lens, controller.orientation())?;
        let mut view = Self {
            gpu,
            controller,
            graph,
            viewport,
        };
        view.sync_viewport();
        Ok(view)
    }

    fn sync_viewport(&mut self) {
        let bounds = self.viewport.bounds();
        self.controller
            .resize(bounds.width.max(1) as f32, bounds.height.max(1) as f32);
    }

    pub fn start(&mut self, source: &Rc<dyn FrameSource>) -> Result<(), EngineError> {
        self.graph.start(source)
    }

    /// Detach the source and cancel running gestures.
    pub fn stop(&mut self) {
        self.controller.stop();
        self.graph.stop();
    }

    /// Release every GPU object and cancel every task. Safe to repeat.
    pub fn shutdown(&mut self) {
        self.controller.shutdown();
        // SAFETY: `new` requires the context to outlive the view.
        unsafe { self.graph.shutdown(&self.gpu) };
    }

    /// Point the virtual camera using mount-relative pan/tilt and an optional roll.
    pub fn set_ptz(&mut self, pan: f32, tilt: f32, roll: Option<f32>) {
        self.controller.set_ptz(pan, tilt, roll);
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.controller.set_rotation(rotation);
    }

    /// Returns the clamped value actually stored.
    pub fn set_fov(&mut self, fov: f32) -> f32 {
        self.controller.set_fov(fov)
    }

    pub fn set_dewarp_enabled(&mut self, enabled: bool) {
        self.graph.set_dewarp_enabled(enabled);
    }

    pub fn dewarp_enabled(&self) -> bool {
        self.graph.dewarp_enabled()
    }

    pub fn set_lens_profile(&mut self, coefficients: &[f32]) {
        let profile = LensProfile::from_coefficients(coefficients);
        tracing::debug!(coeffs = ?profile.coefficients(), "lens profile updated");
        self.graph.set_lens_profile(profile);
    }

    pub fn pointer_down(&mut self, pos: Vec2, now: Instant) {
        self.controller.pointer_down(pos, now);
    }

    pub fn pointer_move(&mut self, pos: Vec2) {
        self.controller.pointer_move(pos);
    }

    pub fn pointer_up(&mut self, pos: Vec2, now: Instant) {
        self.controller.pointer_up(pos, now);
    }

    pub fn pointer_leave(&mut self) {
        self.controller.pointer_leave();
    }

    pub fn wheel(&mut self, delta: f32, now: Instant) {
        self.controller.wheel(delta, now);
    }

    /// One host frame: advance gestures, then render.
    pub fn frame(&mut self, now: Instant) -> Result<TickOutcome, EngineError> {
        self.sync_viewport();
        self.controller.advance(now);
        // SAFETY: `new` requires the context to outlive the view.
        unsafe { self.graph.tick(&self.gpu) }
    }

    pub fn gpu(&self) -> &B {
        &self.gpu
    }

    pub fn graph(&self) -> &RenderGraph<B> {
        &self.graph
    }

    pub fn controller(&self) -> &PtzController {
        &self.controller
    }

    pub fn orientation(&self) -> SharedOrientation {
        self.controller.orientation()
    }
}

impl<B: GpuBackend> Drop for DewarpView<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
