//! Render graph: owns every GPU object and runs the per-tick pass plan.
//!
//! Lifecycle: `Uninitialized → Ready → Running ⇄ Stopped → ShutDown`. Orientation, lens
//! and the dewarp flag are read once at the top of each tick; changes made while a tick
//! is running are seen by the next one.

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use dewarp_control::{OrientationState, SharedOrientation};
use dewarp_core::EngineError;
use dewarp_graph::{InputSlot, PassKind, Plan, PostPass, TargetSlot, UniformValue};
use dewarp_lens::{DewarpParams, LensProfile, LensSetup};
use glam::{Mat4, Vec2, Vec3};

use crate::backend::GpuBackend;
use crate::config::RenderConfig;
use crate::program::ShaderRegistry;
use crate::quad::QuadMesh;
use crate::sampler::{FrameSampler, SampleOutcome};
use crate::source::{FrameSource, Viewport};
use crate::target::RenderTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Ready,
    Running,
    Stopped,
    ShutDown,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Ready => "ready",
            Phase::Running => "running",
            Phase::Stopped => "stopped",
            Phase::ShutDown => "shut down",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running; nothing touched.
    Inactive,
    /// Running without a live frame source.
    Idle,
    Rendered {
        frame: u64,
        sample: SampleOutcome,
        dewarp: bool,
    },
}

/// Per-tick values every pass's uniforms derive from.
#[derive(Debug, Clone)]
struct FrameInputs {
    orientation: OrientationState,
    lens: LensSetup,
    buffer: f32,
    frame: u64,
    sharpness: f32,
    grain_strength: f32,
    edge_strength: f32,
}

fn pass_uniforms(pass: PassKind, f: &FrameInputs) -> Vec<(&'static str, UniformValue)> {
    let mut u = vec![
        ("u_texture", UniformValue::Sampler2D(0)),
        ("u_matrix", UniformValue::Mat4(Mat4::IDENTITY)),
    ];
    let rot = f.orientation.rotation;
    match pass {
        PassKind::Dewarp => {
            let p = DewarpParams::new(
                f.lens.profile,
                f.lens.mount,
                rot,
                f.orientation.fov,
                Vec2::splat(f.buffer),
            );
            u.extend([
                ("u_video_size", UniformValue::Vec2(p.video_size)),
                ("u_tan_half_fov", UniformValue::Float(p.tan_half_fov)),
                ("u_rotation", UniformValue::Vec3(p.rotation)),
                ("u_lens_profile", UniformValue::Vec4(p.profile.as_vec4())),
                ("u_lambda_offset", UniformValue::Float(p.lambda_offset)),
            ]);
        }
        PassKind::Perspective => {
            let projection = Mat4::perspective_rh_gl(f.orientation.fov, 1.0, 0.01, 100.0);
            let view = Mat4::look_at_rh(Vec3::Z, Vec3::ZERO, Vec3::Y);
            u.extend([
                ("u_projection", UniformValue::Mat4(projection)),
                ("u_view", UniformValue::Mat4(view)),
                ("u_model", UniformValue::Mat4(Mat4::from_rotation_z(rot.z))),
            ]);
        }
        PassKind::Post(PostPass::Sharpen) => {
            u.push(("u_sharpness", UniformValue::Float(f.sharpness)));
        }
        PassKind::Post(PostPass::Grain) => {
            // wraps after 2^32 frames
            u.push(("u_frame_counter", UniformValue::Uint(f.frame as u32)));
            u.push(("u_grain_strength", UniformValue::Float(f.grain_strength)));
        }
        PassKind::Post(PostPass::EdgeDetect) => {
            u.push(("u_texel", UniformValue::Vec2(Vec2::splat(1.0 / f.buffer))));
            u.push(("u_edge_strength", UniformValue::Float(f.edge_strength)));
        }
        PassKind::Present => {}
    }
    u
}

fn missing(what: &str) -> EngineError {
    EngineError::Other(format!("render graph: missing {what}"))
}

#[derive(Debug)]
struct Resources<B: GpuBackend> {
    registry: ShaderRegistry<B>,
    quads: HashMap<PassKind, QuadMesh<B>>,
    sampler: Option<FrameSampler<B>>,
    stage: Option<RenderTarget<B>>,
    pingpong: Vec<RenderTarget<B>>,
}

impl<B: GpuBackend> Resources<B> {
    fn empty() -> Self {
        Self {
            registry: ShaderRegistry::new(),
            quads: HashMap::new(),
            sampler: None,
            stage: None,
            pingpong: Vec::new(),
        }
    }

    /// Fills `self` step by step so a failure leaves only what `destroy` can release.
    unsafe fn allocate(
        &mut self,
        gpu: &B,
        cfg: &RenderConfig,
        pingpong: usize,
    ) -> Result<(), EngineError> {
        self.registry = ShaderRegistry::compile_all(gpu)?;
        for kind in PassKind::ALL {
            let program = self.registry.get(kind).ok_or_else(|| missing("program"))?;
            let quad = QuadMesh::new(gpu, program)?;
            self.quads.insert(kind, quad);
        }

        self.sampler = Some(FrameSampler::new(gpu, cfg)?);

        let side = cfg.buffer_size as i32;
        self.stage = Some(RenderTarget::create(gpu, side, side)?);
        for _ in 0..pingpong {
            self.pingpong.push(RenderTarget::create(gpu, side, side)?);
        }
        Ok(())
    }

    unsafe fn destroy(&mut self, gpu: &B) {
        for (_, mut q) in self.quads.drain() {
            q.destroy(gpu);
        }
        self.registry.destroy(gpu);
        if let Some(mut s) = self.sampler.take() {
            s.destroy(gpu);
        }
        if let Some(t) = self.stage.take() {
            t.destroy(gpu);
        }
        for t in self.pingpong.drain(..) {
            t.destroy(gpu);
        }
    }
}

#[derive(Debug)]
pub struct RenderGraph<B: GpuBackend> {
    config: RenderConfig,
    phase: Phase,
    resources: Option<Resources<B>>,
    dewarp_plan: Plan,
    perspective_plan: Plan,
    viewport: Option<Rc<dyn Viewport>>,
    orientation: Option<SharedOrientation>,
    lens: LensSetup,
    source: Option<Weak<dyn FrameSource>>,
    dewarp_enabled: bool,
    frame_counter: u64,
    idle_logged: bool,
}

impl<B: GpuBackend> RenderGraph<B> {
    pub fn new(config: RenderConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let dewarp_plan = Plan::compile(true, &config.post_chain)?;
        let perspective_plan = Plan::compile(false, &config.post_chain)?;
        Ok(Self {
            dewarp_enabled: config.dewarp_enabled,
            config,
            phase: Phase::Uninitialized,
            resources: None,
            dewarp_plan,
            perspective_plan,
            viewport: None,
            orientation: None,
            lens: LensSetup::default(),
            source: None,
            frame_counter: 0,
            idle_logged: false,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn lens(&self) -> &LensSetup {
        &self.lens
    }

    pub fn dewarp_enabled(&self) -> bool {
        self.dewarp_enabled
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Compile every program and allocate every target. Fatal errors leave the graph
    /// `Uninitialized` with nothing allocated.
    pub unsafe fn configure(
        &mut self,
        gpu: &B,
        viewport: Rc<dyn Viewport>,
        lens: LensSetup,
        orientation: SharedOrientation,
    ) -> Result<(), EngineError> {
        if self.phase != Phase::Uninitialized {
            return Err(EngineError::InvalidState {
                op: "configure",
                state: self.phase.name(),
            });
        }

        let pingpong = self
            .dewarp_plan
            .pingpong_targets()
            .max(self.perspective_plan.pingpong_targets());
        let mut res = Resources::empty();
        if let Err(e) = res.allocate(gpu, &self.config, pingpong) {
            res.destroy(gpu);
            return Err(e);
        }

        self.resources = Some(res);
        self.viewport = Some(viewport);
        self.orientation = Some(orientation);
        self.lens = lens;
        self.phase = Phase::Ready;
        tracing::info!(
            buffer = self.config.buffer_size,
            chain = ?self.config.post_chain,
            mount = ?self.lens.mount,
            "render graph configured"
        );
        Ok(())
    }

    /// Attach `source` (held weakly) and start rendering. No-op when already running
    /// with a live source.
    pub fn start(&mut self, source: &Rc<dyn FrameSource>) -> Result<(), EngineError> {
        match self.phase {
            Phase::Uninitialized | Phase::ShutDown => Err(EngineError::InvalidState {
                op: "start",
                state: self.phase.name(),
            }),
            Phase::Running if self.source.as_ref().is_some_and(|w| w.strong_count() > 0) => {
                tracing::debug!("start ignored; already running");
                Ok(())
            }
            _ => {
                self.source = Some(Rc::downgrade(source));
                self.phase = Phase::Running;
                self.idle_logged = false;
                tracing::info!("render graph running");
                Ok(())
            }
        }
    }

    /// Detach the source. The last presented frame stays on screen.
    pub fn stop(&mut self) {
        if self.phase == Phase::Running {
            self.phase = Phase::Stopped;
            tracing::info!("render graph stopped");
        }
        self.source = None;
    }

    /// Writes the shared orientation; applies to the next tick. A controller easing the
    /// same orientation drops its zoom target when it sees the new value.
    pub fn set_fov(&self, fov: f32) {
        if let Some(o) = &self.orientation {
            o.set_fov(fov);
        }
    }

    /// Applies to the next tick.
    pub fn set_dewarp_enabled(&mut self, enabled: bool) {
        self.dewarp_enabled = enabled;
    }

    pub fn set_lens_profile(&mut self, profile: LensProfile) {
        self.lens.profile = profile;
    }

    /// Release everything `configure` created. Safe to repeat.
    pub unsafe fn shutdown(&mut self, gpu: &B) {
        if self.phase == Phase::ShutDown {
            return;
        }
        if let Some(mut res) = self.resources.take() {
            res.destroy(gpu);
        }
        self.source = None;
        self.viewport = None;
        self.orientation = None;
        self.phase = Phase::ShutDown;
        tracing::info!("render graph shut down");
    }

    /// Render one frame: sample, reproject, post-process, present.
    pub unsafe fn tick(&mut self, gpu: &B) -> Result<TickOutcome, EngineError> {
        if self.phase != Phase::Running {
            return Ok(TickOutcome::Inactive);
        }
        let Some(source) = self.source.as_ref().and_then(Weak::upgrade) else {
            if !self.idle_logged {
                tracing::info!("no frame source attached; skipping draw");
                self.idle_logged = true;
            }
            return Ok(TickOutcome::Idle);
        };
        let (Some(res), Some(viewport), Some(orientation)) = (
            self.resources.as_mut(),
            self.viewport.as_ref(),
            self.orientation.as_ref(),
        ) else {
            return Err(missing("configured resources"));
        };

        let snapshot = orientation.snapshot();
        let sampler = res.sampler.as_mut().ok_or_else(|| missing("frame sampler"))?;
        let sample = sampler.feed(gpu, Some(&*source));
        if sampler.captures() == 0 {
            if !self.idle_logged {
                tracing::info!("frame source has no frame yet; skipping draw");
                self.idle_logged = true;
            }
            return Ok(TickOutcome::Idle);
        }
        self.idle_logged = false;
        let frame_tex = sampler.texture();

        self.frame_counter += 1;
        let bounds = viewport.bounds();
        let (screen_w, screen_h) = (bounds.width.max(1), bounds.height.max(1));
        let dewarp = self.dewarp_enabled;
        let inputs = FrameInputs {
            orientation: snapshot,
            lens: self.lens.clone(),
            buffer: self.config.buffer_size as f32,
            frame: self.frame_counter,
            sharpness: self.config.sharpness,
            grain_strength: self.config.grain_strength,
            edge_strength: self.config.edge_strength,
        };

        let stage = res.stage.as_ref().ok_or_else(|| missing("stage target"))?;

        let plan = if dewarp {
            &self.dewarp_plan
        } else {
            &self.perspective_plan
        };
        for step in &plan.steps {
            let program = res.registry.get(step.pass).ok_or_else(|| missing("program"))?;
            let quad = res.quads.get(&step.pass).ok_or_else(|| missing("quad"))?;

            let input = match step.input {
                InputSlot::Frame => frame_tex,
                InputSlot::Stage => stage.tex,
                InputSlot::PingPong(i) => res.pingpong.get(i).ok_or_else(|| missing("ping-pong"))?.tex,
            };
            let (fbo, w, h) = match step.target {
                TargetSlot::Stage => (Some(stage.fbo), stage.w, stage.h),
                TargetSlot::PingPong(i) => {
                    let t = res.pingpong.get(i).ok_or_else(|| missing("ping-pong"))?;
                    (Some(t.fbo), t.w, t.h)
                }
                TargetSlot::Screen => (None, screen_w, screen_h),
            };

            gpu.begin_pass(fbo, w, h);
            gpu.use_program(program.program);
            gpu.bind_texture(0, input);
            for (name, value) in pass_uniforms(step.pass, &inputs) {
                program.set_uniform(gpu, name, &value);
            }
            quad.draw(gpu);
        }

        Ok(TickOutcome::Rendered {
            frame: self.frame_counter,
            sample,
            dewarp,
        })
    }
}
