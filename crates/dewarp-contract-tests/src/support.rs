use std::cell::{Cell, RefCell};
use std::f32::consts::FRAC_PI_2;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use dewarp_control::{FovBounds, OrientationState, SharedOrientation};
use dewarp_graph::PostPass;
use dewarp_lens::{LensProfile, LensSetup, MountMode};
use dewarp_runtime_glow::{FrameSource, RenderConfig, RenderGraph, ViewportRect};
use glam::Vec3;
use image::{Rgba, RgbaImage};

use crate::SoftGpu;

pub const AXIS_PROFILE: [f32; 4] = [113.889694, -60.882477, 751.488831, 0.0];

pub fn axis_lens() -> LensSetup {
    LensSetup::new(LensProfile::from_coefficients(&AXIS_PROFILE), MountMode::Ceiling)
}

/// 64px buffer, nearest filtering, capture every tick.
pub fn small_config(chain: &[PostPass]) -> RenderConfig {
    RenderConfig {
        buffer_size: 64,
        capture_stride: 1,
        texture_filtering: false,
        post_chain: chain.to_vec(),
        ..RenderConfig::default()
    }
}

pub fn solid_frame(w: u32, h: u32, rgba: [u8; 4]) -> Rc<RefCell<RgbaImage>> {
    Rc::new(RefCell::new(RgbaImage::from_pixel(w, h, Rgba(rgba))))
}

pub fn as_source(frame: &Rc<RefCell<RgbaImage>>) -> Rc<dyn FrameSource> {
    frame.clone()
}

pub fn viewport(w: i32, h: i32) -> Rc<Cell<ViewportRect>> {
    Rc::new(Cell::new(ViewportRect::sized(w, h)))
}

/// Looking straight down the lens axis at 90°.
pub fn level_orientation() -> SharedOrientation {
    SharedOrientation::new(
        OrientationState {
            rotation: Vec3::ZERO,
            fov: FRAC_PI_2,
        },
        FovBounds::default(),
    )
}

pub struct Rig {
    pub gpu: SoftGpu,
    pub graph: RenderGraph<SoftGpu>,
    pub orientation: SharedOrientation,
    pub viewport: Rc<Cell<ViewportRect>>,
}

pub fn configured(cfg: RenderConfig) -> Rig {
    let gpu = SoftGpu::new();
    let mut graph = RenderGraph::new(cfg).expect("valid config");
    let orientation = level_orientation();
    let viewport = viewport(64, 64);
    unsafe {
        graph
            .configure(&gpu, viewport.clone(), axis_lens(), orientation.clone())
            .expect("configure");
    }
    Rig {
        gpu,
        graph,
        orientation,
        viewport,
    }
}

pub fn write_temp_fixture(name: &str, contents: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    p.push(format!("dewarp_contract_tests_{name}_{ts}.json"));
    fs::write(&p, contents).expect("write fixture");
    p
}

pub fn assert_rgb_close(got: [f32; 4], want: [f32; 3], tol: f32) {
    for i in 0..3 {
        assert!(
            (got[i] - want[i]).abs() <= tol,
            "channel {i}: got {got:?}, want {want:?}"
        );
    }
}
