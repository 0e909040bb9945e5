//! Windowed viewer: one virtual PTZ view over a still fisheye image.
//!
//! Drag to look around, click to recenter, scroll to zoom.
//! Keys: `d` toggles dewarp, `r` resets the view, `+`/`-` zoom.

use std::cell::{Cell, RefCell};
use std::ffi::CString;
use std::f32::consts::{FRAC_PI_2, PI};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use anyhow::{anyhow, Context as _};
use clap::Parser;
use glam::Vec2;
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{
    ContextApi, ContextAttributesBuilder, NotCurrentGlContextSurfaceAccessor, PossiblyCurrentContext,
    Version,
};
use glutin::display::GetGlDisplay;
use glutin::prelude::{GlConfig, GlDisplay, GlSurface};
use glutin_winit::DisplayBuilder;
use image::{Rgba, RgbaImage};
use raw_window_handle::HasRawWindowHandle;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};

use dewarp_runtime_glow::{DewarpView, FrameSource, ViewConfig, ViewportRect};

const WIN_W: u32 = 960;
const WIN_H: u32 = 960;

/// One wheel notch in the controller's units.
const WHEEL_NOTCH: f32 = 100.0;

#[derive(Parser, Debug)]
#[command(name = "dewarp-view")]
#[command(about = "Interactive virtual PTZ view over a fisheye image")]
struct Cli {
    #[arg(long, help = "Fisheye image to view (a synthetic test card if omitted)")]
    image: Option<PathBuf>,

    #[arg(long, help = "View config JSON (render, ptz and lens sections)")]
    config: Option<PathBuf>,

    #[arg(long, help = "Override the working buffer size")]
    buffer_size: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    ToggleDewarp,
    Reset,
    ZoomIn,
    ZoomOut,
}

fn key_action(c: char) -> Option<KeyAction> {
    match c.to_ascii_lowercase() {
        'd' => Some(KeyAction::ToggleDewarp),
        'r' => Some(KeyAction::Reset),
        '+' | '=' => Some(KeyAction::ZoomIn),
        '-' | '_' => Some(KeyAction::ZoomOut),
        _ => None,
    }
}

/// Rings and spokes inside the lens circle, black outside.
fn test_card(side: u32) -> RgbaImage {
    let c = side as f32 * 0.5;
    RgbaImage::from_fn(side, side, |x, y| {
        let p = Vec2::new(x as f32 + 0.5 - c, y as f32 + 0.5 - c);
        let r = p.length() / c;
        if r >= 1.0 {
            return Rgba([0, 0, 0, 255]);
        }
        let ring = (r * 12.0) as i32;
        let spoke = ((p.y.atan2(p.x) + PI) / (PI / 12.0)) as i32;
        let shade = (255.0 * (1.0 - 0.5 * r)) as u8;
        if (ring + spoke) % 2 == 0 {
            Rgba([shade, shade / 3, 40, 255])
        } else {
            Rgba([30, shade / 2, shade, 255])
        }
    })
}

fn nonzero(v: u32) -> NonZeroU32 {
    NonZeroU32::new(v).unwrap_or(NonZeroU32::MIN)
}

fn make_gl(
    event_loop: &EventLoop<()>,
) -> anyhow::Result<(
    winit::window::Window,
    glutin::surface::Surface<glutin::surface::WindowSurface>,
    PossiblyCurrentContext,
    glow::Context,
)> {
    let template = ConfigTemplateBuilder::new()
        .with_alpha_size(8)
        .with_depth_size(0)
        .with_stencil_size(0);

    let display_builder = DisplayBuilder::new().with_window_builder(Some(
        winit::window::WindowBuilder::new()
            .with_title("dewarp: virtual ptz")
            .with_inner_size(PhysicalSize::new(WIN_W, WIN_H)),
    ));

    let (window, gl_config) = display_builder
        .build(event_loop, template, |configs| {
            configs
                .reduce(|a, b| if a.num_samples() > b.num_samples() { a } else { b })
                .expect("display offers at least one GL config")
        })
        .map_err(|e| anyhow!("display setup failed: {e}"))?;

    let window = window.context("no window created")?;
    let raw_window_handle = window.raw_window_handle();
    let gl_display = gl_config.display();

    let context_attributes = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
        .build(Some(raw_window_handle));
    let not_current = unsafe { gl_display.create_context(&gl_config, &context_attributes) }
        .context("create GL 3.3 context")?;

    let size = window.inner_size();
    let attrs = glutin::surface::SurfaceAttributesBuilder::<glutin::surface::WindowSurface>::new()
        .build(raw_window_handle, nonzero(size.width), nonzero(size.height));
    let gl_surface = unsafe { gl_display.create_window_surface(&gl_config, &attrs) }
        .context("create window surface")?;

    let gl_context = not_current
        .make_current(&gl_surface)
        .context("make context current")?;

    let gl = unsafe {
        glow::Context::from_loader_function(|s| {
            CString::new(s)
                .map(|name| gl_display.get_proc_address(&name) as *const _)
                .unwrap_or(std::ptr::null())
        })
    };

    Ok((window, gl_surface, gl_context, gl))
}

fn load_config(cli: &Cli) -> anyhow::Result<ViewConfig> {
    let mut cfg = match &cli.config {
        Some(path) => ViewConfig::from_json_path(path)?,
        None => ViewConfig::default(),
    };
    if let Some(n) = cli.buffer_size {
        cfg.render.buffer_size = n;
        cfg.validate()?;
    }
    Ok(cfg)
}

fn load_frame(cli: &Cli, side: u32) -> anyhow::Result<RgbaImage> {
    match &cli.image {
        Some(path) => Ok(image::open(path)
            .with_context(|| format!("open {}", path.display()))?
            .to_rgba8()),
        None => Ok(test_card(side)),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli)?;
    let frame = Rc::new(RefCell::new(load_frame(&cli, cfg.render.buffer_size)?));
    let source: Rc<dyn FrameSource> = frame;

    let event_loop = EventLoop::new();
    let (window, gl_surface, gl_context, gl) = make_gl(&event_loop)?;

    let size = window.inner_size();
    let viewport = Rc::new(Cell::new(ViewportRect::sized(size.width as i32, size.height as i32)));
    let mut view = unsafe { DewarpView::new(gl, viewport.clone(), cfg) }?;
    view.start(&source)?;
    tracing::info!(buffer = view.graph().config().buffer_size, "viewer running");

    let mut cursor = Vec2::ZERO;

    event_loop.run(move |event, _, control_flow| {
        // the graph only holds a weak reference
        let _source = &source;
        *control_flow = ControlFlow::Poll;
        let now = Instant::now();

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    view.shutdown();
                    *control_flow = ControlFlow::Exit;
                }
                WindowEvent::Resized(size) => {
                    gl_surface.resize(&gl_context, nonzero(size.width), nonzero(size.height));
                    viewport.set(ViewportRect::sized(size.width as i32, size.height as i32));
                }
                WindowEvent::CursorMoved { position, .. } => {
                    cursor = Vec2::new(position.x as f32, position.y as f32);
                    view.pointer_move(cursor);
                }
                WindowEvent::CursorLeft { .. } => view.pointer_leave(),
                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => match state {
                    ElementState::Pressed => view.pointer_down(cursor, now),
                    ElementState::Released => view.pointer_up(cursor, now),
                },
                WindowEvent::MouseWheel { delta, .. } => {
                    let amount = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y * WHEEL_NOTCH,
                        MouseScrollDelta::PixelDelta(p) => p.y as f32,
                    };
                    view.wheel(amount, now);
                }
                WindowEvent::ReceivedCharacter(c) => match key_action(c) {
                    Some(KeyAction::ToggleDewarp) => {
                        let enabled = !view.dewarp_enabled();
                        view.set_dewarp_enabled(enabled);
                        tracing::info!(enabled, "dewarp toggled");
                    }
                    Some(KeyAction::Reset) => {
                        view.set_ptz(0.0, 0.0, None);
                        view.set_fov(FRAC_PI_2);
                    }
                    Some(KeyAction::ZoomIn) => view.wheel(WHEEL_NOTCH, now),
                    Some(KeyAction::ZoomOut) => view.wheel(-WHEEL_NOTCH, now),
                    None => {}
                },
                _ => {}
            },
            Event::MainEventsCleared => window.request_redraw(),
            Event::RedrawRequested(_) => {
                if let Err(e) = view.frame(now) {
                    tracing::error!(error = %e, "frame failed");
                    view.shutdown();
                    *control_flow = ControlFlow::Exit;
                    return;
                }
                if let Err(e) = gl_surface.swap_buffers(&gl_context) {
                    tracing::error!(error = %e, "swap_buffers failed");
                }
            }
            _ => {}
        }
    })
}
