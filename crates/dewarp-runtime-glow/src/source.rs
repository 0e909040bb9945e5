//! Inbound collaborators: the frame provider and the viewport container.

use std::cell::{Cell, RefCell};
use std::fmt::Debug;

use image::RgbaImage;

/// Borrowed RGBA8 pixels, rows top to bottom, tightly packed.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub width: u32,
    pub height: u32,
    pub rgba: &'a [u8],
}

/// Anything that can hand out its current frame. The pipeline never controls playback.
pub trait FrameSource: Debug {
    /// Call `f` with the current frame. Returns `false` when no frame is available yet.
    fn read_frame(&self, f: &mut dyn FnMut(FrameView<'_>)) -> bool;
}

impl FrameSource for RefCell<RgbaImage> {
    fn read_frame(&self, f: &mut dyn FnMut(FrameView<'_>)) -> bool {
        let img = self.borrow();
        if img.width() == 0 || img.height() == 0 {
            return false;
        }
        f(FrameView {
            width: img.width(),
            height: img.height(),
            rgba: img.as_raw(),
        });
        true
    }
}

/// Container bounds in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl ViewportRect {
    pub fn sized(width: i32, height: i32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Queried once per tick to size the default framebuffer.
pub trait Viewport: Debug {
    fn bounds(&self) -> ViewportRect;
}

impl Viewport for Cell<ViewportRect> {
    fn bounds(&self) -> ViewportRect {
        self.get()
    }
}
