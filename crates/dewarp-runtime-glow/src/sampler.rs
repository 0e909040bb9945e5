use std::time::Instant;

use dewarp_core::EngineError;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba, RgbaImage};

use crate::backend::{GpuBackend, TextureFilter, UploadMode};
use crate::config::{CropMode, RenderConfig};
use crate::source::{FrameSource, FrameView};

/// Result of feeding the sampler for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// No source, or the source had no frame.
    Idle,
    /// Throttled; the previous capture stays in the texture.
    Skipped,
    Captured,
}

const STATS_EVERY: u64 = 120;

/// Copies the external frame into a square working texture at a throttled rate.
#[derive(Debug)]
pub struct FrameSampler<B: GpuBackend> {
    texture: B::Texture,
    size: u32,
    stride: u64,
    crop: CropMode,
    filter: TextureFilter,
    upload: UploadMode,
    canvas: RgbaImage,
    ticks: u64,
    captures: u64,
    stats_since: Option<Instant>,
}

impl<B: GpuBackend> FrameSampler<B> {
    pub unsafe fn new(gpu: &B, cfg: &RenderConfig) -> Result<Self, EngineError> {
        let size = cfg.buffer_size;
        let texture = gpu.create_texture(size as i32, size as i32, cfg.filter())?;
        Ok(Self {
            texture,
            size,
            stride: u64::from(cfg.capture_stride.max(1)),
            crop: cfg.crop,
            filter: cfg.filter(),
            upload: cfg.upload_mode(),
            canvas: RgbaImage::new(size, size),
            ticks: 0,
            captures: 0,
            stats_since: None,
        })
    }

    pub fn texture(&self) -> B::Texture {
        self.texture
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn captures(&self) -> u64 {
        self.captures
    }

    /// Advance one render tick. The first tick that finds a frame always captures; ticks
    /// without a frame do not count toward the stride.
    pub unsafe fn feed(&mut self, gpu: &B, source: Option<&dyn FrameSource>) -> SampleOutcome {
        let Some(source) = source else {
            return SampleOutcome::Idle;
        };
        if self.ticks % self.stride != 0 {
            self.ticks += 1;
            return SampleOutcome::Skipped;
        }

        let mut drawn = false;
        source.read_frame(&mut |view| drawn = self.draw(view));
        if !drawn {
            return SampleOutcome::Idle;
        }
        self.ticks += 1;

        let side = self.size as i32;
        gpu.upload_rgba(self.texture, side, side, self.canvas.as_raw(), self.upload);
        self.captures += 1;
        self.log_rate();
        SampleOutcome::Captured
    }

    /// Scale (and optionally crop) `view` into the canvas.
    fn draw(&mut self, view: FrameView<'_>) -> bool {
        if view.width == 0 || view.height == 0 {
            return false;
        }
        let Some(frame) = ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(view.width, view.height, view.rgba)
        else {
            tracing::warn!(
                width = view.width,
                height = view.height,
                len = view.rgba.len(),
                "frame buffer too short; skipped"
            );
            return false;
        };
        let filter = match self.filter {
            TextureFilter::Nearest => FilterType::Nearest,
            TextureFilter::Linear => FilterType::Triangle,
        };
        let n = self.size;

        self.canvas = match self.crop {
            CropMode::Stretch if view.width == n && view.height == n => {
                RgbaImage::from_raw(n, n, view.rgba[..(n * n * 4) as usize].to_vec())
                    .unwrap_or_else(|| RgbaImage::new(n, n))
            }
            CropMode::Stretch => imageops::resize(&frame, n, n, filter),
            CropMode::CenterSquare => {
                let side = view.width.min(view.height);
                let x = (view.width - side) / 2;
                let y = (view.height - side) / 2;
                let square = imageops::crop_imm(&frame, x, y, side, side);
                imageops::resize(&*square, n, n, filter)
            }
        };
        true
    }

    fn log_rate(&mut self) {
        let now = Instant::now();
        let since = *self.stats_since.get_or_insert(now);
        if self.captures % STATS_EVERY == 0 {
            let secs = now.duration_since(since).as_secs_f64();
            if secs > 0.0 {
                tracing::debug!(
                    captures = self.captures,
                    fps = STATS_EVERY as f64 / secs,
                    "frame sampler capture rate"
                );
            }
            self.stats_since = Some(now);
        }
    }

    pub unsafe fn destroy(&mut self, gpu: &B) {
        gpu.delete_texture(self.texture);
    }
}
