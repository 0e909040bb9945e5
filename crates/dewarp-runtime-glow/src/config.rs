use dewarp_core::EngineError;
use dewarp_graph::PostPass;
use serde::{Deserialize, Serialize};

use crate::backend::{TextureFilter, UploadMode};

/// How a non-square frame lands in the square working buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropMode {
    /// Scale the whole frame to the square, ignoring aspect.
    #[default]
    Stretch,
    /// Take the centered square of side `min(width, height)`.
    CenterSquare,
}

/// Pipeline tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Side of the square working buffer and every intermediate target.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: u32,

    /// Capture on every Nth tick.
    #[serde(default = "default_capture_stride")]
    pub capture_stride: u32,

    /// Upload with sub-image updates instead of re-specifying the texture.
    #[serde(default = "default_true")]
    pub sub_image_upload: bool,

    #[serde(default = "default_true")]
    pub texture_filtering: bool,

    #[serde(default)]
    pub crop: CropMode,

    #[serde(default = "default_post_chain")]
    pub post_chain: Vec<PostPass>,

    #[serde(default = "default_sharpness")]
    pub sharpness: f32,

    #[serde(default = "default_grain_strength")]
    pub grain_strength: f32,

    #[serde(default = "default_edge_strength")]
    pub edge_strength: f32,

    #[serde(default = "default_true")]
    pub dewarp_enabled: bool,
}

fn default_buffer_size() -> u32 {
    2048
}
fn default_capture_stride() -> u32 {
    2
}
fn default_true() -> bool {
    true
}
fn default_post_chain() -> Vec<PostPass> {
    vec![PostPass::Sharpen, PostPass::Grain]
}
fn default_sharpness() -> f32 {
    0.7
}
fn default_grain_strength() -> f32 {
    0.1
}
fn default_edge_strength() -> f32 {
    0.5
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            capture_stride: default_capture_stride(),
            sub_image_upload: true,
            texture_filtering: true,
            crop: CropMode::default(),
            post_chain: default_post_chain(),
            sharpness: default_sharpness(),
            grain_strength: default_grain_strength(),
            edge_strength: default_edge_strength(),
            dewarp_enabled: true,
        }
    }
}

impl RenderConfig {
    pub const MIN_BUFFER: u32 = 16;
    pub const MAX_BUFFER: u32 = 8192;

    pub fn validate(&self) -> Result<(), EngineError> {
        let n = self.buffer_size;
        if !n.is_power_of_two() || !(Self::MIN_BUFFER..=Self::MAX_BUFFER).contains(&n) {
            return Err(EngineError::invalid_config(format!(
                "buffer_size must be a power of two in [{}, {}] (got {n})",
                Self::MIN_BUFFER,
                Self::MAX_BUFFER
            )));
        }
        if self.capture_stride == 0 {
            return Err(EngineError::invalid_config("capture_stride must be >= 1"));
        }
        if !(0.0..=1.0).contains(&self.sharpness) {
            return Err(EngineError::invalid_config("sharpness must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.grain_strength) {
            return Err(EngineError::invalid_config("grain_strength must be in [0, 1]"));
        }
        if !self.edge_strength.is_finite() {
            return Err(EngineError::invalid_config("edge_strength must be finite"));
        }
        Ok(())
    }

    pub fn upload_mode(&self) -> UploadMode {
        if self.sub_image_upload {
            UploadMode::SubImage
        } else {
            UploadMode::Respecify
        }
    }

    pub fn filter(&self) -> TextureFilter {
        if self.texture_filtering {
            TextureFilter::Linear
        } else {
            TextureFilter::Nearest
        }
    }
}
