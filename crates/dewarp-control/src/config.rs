use dewarp_core::EngineError;
use serde::{Deserialize, Serialize};

use crate::FovBounds;

/// Gesture tuning. Angles in degrees, times in milliseconds, distances in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PtzConfig {
    #[serde(default = "default_min_fov_deg")]
    pub min_fov_deg: f32,

    #[serde(default = "default_max_fov_deg")]
    pub max_fov_deg: f32,

    /// Drag rate: degrees per tick for a pointer one viewport-height from center at
    /// FOV 1 rad.
    #[serde(default = "default_drag_gain")]
    pub drag_gain: f32,

    /// Presses shorter than this count as clicks and trigger a recenter.
    #[serde(default = "default_click_max_ms")]
    pub click_max_ms: u64,

    /// Fraction of the remaining recenter offset kept each tick.
    #[serde(default = "default_recenter_factor")]
    pub recenter_factor: f32,

    #[serde(default = "default_recenter_threshold_px")]
    pub recenter_threshold_px: f32,

    /// Wheel events inside this window coalesce into one zoom target.
    #[serde(default = "default_wheel_window_ms")]
    pub wheel_window_ms: u64,

    /// Multiplicative FOV change per `wheel_notch` units of wheel delta.
    #[serde(default = "default_zoom_factor")]
    pub zoom_factor: f32,

    #[serde(default = "default_wheel_notch")]
    pub wheel_notch: f32,

    /// Zoom easing step per tick.
    #[serde(default = "default_fov_step_deg")]
    pub fov_step_deg: f32,

    #[serde(default = "default_fov_epsilon_deg")]
    pub fov_epsilon_deg: f32,
}

fn default_min_fov_deg() -> f32 {
    2.0
}
fn default_max_fov_deg() -> f32 {
    90.0
}
fn default_drag_gain() -> f32 {
    4.0
}
fn default_click_max_ms() -> u64 {
    130
}
fn default_recenter_factor() -> f32 {
    0.9
}
fn default_recenter_threshold_px() -> f32 {
    0.5
}
fn default_wheel_window_ms() -> u64 {
    20
}
fn default_zoom_factor() -> f32 {
    1.2
}
fn default_wheel_notch() -> f32 {
    100.0
}
fn default_fov_step_deg() -> f32 {
    0.5
}
fn default_fov_epsilon_deg() -> f32 {
    0.1
}

impl Default for PtzConfig {
    fn default() -> Self {
        Self {
            min_fov_deg: default_min_fov_deg(),
            max_fov_deg: default_max_fov_deg(),
            drag_gain: default_drag_gain(),
            click_max_ms: default_click_max_ms(),
            recenter_factor: default_recenter_factor(),
            recenter_threshold_px: default_recenter_threshold_px(),
            wheel_window_ms: default_wheel_window_ms(),
            zoom_factor: default_zoom_factor(),
            wheel_notch: default_wheel_notch(),
            fov_step_deg: default_fov_step_deg(),
            fov_epsilon_deg: default_fov_epsilon_deg(),
        }
    }
}

impl PtzConfig {
    pub fn fov_bounds(&self) -> Result<FovBounds, EngineError> {
        FovBounds::from_degrees(self.min_fov_deg, self.max_fov_deg)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.fov_bounds()?;
        if !(self.recenter_factor > 0.0 && self.recenter_factor < 1.0) {
            return Err(EngineError::invalid_config("recenter_factor must be in (0, 1)"));
        }
        if self.zoom_factor <= 1.0 {
            return Err(EngineError::invalid_config("zoom_factor must be > 1"));
        }
        if self.wheel_notch <= 0.0 || self.fov_step_deg <= 0.0 || self.fov_epsilon_deg <= 0.0 {
            return Err(EngineError::invalid_config(
                "wheel_notch, fov_step_deg and fov_epsilon_deg must be positive",
            ));
        }
        Ok(())
    }
}
