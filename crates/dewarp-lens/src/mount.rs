use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Physical placement of the fisheye camera.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountMode {
    #[default]
    Ceiling,
    Desk,
    Wall,
}

impl MountMode {
    /// Rotation vector for a pan/tilt pair (radians).
    pub fn rotation_for(self, pan: f32, tilt: f32) -> Vec3 {
        match self {
            MountMode::Ceiling => Vec3::new(-(tilt + FRAC_PI_2), pan + FRAC_PI_2, 0.0),
            MountMode::Desk => Vec3::new(-(tilt - FRAC_PI_2), -pan - FRAC_PI_2, 0.0),
            MountMode::Wall => Vec3::new(0.0, -tilt, pan),
        }
    }

    /// Azimuth offset applied to every view ray before rotation.
    pub fn lambda_offset(self) -> f32 {
        match self {
            MountMode::Ceiling | MountMode::Desk => FRAC_PI_2,
            MountMode::Wall => PI,
        }
    }
}
