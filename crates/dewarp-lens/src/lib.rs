#![forbid(unsafe_code)]

//! Fisheye lens model: polynomial radius profile, mount placement, and the ray → source
//! texture mapping the dewarp pass evaluates per pixel.
//!
//! Pure math with no GPU handles. The GLSL dewarp stage mirrors [`DewarpParams::source_uv`]
//! line for line, which lets software backends and tests reproduce shader output exactly.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

mod mount;
mod profile;
mod sphere;

pub use mount::MountMode;
pub use profile::LensProfile;
pub use sphere::{cartesian_to_spherical, rotate, spherical_to_cartesian, DewarpParams};

use serde::{Deserialize, Serialize};

/// Lens description supplied at configuration time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LensSetup {
    #[serde(default)]
    pub profile: LensProfile,
    #[serde(default)]
    pub mount: MountMode,
}

impl LensSetup {
    pub fn new(profile: LensProfile, mount: MountMode) -> Self {
        Self { profile, mount }
    }
}
