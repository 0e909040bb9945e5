use glam::Vec4;
use serde::{Deserialize, Serialize};

/// Number of polynomial coefficients in a profile.
pub const COEFFICIENTS: usize = 4;

/// Radial distortion profile: `r(θ) = c0·θ⁴ + c1·θ³ + c2·θ² + c3·θ` (pixels).
///
/// Always holds exactly four coefficients, highest degree first. Shorter inputs are
/// left-padded with zeros so the provided values keep their low-degree positions.
/// Inputs longer than four keep their last four entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f32>", into = "Vec<f32>")]
pub struct LensProfile {
    coeffs: [f32; COEFFICIENTS],
}

impl LensProfile {
    pub fn from_coefficients(input: &[f32]) -> Self {
        let mut coeffs = [0.0; COEFFICIENTS];
        let take = input.len().min(COEFFICIENTS);
        let tail = &input[input.len() - take..];
        coeffs[COEFFICIENTS - take..].copy_from_slice(tail);
        Self { coeffs }
    }

    pub fn coefficients(&self) -> [f32; COEFFICIENTS] {
        self.coeffs
    }

    /// Coefficients packed the way the dewarp stage's `u_lens_profile` expects them.
    pub fn as_vec4(&self) -> Vec4 {
        Vec4::from_array(self.coeffs)
    }

    pub fn radius(&self, theta: f32) -> f32 {
        let [c0, c1, c2, c3] = self.coeffs;
        let t2 = theta * theta;
        let t3 = t2 * theta;
        let t4 = t3 * theta;
        c0 * t4 + c1 * t3 + c2 * t2 + c3 * theta
    }
}

impl From<Vec<f32>> for LensProfile {
    fn from(v: Vec<f32>) -> Self {
        Self::from_coefficients(&v)
    }
}

impl From<LensProfile> for Vec<f32> {
    fn from(p: LensProfile) -> Self {
        p.coeffs.to_vec()
    }
}
