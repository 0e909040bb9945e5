use glam::{Vec2, Vec3};

use crate::{LensProfile, MountMode};

/// Unit vector for polar angle `theta` (from the optical axis) and azimuth `lambda`.
///
/// `z` is folded to the front hemisphere, matching the shader.
pub fn spherical_to_cartesian(theta: f32, lambda: f32) -> Vec3 {
    Vec3::new(
        theta.sin() * lambda.cos(),
        theta.sin() * lambda.sin(),
        theta.cos().abs(),
    )
}

/// Returns `(theta, lambda)`.
pub fn cartesian_to_spherical(c: Vec3) -> Vec2 {
    Vec2::new(c.z.min(1.0).acos(), c.y.atan2(c.x))
}

/// Rotate a view ray by `rotation`: about X, then about Y, then offset the azimuth by `z`.
///
/// An axis whose component is exactly `0.0` is skipped outright. The X/Y rotations use
/// `|cos|`, so angles past ±π/2 fold back instead of flipping the ray.
pub fn rotate(theta: f32, lambda: f32, rotation: Vec3) -> Vec2 {
    let mut c = spherical_to_cartesian(theta, lambda);
    let abscos = Vec2::new(rotation.x.cos().abs(), rotation.y.cos().abs());

    if rotation.x != 0.0 {
        let s = rotation.x.sin();
        let (y, z) = (c.y * abscos.x + c.z * s, c.z * abscos.x - c.y * s);
        c.y = y;
        c.z = z;
    }

    if rotation.y != 0.0 {
        let s = rotation.y.sin();
        let (x, z) = (c.x * abscos.y + c.z * s, c.z * abscos.y - c.x * s);
        c.x = x;
        c.z = z;
    }

    let mut sph = cartesian_to_spherical(c);
    sph.y += rotation.z;
    sph
}

/// Everything the dewarp stage needs to map one output pixel to a source texel.
///
/// Field names match the stage's uniforms one to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DewarpParams {
    pub profile: LensProfile,
    pub rotation: Vec3,
    pub tan_half_fov: f32,
    pub lambda_offset: f32,
    /// Working buffer size in pixels (width, height).
    pub video_size: Vec2,
}

impl DewarpParams {
    pub fn new(profile: LensProfile, mount: MountMode, rotation: Vec3, fov: f32, size: Vec2) -> Self {
        Self {
            profile,
            rotation,
            tan_half_fov: (fov * 0.5).tan(),
            lambda_offset: mount.lambda_offset(),
            video_size: size,
        }
    }

    /// `(theta, lambda)` of the ray through output coordinate `uv` before rotation.
    pub fn view_ray(&self, uv: Vec2) -> Vec2 {
        let sep = (uv - Vec2::splat(0.5)) * self.video_size.x;
        let theta = (sep.length() / (self.video_size.y * 0.5) * self.tan_half_fov).atan();
        let lambda = self.lambda_offset - sep.y.atan2(-sep.x);
        Vec2::new(theta, lambda)
    }

    /// Source coordinate for a rotated ray. Not bounds-checked.
    pub fn sample_coordinate(&self, theta: f32, lambda: f32) -> Vec2 {
        let r = self.profile.radius(theta);
        Vec2::new(
            0.5 + r * lambda.cos() / self.video_size.x,
            0.5 + r * lambda.sin() / self.video_size.y,
        )
    }

    /// Source texture coordinate for output `uv`, or `None` when the ray lands outside
    /// `[0, 1)` on either axis. Callers render `None` as opaque black.
    pub fn source_uv(&self, uv: Vec2) -> Option<Vec2> {
        let ray = self.view_ray(uv);
        let rotated = rotate(ray.x, ray.y, self.rotation);
        let tab = self.sample_coordinate(rotated.x, -rotated.y);
        let inside = |t: f32| (0.0..1.0).contains(&t);
        (inside(tab.x) && inside(tab.y)).then_some(tab)
    }
}
