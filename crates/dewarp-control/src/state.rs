use std::cell::RefCell;
use std::f32::consts::FRAC_PI_2;
use std::rc::Rc;

use dewarp_core::EngineError;
use glam::Vec3;

/// Virtual camera orientation: rotation vector (radians) and vertical field of view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationState {
    pub rotation: Vec3,
    pub fov: f32,
}

impl Default for OrientationState {
    fn default() -> Self {
        Self {
            rotation: Vec3::new(0.0, FRAC_PI_2, 0.0),
            fov: FRAC_PI_2,
        }
    }
}

/// Inclusive FOV range in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FovBounds {
    min: f32,
    max: f32,
}

impl FovBounds {
    /// Largest max any profile may configure.
    pub const CEILING_DEG: f32 = 720.0;

    pub fn from_degrees(min_deg: f32, max_deg: f32) -> Result<Self, EngineError> {
        if !(min_deg.is_finite() && max_deg.is_finite()) || min_deg <= 0.0 || min_deg > max_deg {
            return Err(EngineError::invalid_config(format!(
                "fov bounds must satisfy 0 < min <= max (got {min_deg}..{max_deg})"
            )));
        }
        if max_deg > Self::CEILING_DEG {
            return Err(EngineError::invalid_config(format!(
                "max fov {max_deg} exceeds {}",
                Self::CEILING_DEG
            )));
        }
        Ok(Self {
            min: min_deg.to_radians(),
            max: max_deg.to_radians(),
        })
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    /// NaN collapses to `min`.
    pub fn clamp(&self, fov: f32) -> f32 {
        if fov.is_nan() {
            return self.min;
        }
        fov.clamp(self.min, self.max)
    }
}

impl Default for FovBounds {
    fn default() -> Self {
        Self {
            min: 2f32.to_radians(),
            max: 90f32.to_radians(),
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: OrientationState,
    bounds: FovBounds,
}

/// Shared handle to the orientation. Clones refer to the same state.
///
/// Every FOV write goes through the bounds, so the stored value is always in range.
#[derive(Debug, Clone)]
pub struct SharedOrientation {
    inner: Rc<RefCell<Shared>>,
}

impl SharedOrientation {
    pub fn new(initial: OrientationState, bounds: FovBounds) -> Self {
        let state = OrientationState {
            fov: bounds.clamp(initial.fov),
            ..initial
        };
        Self {
            inner: Rc::new(RefCell::new(Shared { state, bounds })),
        }
    }

    /// Copy of the current state. The render graph takes one per tick.
    pub fn snapshot(&self) -> OrientationState {
        self.inner.borrow().state
    }

    pub fn bounds(&self) -> FovBounds {
        self.inner.borrow().bounds
    }

    /// Returns the value actually stored.
    pub fn set_fov(&self, fov: f32) -> f32 {
        let mut s = self.inner.borrow_mut();
        s.state.fov = s.bounds.clamp(fov);
        s.state.fov
    }

    pub fn set_rotation(&self, rotation: Vec3) {
        self.inner.borrow_mut().state.rotation = rotation;
    }

    pub fn apply_rotation_delta(&self, delta: Vec3) {
        self.inner.borrow_mut().state.rotation += delta;
    }
}
