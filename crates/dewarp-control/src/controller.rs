use std::time::{Duration, Instant};

use dewarp_core::EngineError;
use dewarp_lens::MountMode;
use glam::{Vec2, Vec3};

use crate::{CancelToken, OrientationState, PtzConfig, SharedOrientation};

#[derive(Debug)]
struct Task<T> {
    token: CancelToken,
    value: T,
}

#[derive(Debug, Clone, Copy)]
struct Press {
    at: Instant,
}

#[derive(Debug)]
struct WheelBatch {
    sum: f32,
    events: u32,
    deadline: Instant,
    token: CancelToken,
}

/// Pointer/wheel gestures → orientation updates.
///
/// Input handlers only record intent; [`PtzController::advance`] applies it once per
/// frame. Positions are viewport pixels with the origin top-left.
#[derive(Debug)]
pub struct PtzController {
    cfg: PtzConfig,
    mount: MountMode,
    orientation: SharedOrientation,
    lifetime: CancelToken,
    viewport: Vec2,

    press: Option<Press>,
    /// Angular velocity (radians per tick) on rotation x/y.
    drag: Option<Task<Vec2>>,
    /// Remaining click offset from the viewport center, in pixels.
    recenter: Option<Task<Vec2>>,
    wheel: Option<WheelBatch>,
    /// Target FOV being eased toward.
    zoom: Option<Task<f32>>,

    target_fov: f32,
    target_updates: u64,
    /// FOV the zoom easing last stored; any other value means someone else wrote it.
    eased_to: Option<f32>,
}

impl PtzController {
    pub fn new(cfg: PtzConfig, mount: MountMode) -> Result<Self, EngineError> {
        cfg.validate()?;
        let orientation = SharedOrientation::new(OrientationState::default(), cfg.fov_bounds()?);
        let target_fov = orientation.snapshot().fov;
        Ok(Self {
            cfg,
            mount,
            orientation,
            lifetime: CancelToken::new(),
            viewport: Vec2::ONE,
            press: None,
            drag: None,
            recenter: None,
            wheel: None,
            zoom: None,
            target_fov,
            target_updates: 0,
            eased_to: None,
        })
    }

    /// Handle for the render graph. Reads only.
    pub fn orientation(&self) -> SharedOrientation {
        self.orientation.clone()
    }

    pub fn lifetime_token(&self) -> CancelToken {
        self.lifetime.clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.lifetime.is_cancelled()
    }

    pub fn target_fov(&self) -> f32 {
        self.target_fov
    }

    /// Number of wheel batches flushed into a new target.
    pub fn target_updates(&self) -> u64 {
        self.target_updates
    }

    /// True when no gesture task is pending.
    pub fn is_idle(&self) -> bool {
        self.drag.is_none() && self.recenter.is_none() && self.wheel.is_none() && self.zoom.is_none()
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport = Vec2::new(width.max(1.0), height.max(1.0));
    }

    // ---- pointer ----

    pub fn pointer_down(&mut self, pos: Vec2, now: Instant) {
        if self.is_shut_down() {
            return;
        }
        if let Some(t) = self.recenter.take() {
            t.token.cancel();
        }
        self.press = Some(Press { at: now });
        let velocity = self.drag_velocity(pos);
        self.replace_drag(velocity);
    }

    pub fn pointer_move(&mut self, pos: Vec2) {
        let velocity = self.drag_velocity(pos);
        if let Some(drag) = self.drag.as_mut() {
            drag.value = velocity;
        }
    }

    /// Ends the drag. A press shorter than `click_max_ms` starts a recenter on `pos`.
    pub fn pointer_up(&mut self, pos: Vec2, now: Instant) {
        self.end_drag();
        let Some(press) = self.press.take() else {
            return;
        };
        if self.is_shut_down() {
            return;
        }
        let held = now.saturating_duration_since(press.at);
        if held < Duration::from_millis(self.cfg.click_max_ms) {
            let offset = pos - self.viewport * 0.5;
            if offset.length() >= self.cfg.recenter_threshold_px {
                tracing::debug!(?offset, held_ms = held.as_millis() as u64, "click recenter");
                self.recenter = Some(Task {
                    token: self.lifetime.child(),
                    value: offset,
                });
            }
        }
    }

    pub fn pointer_leave(&mut self) {
        self.end_drag();
        self.press = None;
    }

    // ---- wheel ----

    /// Accumulate a wheel delta (positive zooms in). Every event re-arms the window, so a
    /// scroll flushes once it has been quiet for `wheel_window_ms`.
    pub fn wheel(&mut self, delta: f32, now: Instant) {
        if self.is_shut_down() || !delta.is_finite() {
            return;
        }
        let deadline = now + Duration::from_millis(self.cfg.wheel_window_ms);
        let batch = self.wheel.get_or_insert_with(|| WheelBatch {
            sum: 0.0,
            events: 0,
            deadline,
            token: self.lifetime.child(),
        });
        batch.sum += delta;
        batch.events += 1;
        batch.deadline = deadline;
    }

    // ---- direct overrides ----

    /// Point the camera at `pan`/`tilt` through the mount mapping, with optional roll
    /// added to the azimuth offset. Cancels drag and recenter.
    pub fn set_ptz(&mut self, pan: f32, tilt: f32, roll: Option<f32>) {
        let mut rotation = self.mount.rotation_for(pan, tilt);
        rotation.z += roll.unwrap_or(0.0);
        self.set_rotation(rotation);
    }

    /// Raw rotation vector, bypassing the mount mapping.
    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.end_drag();
        if let Some(t) = self.recenter.take() {
            t.token.cancel();
        }
        self.orientation.set_rotation(rotation);
    }

    /// Immediate FOV change; pending zoom easing and wheel input are discarded.
    pub fn set_fov(&mut self, fov: f32) -> f32 {
        self.cancel_zoom();
        let stored = self.orientation.set_fov(fov);
        self.target_fov = stored;
        stored
    }

    /// Cancel every in-flight gesture. The controller stays usable.
    pub fn stop(&mut self) {
        self.end_drag();
        if let Some(t) = self.recenter.take() {
            t.token.cancel();
        }
        self.cancel_zoom();
        self.press = None;
    }

    /// Cancel the lifetime token; all current and future gestures are inert.
    pub fn shutdown(&mut self) {
        if !self.is_shut_down() {
            tracing::info!("ptz controller shut down");
        }
        self.lifetime.cancel();
        self.stop();
    }

    // ---- per-frame ----

    /// Apply one tick of every live gesture. Returns whether the orientation changed.
    pub fn advance(&mut self, now: Instant) -> bool {
        self.reap_cancelled();
        if self.is_shut_down() {
            return false;
        }

        let mut changed = false;

        if self.wheel.as_ref().is_some_and(|b| now >= b.deadline) {
            if let Some(batch) = self.wheel.take() {
                self.flush_wheel(batch);
            }
        }

        if let Some(drag) = &self.drag {
            if drag.value != Vec2::ZERO {
                self.orientation
                    .apply_rotation_delta(Vec3::new(drag.value.x, drag.value.y, 0.0));
                changed = true;
            }
        }

        if let Some(mut task) = self.recenter.take() {
            let keep = self.cfg.recenter_factor;
            let consumed = task.value * (1.0 - keep);
            task.value *= keep;
            let angle = consumed * self.orientation.snapshot().fov / self.viewport.y;
            self.orientation
                .apply_rotation_delta(Vec3::new(angle.x, angle.y, 0.0));
            changed = true;
            if task.value.length() >= self.cfg.recenter_threshold_px {
                self.recenter = Some(task);
            }
        }

        if let Some(task) = self.zoom.take() {
            let fov = self.orientation.snapshot().fov;
            if self.eased_to.is_some_and(|last| last != fov) {
                tracing::debug!(fov_deg = fov.to_degrees(), "zoom easing overridden");
                task.token.cancel();
                self.target_fov = fov;
                self.eased_to = None;
            } else {
                let diff = task.value - fov;
                let step = self.cfg.fov_step_deg.to_radians();
                let eps = self.cfg.fov_epsilon_deg.to_radians();
                if diff.abs() <= step.max(eps) {
                    self.orientation.set_fov(task.value);
                    self.eased_to = None;
                } else {
                    self.eased_to = Some(self.orientation.set_fov(fov + step.copysign(diff)));
                    self.zoom = Some(task);
                }
                changed = true;
            }
        }

        changed
    }

    fn flush_wheel(&mut self, batch: WheelBatch) {
        if batch.token.is_cancelled() {
            return;
        }
        let fov = self.orientation.snapshot().fov;
        let factor = self.cfg.zoom_factor.powf(batch.sum.abs() / self.cfg.wheel_notch);
        let raw = if batch.sum > 0.0 {
            fov / factor
        } else {
            fov * factor
        };
        let target = self.orientation.bounds().clamp(raw);

        self.target_fov = target;
        self.target_updates += 1;
        tracing::debug!(
            sum = batch.sum,
            events = batch.events,
            target_deg = target.to_degrees(),
            "wheel batch flushed"
        );

        if let Some(t) = self.zoom.take() {
            t.token.cancel();
        }
        self.eased_to = None;
        self.zoom = Some(Task {
            token: self.lifetime.child(),
            value: target,
        });
    }

    fn drag_velocity(&self, pos: Vec2) -> Vec2 {
        let offset = pos - self.viewport * 0.5;
        let fov = self.orientation.snapshot().fov;
        let degrees = offset * self.cfg.drag_gain * fov / self.viewport.y;
        degrees * std::f32::consts::PI / 180.0
    }

    fn replace_drag(&mut self, velocity: Vec2) {
        self.end_drag();
        self.drag = Some(Task {
            token: self.lifetime.child(),
            value: velocity,
        });
    }

    fn end_drag(&mut self) {
        if let Some(t) = self.drag.take() {
            t.token.cancel();
        }
    }

    fn cancel_zoom(&mut self) {
        self.eased_to = None;
        if let Some(t) = self.zoom.take() {
            t.token.cancel();
        }
        if let Some(b) = self.wheel.take() {
            b.token.cancel();
        }
    }

    fn reap_cancelled(&mut self) {
        if self.drag.as_ref().is_some_and(|t| t.token.is_cancelled()) {
            self.drag = None;
        }
        if self.recenter.as_ref().is_some_and(|t| t.token.is_cancelled()) {
            self.recenter = None;
        }
        if self.zoom.as_ref().is_some_and(|t| t.token.is_cancelled()) {
            self.zoom = None;
        }
        if self.wheel.as_ref().is_some_and(|b| b.token.is_cancelled()) {
            self.wheel = None;
        }
    }
}

impl Drop for PtzController {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}
