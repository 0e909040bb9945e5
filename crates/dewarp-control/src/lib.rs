#![forbid(unsafe_code)]

//! Interactive virtual PTZ control.
//!
//! The controller is the only writer of [`OrientationState`]; the render graph holds a
//! [`SharedOrientation`] handle and snapshots it once per tick. Gestures (drag, click
//! recenter, wheel zoom) are short tasks advanced from the host's frame callback, each
//! owning a [`CancelToken`] derived from the controller's lifetime.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

mod config;
mod controller;
mod state;
mod tasks;

pub use config::PtzConfig;
pub use controller::PtzController;
pub use state::{FovBounds, OrientationState, SharedOrientation};
pub use tasks::CancelToken;
