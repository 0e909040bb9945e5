//! Backend-agnostic contract tests for the dewarp pipeline.
//!
//! Everything runs on [`SoftGpu`], a CPU stand-in for a GL context, so the full render
//! graph (compile, sample, reproject, post chain, present) is exercised without a window.
#![deny(missing_debug_implementations)]

pub mod soft_gpu;

pub use soft_gpu::{DrawRecord, SoftGpu, UploadRecord};

#[cfg(test)]
mod support;

#[cfg(test)]
mod lifecycle;

#[cfg(test)]
mod rendering;

#[cfg(test)]
mod sampling;

#[cfg(test)]
mod facade;
