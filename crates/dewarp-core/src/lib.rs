#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

//! Shared error type and config loading for the dewarp crates.

pub mod config;
pub mod error;

pub use config::load_typed_json;
pub use error::{numbered_listing, EngineError};
