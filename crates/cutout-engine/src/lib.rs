//! Client for the external background-removal engine.
//!
//! The engine is an rembg-compatible HTTP service: it accepts an image and
//! returns the same image with the background removed, as PNG bytes. The
//! model itself is entirely out of process.

pub mod client;
pub mod error;

pub use client::{EngineClient, EngineConfig};
pub use error::{EngineError, EngineResult};
