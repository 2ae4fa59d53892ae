//! Shared data models for the cutout backend.
//!
//! This crate provides:
//! - Data-URI decoding/encoding for image payloads
//! - Wire types for the removal endpoint

pub mod data_uri;
pub mod wire;

pub use data_uri::{decode_image, encode_png, is_png, DataUriError};
pub use wire::{RemoveBackgroundRequest, RemoveBackgroundResponse};
