//! HTTP handlers.

pub mod health;
pub mod remove;

pub use health::{health, ready, status};
pub use remove::remove_background;
