//! Business logic services.

pub mod admission;
