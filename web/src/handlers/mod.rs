//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by concern.

pub mod health;
pub mod logs;
pub mod simulation;
pub mod workers;

// Re-export common handler utilities
pub use health::{health_check, metrics};
