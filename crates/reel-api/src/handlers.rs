//! HTTP handlers.

pub mod cloud;
pub mod health;
pub mod imports;
pub mod videos;

pub use health::{health, ready};
