//! HTTP handlers, one module per resource.

pub mod generation;
pub mod health;
pub mod tasks;
pub mod uploads;
