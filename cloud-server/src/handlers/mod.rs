//! HTTP handlers

pub mod health;
pub mod analyze;
pub mod jobs;
pub mod analyses;
