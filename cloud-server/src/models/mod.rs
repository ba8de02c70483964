//! Data models

pub mod analysis;
pub mod request;

pub use analysis::*;
pub use request::*;
