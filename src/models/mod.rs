//! Domain models
//!
//! Requests handed to the grading engine and the records it hands back.

pub mod grading;
pub mod submission;

pub use grading::*;
pub use submission::*;
