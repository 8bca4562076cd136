//! Gradebox - Submission Grading Engine
//!
//! This library grades a single untrusted C or C++ submission: it compiles
//! the source, runs the executable under a wall-clock time limit and a
//! resident memory ceiling, and classifies the result against an expected
//! answer.
//!
//! # Features
//!
//! - Two fixed toolchains (`gcc` for C, `g++` for C++)
//! - Exit / memory / timeout race with guaranteed process teardown
//! - Isolated per-request working directories, removed on every exit path
//! - Six mutually exclusive terminal statuses
//!
//! # Example
//!
//! ```no_run
//! use gradebox::{Grader, GraderConfig, Language, SubmissionRequest};
//!
//! # async fn demo() -> gradebox::GraderResult<()> {
//! let grader = Grader::new(GraderConfig::default());
//! let request = SubmissionRequest::new(
//!     "#include <stdio.h>\nint main(void){printf(\"hello\");return 0;}",
//!     Language::C,
//!     "",
//!     "hello",
//! );
//! let result = grader.grade(&request).await?;
//! assert!(result.status().is_success());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod grader;
pub mod models;

// Re-export commonly used types
pub use config::GraderConfig;
pub use error::{GraderError, GraderResult};
pub use grader::Grader;
pub use models::{ExecutionOutcome, GradingResult, GradingStatus, Language, SubmissionRequest};
