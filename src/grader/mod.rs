//! Grading engine
//!
//! One grading run compiles a single C or C++ submission, executes it once
//! against one input under a wall-clock limit and a memory ceiling, and
//! classifies what happened:
//!
//! - [`compiler`]: toolchain selection and invocation
//! - [`sandbox`]: process lifecycle and the exit / memory / timeout race
//! - [`monitor`]: procfs based resident memory watchdog
//! - [`comparator`]: trimmed output comparison
//! - [`classifier`]: mapping onto the terminal statuses
//! - [`workspace`]: per-request scratch directories
//! - [`runner`]: the pipeline tying the above together

pub mod classifier;
pub mod comparator;
pub mod compiler;
pub mod languages;
pub mod monitor;
pub mod runner;
pub mod sandbox;
pub mod workspace;

pub use classifier::ResultClassifier;
pub use comparator::{outputs_match, OutputComparator};
pub use compiler::{CompileError, CompileResult, CompiledArtifact, SourceCompiler};
pub use languages::LanguageHandler;
pub use runner::Grader;
pub use sandbox::{ExecutionLimits, SandboxedExecutor};
pub use workspace::Workspace;
