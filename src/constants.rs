//! Application-wide constants
//!
//! This module contains all constant values used by the grading engine.
//! Constants are grouped by their purpose for better organization.

// =============================================================================
// EXECUTION DEFAULTS
// =============================================================================

/// Default wall-clock time limit in milliseconds
pub const DEFAULT_TIME_LIMIT_MS: u64 = 2000;

/// Default memory ceiling in megabytes
pub const DEFAULT_MEMORY_LIMIT_MB: u64 = 256;

/// Default interval between two resident memory samples, in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 20;

/// Default cap on captured stdout/stderr, per stream (64 MB)
pub const DEFAULT_OUTPUT_LIMIT_BYTES: u64 = 64 * 1024 * 1024;

/// Multiplier applied to the memory ceiling for an optional hard address space
/// rlimit. Zero (the default) disables it: an allocation refused by the rlimit
/// makes the program crash instead of showing up as memory use.
pub const DEFAULT_ADDRESS_SPACE_FACTOR: u64 = 0;

/// Least time granted to read the rest of the output after a natural exit
pub const MIN_OUTPUT_DRAIN_MS: u64 = 50;

/// Minimum accepted poll interval in milliseconds
pub const MIN_POLL_INTERVAL_MS: u64 = 1;

// =============================================================================
// COMPILATION DEFAULTS
// =============================================================================

/// Default upper bound on a single compiler invocation, in milliseconds
pub const DEFAULT_COMPILE_TIMEOUT_MS: u64 = 10_000;

/// Default C compiler
pub const DEFAULT_C_COMPILER: &str = "gcc";

/// Default C++ compiler
pub const DEFAULT_CPP_COMPILER: &str = "g++";

/// Prefix of every per-request working directory
pub const WORKSPACE_PREFIX: &str = "gradebox-";

// =============================================================================
// SUPPORTED LANGUAGES
// =============================================================================

/// Language identifiers
pub mod languages {
    pub const C: &str = "c";
    pub const CPP: &str = "cpp";

    /// All supported language identifiers
    pub const ALL: &[&str] = &[C, CPP];
}

/// File extensions for each language
pub mod file_extensions {
    pub const C: &str = "c";
    pub const CPP: &str = "cpp";
}

// =============================================================================
// GRADING STATUSES
// =============================================================================

/// Grading status identifiers
pub mod statuses {
    pub const SUCCESS: &str = "SUCCESS";
    pub const COMPILE_ERROR: &str = "COMPILE_ERROR";
    pub const RUNTIME_ERROR: &str = "RUNTIME_ERROR";
    pub const WRONG_ANSWER: &str = "WRONG_ANSWER";
    pub const TIMED_OUT: &str = "TIMED_OUT";
    pub const MEMORY_EXCEEDED: &str = "MEMORY_EXCEEDED";
}

/// Fixed explanatory messages attached to failing results
pub mod messages {
    pub const TIME_LIMIT_EXCEEDED: &str = "Time limit exceeded.";
    pub const MEMORY_LIMIT_EXCEEDED: &str = "Memory limit exceeded.";
    pub const WRONG_OUTPUT: &str = "Wrong output";
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Maximum source code size in bytes (1 MB)
pub const MAX_SOURCE_CODE_SIZE: usize = 1024 * 1024;

/// Maximum input payload size in bytes (10 MB)
pub const MAX_TEST_CASE_INPUT_SIZE: usize = 10 * 1024 * 1024;

/// Maximum expected output size in bytes (10 MB)
pub const MAX_TEST_CASE_OUTPUT_SIZE: usize = 10 * 1024 * 1024;
