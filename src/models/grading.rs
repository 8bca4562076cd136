//! Grading outcome types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{messages, statuses};

/// Terminal status of a grading run. Exactly one is reached per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GradingStatus {
    /// Output matched the expected answer
    Success,
    /// Toolchain rejected the source
    CompileError,
    /// Program crashed or exited with a non-zero code
    RuntimeError,
    /// Program exited cleanly but its output did not match
    WrongAnswer,
    /// Wall-clock limit hit before the program exited
    TimedOut,
    /// Resident memory went over the ceiling
    MemoryExceeded,
}

impl GradingStatus {
    /// Get status as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => statuses::SUCCESS,
            Self::CompileError => statuses::COMPILE_ERROR,
            Self::RuntimeError => statuses::RUNTIME_ERROR,
            Self::WrongAnswer => statuses::WRONG_ANSWER,
            Self::TimedOut => statuses::TIMED_OUT,
            Self::MemoryExceeded => statuses::MEMORY_EXCEEDED,
        }
    }

    /// Check if this status means the submission passed
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Whether the program produced output worth showing to the caller
    pub fn carries_output(&self) -> bool {
        matches!(self, Self::Success | Self::WrongAnswer)
    }
}

impl std::fmt::Display for GradingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resources observed while the program ran
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// Wall-clock time from spawn to decision, in milliseconds
    pub wall_time_ms: u64,
    /// Highest resident set size sampled, in KB
    pub peak_memory_kb: u64,
}

/// How a program run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The process terminated on its own
    NaturalExit {
        /// Exit code, `None` when the process was killed by a signal
        exit_code: Option<i32>,
        /// Terminating signal, if any
        signal: Option<i32>,
        stdout: String,
        stderr: String,
        usage: ResourceUsage,
    },
    /// The memory watchdog fired first
    MemoryExceeded { usage: ResourceUsage },
    /// The time limit fired first
    TimedOut { usage: ResourceUsage },
}

impl ExecutionOutcome {
    pub fn usage(&self) -> ResourceUsage {
        match self {
            Self::NaturalExit { usage, .. }
            | Self::MemoryExceeded { usage }
            | Self::TimedOut { usage } => *usage,
        }
    }
}

/// Final, immutable record of one grading run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingResult {
    submission_id: Uuid,
    status: GradingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<ResourceUsage>,
    graded_at: DateTime<Utc>,
}

impl GradingResult {
    fn new(
        submission_id: Uuid,
        status: GradingStatus,
        output: Option<String>,
        error: Option<String>,
        usage: Option<ResourceUsage>,
    ) -> Self {
        Self {
            submission_id,
            status,
            output,
            error,
            usage,
            graded_at: Utc::now(),
        }
    }

    /// Create an accepted result
    pub fn success(submission_id: Uuid, output: String, usage: ResourceUsage) -> Self {
        Self::new(submission_id, GradingStatus::Success, Some(output), None, Some(usage))
    }

    /// Create a compilation failure carrying the toolchain diagnostics
    pub fn compile_error(submission_id: Uuid, diagnostics: String) -> Self {
        Self::new(submission_id, GradingStatus::CompileError, None, Some(diagnostics), None)
    }

    /// Create a runtime error result
    pub fn runtime_error(submission_id: Uuid, message: String, usage: ResourceUsage) -> Self {
        Self::new(submission_id, GradingStatus::RuntimeError, None, Some(message), Some(usage))
    }

    /// Create a wrong answer result; the produced output is retained
    pub fn wrong_answer(submission_id: Uuid, output: String, usage: ResourceUsage) -> Self {
        Self::new(
            submission_id,
            GradingStatus::WrongAnswer,
            Some(output),
            Some(messages::WRONG_OUTPUT.to_string()),
            Some(usage),
        )
    }

    /// Create a time limit exceeded result
    pub fn timed_out(submission_id: Uuid, usage: ResourceUsage) -> Self {
        Self::new(
            submission_id,
            GradingStatus::TimedOut,
            None,
            Some(messages::TIME_LIMIT_EXCEEDED.to_string()),
            Some(usage),
        )
    }

    /// Create a memory limit exceeded result
    pub fn memory_exceeded(submission_id: Uuid, usage: ResourceUsage) -> Self {
        Self::new(
            submission_id,
            GradingStatus::MemoryExceeded,
            None,
            Some(messages::MEMORY_LIMIT_EXCEEDED.to_string()),
            Some(usage),
        )
    }

    pub fn submission_id(&self) -> Uuid {
        self.submission_id
    }

    pub fn status(&self) -> GradingStatus {
        self.status
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn usage(&self) -> Option<ResourceUsage> {
        self.usage
    }

    pub fn graded_at(&self) -> DateTime<Utc> {
        self.graded_at
    }
}
