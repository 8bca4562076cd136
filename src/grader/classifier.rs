//! Maps compile and execution outcomes onto one terminal grading status.

use uuid::Uuid;

use crate::models::{ExecutionOutcome, GradingResult};

use super::comparator::OutputComparator;
use super::compiler::CompileError;

/// Turns pipeline outcomes into a [`GradingResult`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultClassifier {
    comparator: OutputComparator,
}

impl ResultClassifier {
    pub fn classify_compile_error(&self, submission_id: Uuid, error: CompileError) -> GradingResult {
        GradingResult::compile_error(submission_id, error.diagnostics)
    }

    pub fn classify_execution(
        &self,
        submission_id: Uuid,
        outcome: ExecutionOutcome,
        expected_output: &str,
    ) -> GradingResult {
        match outcome {
            ExecutionOutcome::TimedOut { usage } => GradingResult::timed_out(submission_id, usage),
            ExecutionOutcome::MemoryExceeded { usage } => {
                GradingResult::memory_exceeded(submission_id, usage)
            }
            ExecutionOutcome::NaturalExit {
                exit_code: Some(0),
                stdout,
                usage,
                ..
            } => {
                if self.comparator.compare(&stdout, expected_output) {
                    GradingResult::success(submission_id, stdout, usage)
                } else {
                    GradingResult::wrong_answer(submission_id, stdout, usage)
                }
            }
            ExecutionOutcome::NaturalExit {
                exit_code,
                signal,
                stderr,
                usage,
                ..
            } => {
                let message = if !stderr.trim().is_empty() {
                    stderr
                } else if let Some(signal) = signal {
                    format!("process terminated by signal {}", signal)
                } else {
                    format!("process exited with code {}", exit_code.unwrap_or(-1))
                };
                GradingResult::runtime_error(submission_id, message, usage)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GradingStatus, ResourceUsage};

    fn exit(code: Option<i32>, signal: Option<i32>, stdout: &str, stderr: &str) -> ExecutionOutcome {
        ExecutionOutcome::NaturalExit {
            exit_code: code,
            signal,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            usage: ResourceUsage::default(),
        }
    }

    #[test]
    fn test_success_and_trim_equivalence() {
        let classifier = ResultClassifier::default();
        let id = Uuid::new_v4();

        let result = classifier.classify_execution(id, exit(Some(0), None, "hello", ""), "hello");
        assert_eq!(result.status(), GradingStatus::Success);
        assert_eq!(result.output(), Some("hello"));
        assert_eq!(result.submission_id(), id);

        let result = classifier.classify_execution(id, exit(Some(0), None, "hello\n\n", ""), "  hello");
        assert_eq!(result.status(), GradingStatus::Success);
    }

    #[test]
    fn test_mismatch_is_wrong_answer() {
        let classifier = ResultClassifier::default();
        let result =
            classifier.classify_execution(Uuid::new_v4(), exit(Some(0), None, "6", ""), "4");
        assert_eq!(result.status(), GradingStatus::WrongAnswer);
        assert_eq!(result.output(), Some("6"));
        assert_eq!(result.error(), Some("Wrong output"));
    }

    #[test]
    fn test_non_zero_exit_is_runtime_error() {
        let classifier = ResultClassifier::default();
        let id = Uuid::new_v4();

        let result = classifier.classify_execution(id, exit(Some(1), None, "hello", "boom"), "hello");
        assert_eq!(result.status(), GradingStatus::RuntimeError);
        assert_eq!(result.error(), Some("boom"));
        assert!(result.output().is_none());

        let result = classifier.classify_execution(id, exit(Some(3), None, "", ""), "");
        assert_eq!(result.error(), Some("process exited with code 3"));

        let result = classifier.classify_execution(id, exit(None, Some(11), "", ""), "");
        assert_eq!(result.status(), GradingStatus::RuntimeError);
        assert_eq!(result.error(), Some("process terminated by signal 11"));
    }

    #[test]
    fn test_limits() {
        let classifier = ResultClassifier::default();
        let usage = ResourceUsage {
            wall_time_ms: 2001,
            peak_memory_kb: 1024,
        };

        let result = classifier.classify_execution(
            Uuid::new_v4(),
            ExecutionOutcome::TimedOut { usage },
            "",
        );
        assert_eq!(result.status(), GradingStatus::TimedOut);
        assert_eq!(result.usage(), Some(usage));

        let result = classifier.classify_execution(
            Uuid::new_v4(),
            ExecutionOutcome::MemoryExceeded { usage },
            "",
        );
        assert_eq!(result.status(), GradingStatus::MemoryExceeded);
        assert!(result.output().is_none());
    }

    #[test]
    fn test_compile_error() {
        let classifier = ResultClassifier::default();
        let result = classifier.classify_compile_error(
            Uuid::new_v4(),
            CompileError {
                diagnostics: "main.c:1: error: expected ';'".to_string(),
            },
        );
        assert_eq!(result.status(), GradingStatus::CompileError);
        assert_eq!(result.error(), Some("main.c:1: error: expected ';'"));
    }
}
