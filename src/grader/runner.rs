//! Grader - Orchestrates one grading run
//!
//! validate -> workspace -> compile -> run -> classify -> cleanup

use std::path::PathBuf;
use std::time::Instant;

use tracing::Instrument;

use crate::config::GraderConfig;
use crate::error::GraderResult;
use crate::models::{GradingResult, SubmissionRequest};

use super::classifier::ResultClassifier;
use super::compiler::{CompileResult, SourceCompiler};
use super::sandbox::{ExecutionLimits, SandboxedExecutor};
use super::workspace::Workspace;

/// Grading engine. Cheap to clone; concurrent calls share no mutable state.
#[derive(Debug, Clone)]
pub struct Grader {
    compiler: SourceCompiler,
    executor: SandboxedExecutor,
    classifier: ResultClassifier,
    work_dir: PathBuf,
}

impl Grader {
    /// Create a new grader
    pub fn new(config: GraderConfig) -> Self {
        Self {
            executor: SandboxedExecutor::new(ExecutionLimits::from(&config.execution)),
            compiler: SourceCompiler::new(config.compiler),
            classifier: ResultClassifier::default(),
            work_dir: config.storage.work_dir,
        }
    }

    pub fn compiler(&self) -> &SourceCompiler {
        &self.compiler
    }

    /// Grade a single submission.
    ///
    /// Every grading outcome comes back as `Ok`; `Err` means the grading
    /// environment itself is broken (missing toolchain, spawn failure...).
    pub async fn grade(&self, request: &SubmissionRequest) -> GraderResult<GradingResult> {
        let span = tracing::info_span!(
            "grade",
            submission_id = %request.id(),
            language = %request.language()
        );
        self.grade_inner(request).instrument(span).await
    }

    async fn grade_inner(&self, request: &SubmissionRequest) -> GraderResult<GradingResult> {
        let started = Instant::now();
        request.validate()?;

        let workspace = Workspace::create(&self.work_dir, request.id())?;
        let result = self.compile_and_run(&workspace, request).await;
        workspace.close();

        match &result {
            Ok(graded) => tracing::info!(
                status = %graded.status(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Submission graded"
            ),
            Err(e) => tracing::error!(
                error = %e,
                code = e.error_code(),
                "Grading failed"
            ),
        }

        result
    }

    async fn compile_and_run(
        &self,
        workspace: &Workspace,
        request: &SubmissionRequest,
    ) -> GraderResult<GradingResult> {
        let artifact = match self
            .compiler
            .compile(workspace, request.source_code(), request.language())
            .await?
        {
            CompileResult::Compiled(artifact) => artifact,
            CompileResult::Failed(error) => {
                return Ok(self.classifier.classify_compile_error(request.id(), error));
            }
        };

        let outcome = self.executor.run(&artifact, request.input()).await?;
        let usage = outcome.usage();
        tracing::debug!(
            wall_time_ms = usage.wall_time_ms,
            peak_memory_kb = usage.peak_memory_kb,
            "Run finished"
        );

        Ok(self
            .classifier
            .classify_execution(request.id(), outcome, request.expected_output()))
    }
}

impl Default for Grader {
    fn default() -> Self {
        Self::new(GraderConfig::default())
    }
}
