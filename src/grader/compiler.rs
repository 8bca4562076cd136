//! Compilation of submitted source into an executable artifact.
//!
//! The toolchain is picked by language and run as a plain child process
//! inside the request's [`Workspace`]. Diagnostics come from the compiler's
//! stderr only. A single compiler invocation is bounded by the configured
//! compile timeout; the run's time and memory limits do not apply here.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use anyhow::anyhow;
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::fs;
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::CompilerConfig;
use crate::error::{GraderError, GraderResult};
use crate::models::Language;

use super::languages::LanguageHandler;
use super::workspace::Workspace;

/// Executable produced by a successful compilation.
///
/// Borrowed from the workspace it lives in, so it can never outlive the
/// directory that gets cleaned up at the end of the run.
#[derive(Debug)]
pub struct CompiledArtifact<'ws> {
    path: PathBuf,
    language: Language,
    _workspace: PhantomData<&'ws Workspace>,
}

impl CompiledArtifact<'_> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

/// Toolchain rejected the submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// Diagnostic text, never empty
    pub diagnostics: String,
}

/// Outcome of a compiler invocation
#[derive(Debug)]
pub enum CompileResult<'ws> {
    Compiled(CompiledArtifact<'ws>),
    Failed(CompileError),
}

/// Compiler handles the compilation of submissions.
#[derive(Debug, Clone)]
pub struct SourceCompiler {
    config: CompilerConfig,
}

impl SourceCompiler {
    /// Create a new compiler with the given configuration.
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// Resolve the toolchain for `language`, failing if it is not installed
    pub fn check_environment(&self, language: Language) -> GraderResult<PathBuf> {
        let handler = LanguageHandler::for_language(language, &self.config);
        which::which(handler.compiler()).map_err(|e| {
            GraderError::ToolchainMissing(format!("{} ({})", handler.compiler(), e))
        })
    }

    /// Compile `source` inside `workspace`.
    ///
    /// Only environment faults are returned as `Err`; a rejected source is
    /// `Ok(CompileResult::Failed)`.
    pub async fn compile<'ws>(
        &self,
        workspace: &'ws Workspace,
        source: &str,
        language: Language,
    ) -> GraderResult<CompileResult<'ws>> {
        let handler = LanguageHandler::for_language(language, &self.config);
        let compiler_path = self.check_environment(language)?;

        let source_path = workspace.file(handler.source_file());
        let artifact_path = workspace.file(handler.executable());

        fs::write(&source_path, source)
            .await
            .map_err(|source| GraderError::Workspace {
                path: source_path.clone(),
                source,
            })?;

        tracing::debug!(
            submission_id = %workspace.submission_id(),
            compiler = %compiler_path.display(),
            language = %language,
            "Compiling submission"
        );

        let started = Instant::now();
        let child = Command::new(&compiler_path)
            .args(handler.compile_args(&source_path, &artifact_path))
            .current_dir(workspace.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| GraderError::Spawn {
                program: handler.compiler().to_string(),
                source,
            })?;

        let group = child.id().map(|pid| Pid::from_raw(pid as i32));
        let compile_timeout = self.config.compile_timeout();
        let output = match timeout(compile_timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                // Dropping the wait future kills the driver; its cc1/as/ld go with the group.
                if let Some(group) = group {
                    match killpg(group, Signal::SIGKILL) {
                        Ok(()) | Err(Errno::ESRCH) => {}
                        Err(e) => tracing::warn!(error = %e, "Failed to kill compiler process group"),
                    }
                }
                tracing::warn!(
                    submission_id = %workspace.submission_id(),
                    timeout_ms = compile_timeout.as_millis() as u64,
                    "Compilation timed out"
                );
                return Ok(CompileResult::Failed(CompileError {
                    diagnostics: format!(
                        "compilation timed out after {} ms",
                        compile_timeout.as_millis()
                    ),
                }));
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !output.status.success() {
            let mut diagnostics = String::from_utf8_lossy(&output.stderr).into_owned();
            if diagnostics.trim().is_empty() {
                diagnostics = match output.status.code() {
                    Some(code) => format!("compiler exited with status {}", code),
                    None => "compiler was terminated by a signal".to_string(),
                };
            }

            tracing::info!(
                submission_id = %workspace.submission_id(),
                elapsed_ms,
                "Compilation failed"
            );
            return Ok(CompileResult::Failed(CompileError { diagnostics }));
        }

        if !fs::try_exists(&artifact_path).await.unwrap_or(false) {
            return Err(GraderError::Internal(anyhow!(
                "{} reported success but produced no executable at {}",
                handler.compiler(),
                artifact_path.display()
            )));
        }

        tracing::debug!(
            submission_id = %workspace.submission_id(),
            elapsed_ms,
            artifact = %artifact_path.display(),
            "Compilation succeeded"
        );

        Ok(CompileResult::Compiled(CompiledArtifact {
            path: artifact_path,
            language,
            _workspace: PhantomData,
        }))
    }
}
