//! Sandboxed executor for compiled submissions
//!
//! A run races three conditions against each other:
//!
//! - the process exiting on its own,
//! - the memory watchdog seeing resident memory above the ceiling,
//! - the wall-clock timer firing.
//!
//! Whichever settles first decides the outcome. The losers are dropped at the
//! decision point, the whole process group is killed and the process is
//! reaped before `run` returns, so a finished run never leaves anything
//! behind. The child is reaped by us (through `wait4`) rather than by tokio so
//! that the kernel's peak RSS accounting is available for programs that blow
//! past the ceiling and exit between two watchdog samples.

use std::io;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use nix::errno::Errno;
use nix::sys::resource::{setrlimit, Resource};
use nix::sys::signal::{killpg, Signal};
use nix::sys::wait::{waitid, waitpid, Id, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStderr, ChildStdin, ChildStdout};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use crate::config::ExecutionConfig;
use crate::constants::MIN_OUTPUT_DRAIN_MS;
use crate::error::{GraderError, GraderResult};
use crate::models::{ExecutionOutcome, ResourceUsage};

use super::compiler::CompiledArtifact;
use super::monitor::MemoryProbe;

/// Bounds applied to one program run
#[derive(Debug, Clone)]
pub struct ExecutionLimits {
    pub time_limit: Duration,
    pub memory_limit_bytes: u64,
    pub poll_interval: Duration,
    pub output_limit_bytes: u64,
    /// Hard `RLIMIT_AS` as a multiple of the memory ceiling, 0 disables it
    pub address_space_factor: u64,
}

impl ExecutionLimits {
    fn address_space_bytes(&self) -> Option<u64> {
        (self.address_space_factor > 0)
            .then(|| self.memory_limit_bytes.saturating_mul(self.address_space_factor))
    }
}

impl From<&ExecutionConfig> for ExecutionLimits {
    fn from(config: &ExecutionConfig) -> Self {
        Self {
            time_limit: config.time_limit(),
            memory_limit_bytes: config.memory_limit_bytes(),
            poll_interval: config.poll_interval(),
            output_limit_bytes: config.output_limit_bytes,
            address_space_factor: config.address_space_factor,
        }
    }
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self::from(&ExecutionConfig::default())
    }
}

/// Which racer settled first
#[derive(Debug)]
enum Race {
    Exited,
    MemoryExceeded(u64),
    TimedOut,
}

/// Runs compiled artifacts under time and memory limits
#[derive(Debug, Clone, Default)]
pub struct SandboxedExecutor {
    limits: ExecutionLimits,
}

impl SandboxedExecutor {
    pub fn new(limits: ExecutionLimits) -> Self {
        Self { limits }
    }

    /// Run `artifact`, feeding it `input` on stdin
    pub async fn run(
        &self,
        artifact: &CompiledArtifact<'_>,
        input: &str,
    ) -> GraderResult<ExecutionOutcome> {
        self.run_program(artifact.path(), &[], input).await
    }

    async fn run_program(
        &self,
        program: &Path,
        args: &[&str],
        input: &str,
    ) -> GraderResult<ExecutionOutcome> {
        let mut command = Command::new(program);
        command
            .args(args)
            .env_clear()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);
        if let Some(dir) = program.parent() {
            command.current_dir(dir);
        }
        if let Some(bytes) = self.limits.address_space_bytes() {
            // SAFETY: the hook only performs the setrlimit syscall, which is
            // async-signal-safe and touches no parent state.
            unsafe {
                command.pre_exec(move || {
                    setrlimit(Resource::RLIMIT_AS, bytes, bytes).map_err(io::Error::from)
                });
            }
        }

        let mut child = command.spawn().map_err(|source| GraderError::Spawn {
            program: program.display().to_string(),
            source,
        })?;
        let started = Instant::now();
        let mut guard = ChildGuard::new(child.id());

        let stdin = ChildStdin::from_std(take_pipe(child.stdin.take(), "stdin")?)?;
        let stdout = ChildStdout::from_std(take_pipe(child.stdout.take(), "stdout")?)?;
        let stderr = ChildStderr::from_std(take_pipe(child.stderr.take(), "stderr")?)?;

        let writer = tokio::spawn(feed_input(stdin, input.to_owned()));
        let stdout_reader = tokio::spawn(drain(stdout, self.limits.output_limit_bytes));
        let stderr_reader = tokio::spawn(drain(stderr, self.limits.output_limit_bytes));
        let readers = [stdout_reader.abort_handle(), stderr_reader.abort_handle()];

        let probe = MemoryProbe::new(child.id());
        let exited = guard.exit_signal();

        let race = tokio::select! {
            biased;
            _ = exited => Race::Exited,
            Some(rss_kb) = probe.watch(self.limits.memory_limit_bytes, self.limits.poll_interval) => {
                Race::MemoryExceeded(rss_kb)
            }
            _ = sleep(self.limits.time_limit) => Race::TimedOut,
        };
        let wall_time_ms = started.elapsed().as_millis() as u64;

        // Leftover group members (or the whole program, if it lost the race)
        guard.kill();
        let reaped = guard.reap().await?;
        writer.abort();

        let usage = ResourceUsage {
            wall_time_ms,
            peak_memory_kb: probe.peak_kb().max(reaped.max_rss_kb),
        };

        let over_ceiling = reaped.max_rss_kb.saturating_mul(1024) > self.limits.memory_limit_bytes;
        match race {
            Race::TimedOut => {
                stdout_reader.abort();
                stderr_reader.abort();
                tracing::info!(pid = guard.pid.as_raw(), wall_time_ms, "Time limit exceeded");
                Ok(ExecutionOutcome::TimedOut { usage })
            }
            Race::MemoryExceeded(rss_kb) => {
                stdout_reader.abort();
                stderr_reader.abort();
                tracing::info!(pid = guard.pid.as_raw(), rss_kb, "Memory limit exceeded");
                Ok(ExecutionOutcome::MemoryExceeded { usage })
            }
            Race::Exited if over_ceiling => {
                stdout_reader.abort();
                stderr_reader.abort();
                tracing::info!(
                    pid = guard.pid.as_raw(),
                    max_rss_kb = reaped.max_rss_kb,
                    "Memory limit exceeded between samples"
                );
                Ok(ExecutionOutcome::MemoryExceeded { usage })
            }
            Race::Exited => {
                // A descendant that left the process group can hold the pipes
                // open; the streams must still close within the time limit.
                let remaining = self
                    .limits
                    .time_limit
                    .saturating_sub(started.elapsed())
                    .max(Duration::from_millis(MIN_OUTPUT_DRAIN_MS));
                let streams = timeout(remaining, async {
                    (collect(stdout_reader).await, collect(stderr_reader).await)
                })
                .await;
                let (stdout, stderr) = match streams {
                    Ok((stdout, stderr)) => (stdout?, stderr?),
                    Err(_) => {
                        readers.iter().for_each(|reader| reader.abort());
                        let usage = ResourceUsage {
                            wall_time_ms: started.elapsed().as_millis() as u64,
                            ..usage
                        };
                        tracing::info!(
                            pid = guard.pid.as_raw(),
                            wall_time_ms = usage.wall_time_ms,
                            "Output still open at the time limit"
                        );
                        return Ok(ExecutionOutcome::TimedOut { usage });
                    }
                };
                let (exit_code, signal) = match reaped.status {
                    WaitStatus::Exited(_, code) => (Some(code), None),
                    WaitStatus::Signaled(_, signal, _) => (None, Some(signal as i32)),
                    other => {
                        return Err(GraderError::Internal(anyhow!(
                            "unexpected wait status {:?}",
                            other
                        )));
                    }
                };

                tracing::debug!(
                    pid = guard.pid.as_raw(),
                    ?exit_code,
                    ?signal,
                    wall_time_ms,
                    "Process exited"
                );
                Ok(ExecutionOutcome::NaturalExit {
                    exit_code,
                    signal,
                    stdout,
                    stderr,
                    usage,
                })
            }
        }
    }
}

/// What `wait4` reported for the reaped process
#[derive(Debug)]
struct Reaped {
    status: WaitStatus,
    max_rss_kb: u64,
}

/// Owns the spawned process until it has been reaped.
///
/// Dropping an unreaped guard kills the process group and reaps the leader
/// on a helper thread.
#[derive(Debug)]
struct ChildGuard {
    pid: Pid,
    reaped: bool,
}

impl ChildGuard {
    fn new(pid: u32) -> Self {
        Self {
            pid: Pid::from_raw(pid as i32),
            reaped: false,
        }
    }

    /// SIGKILL the process group. Safe to call any number of times.
    fn kill(&self) {
        match killpg(self.pid, Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => tracing::warn!(pid = self.pid.as_raw(), error = %e, "Failed to kill process group"),
        }
    }

    /// Resolves once the process has terminated, without reaping it
    fn exit_signal(&self) -> JoinHandle<()> {
        let pid = self.pid;
        tokio::task::spawn_blocking(move || {
            while let Err(Errno::EINTR) =
                waitid(Id::Pid(pid), WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT)
            {}
        })
    }

    /// Block (off the runtime) until the process is gone and collect its status
    async fn reap(&mut self) -> GraderResult<Reaped> {
        let pid = self.pid;
        let reaped = tokio::task::spawn_blocking(move || wait4(pid))
            .await
            .map_err(anyhow::Error::from)??;
        self.reaped = true;
        Ok(reaped)
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        self.kill();
        let pid = self.pid;
        std::thread::spawn(move || {
            let _ = waitpid(pid, None);
        });
    }
}

fn wait4(pid: Pid) -> io::Result<Reaped> {
    let mut status: libc::c_int = 0;
    // SAFETY: rusage is plain old data, all-zero is a valid value.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    loop {
        // SAFETY: both out-pointers are valid for writes for the whole call.
        let rc = unsafe { libc::wait4(pid.as_raw(), &mut status, 0, &mut usage) };
        if rc >= 0 {
            break;
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }

    Ok(Reaped {
        status: WaitStatus::from_raw(pid, status).map_err(io::Error::from)?,
        max_rss_kb: usage.ru_maxrss.max(0) as u64,
    })
}

fn take_pipe<T>(pipe: Option<T>, name: &str) -> io::Result<T> {
    pipe.ok_or_else(|| {
        io::Error::new(io::ErrorKind::BrokenPipe, format!("failed to open {}", name))
    })
}

/// Write the whole payload, then close stdin so readers see end-of-input
async fn feed_input(mut stdin: ChildStdin, input: String) {
    if let Err(e) = stdin.write_all(input.as_bytes()).await {
        // A program may legitimately stop reading before the end.
        if e.kind() != io::ErrorKind::BrokenPipe {
            tracing::debug!(error = %e, "Failed to write input");
        }
        return;
    }
    if let Err(e) = stdin.flush().await {
        tracing::debug!(error = %e, "Failed to flush input");
    }
    drop(stdin);
}

/// Read a stream to the end, keeping at most `limit` bytes
async fn drain<R: AsyncRead + Unpin>(mut reader: R, limit: u64) -> io::Result<Vec<u8>> {
    let mut captured = Vec::new();
    (&mut reader).take(limit).read_to_end(&mut captured).await?;
    tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok(captured)
}

async fn collect(reader: JoinHandle<io::Result<Vec<u8>>>) -> GraderResult<String> {
    let bytes = reader.await.map_err(anyhow::Error::from)??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str) -> Option<std::path::PathBuf> {
        which::which(name).ok()
    }

    fn limits(time_limit_ms: u64) -> ExecutionLimits {
        ExecutionLimits {
            time_limit: Duration::from_millis(time_limit_ms),
            ..ExecutionLimits::default()
        }
    }

    #[tokio::test]
    async fn test_full_input_reaches_program() {
        let Some(cat) = tool("cat") else { return };
        let executor = SandboxedExecutor::new(limits(5000));
        let input: String = (0..20_000).map(|i| format!("line {}\n", i)).collect();

        let outcome = executor.run_program(&cat, &[], &input).await.unwrap();
        match outcome {
            ExecutionOutcome::NaturalExit {
                exit_code, stdout, ..
            } => {
                assert_eq!(exit_code, Some(0));
                assert_eq!(stdout, input);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_program_ignoring_input_does_not_hang() {
        let Some(truth) = tool("true") else { return };
        let executor = SandboxedExecutor::new(limits(5000));
        let input = "x".repeat(4 * 1024 * 1024);

        let outcome = executor.run_program(&truth, &[], &input).await.unwrap();
        assert!(matches!(
            outcome,
            ExecutionOutcome::NaturalExit { exit_code: Some(0), .. }
        ));
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let Some(falsy) = tool("false") else { return };
        let executor = SandboxedExecutor::default();

        let outcome = executor.run_program(&falsy, &[], "").await.unwrap();
        assert!(matches!(
            outcome,
            ExecutionOutcome::NaturalExit { exit_code: Some(1), signal: None, .. }
        ));
    }

    /// Whether `pid` still names a live (non-zombie) process
    fn is_running(pid: i32) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            // state is the first field after the parenthesised command name
            Ok(stat) => stat
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.split_whitespace().next())
                .is_some_and(|state| state != "Z" && state != "X"),
            Err(_) => false,
        }
    }

    fn read_pids(path: &Path) -> Vec<i32> {
        std::fs::read_to_string(path)
            .unwrap()
            .split_whitespace()
            .map(|pid| pid.parse().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_timeout_kills_and_reaps() {
        let (Some(sh), Some(sleeper)) = (tool("sh"), tool("sleep")) else { return };
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pids");
        let script = format!(
            "{sleep} 30 & echo $$ $! > {pids}; wait",
            sleep = sleeper.display(),
            pids = pid_file.display()
        );
        let executor = SandboxedExecutor::new(limits(300));

        let started = Instant::now();
        let outcome = executor.run_program(&sh, &["-c", &script], "").await.unwrap();
        let elapsed = started.elapsed();

        match outcome {
            ExecutionOutcome::TimedOut { usage } => {
                assert!(usage.wall_time_ms >= 300);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(elapsed < Duration::from_secs(5));

        let pids = read_pids(&pid_file);
        assert_eq!(pids.len(), 2);
        // the leader is reaped by the time run returns
        assert!(!Path::new(&format!("/proc/{}", pids[0])).exists());
        // the background member was killed with the group; init reaps it
        let deadline = Instant::now() + Duration::from_secs(2);
        while is_running(pids[1]) && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!is_running(pids[1]));
    }

    #[tokio::test]
    async fn test_detached_descendant_cannot_stall_the_run() {
        let (Some(sh), Some(setsid), Some(sleeper)) = (tool("sh"), tool("setsid"), tool("sleep"))
        else {
            return;
        };
        // the detached sleeper keeps stdout open after the shell exits
        let script = format!(
            "{setsid} {sleep} 30 & {sleep} 0.2; echo hi",
            setsid = setsid.display(),
            sleep = sleeper.display()
        );
        let executor = SandboxedExecutor::new(limits(500));

        let started = Instant::now();
        let outcome = executor.run_program(&sh, &["-c", &script], "").await.unwrap();

        assert!(matches!(outcome, ExecutionOutcome::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_fatal() {
        let executor = SandboxedExecutor::default();
        let result = executor
            .run_program(Path::new("/nonexistent/gradebox/program"), &[], "")
            .await;
        assert!(matches!(result, Err(GraderError::Spawn { .. })));
    }

    #[test]
    fn test_kill_is_idempotent() {
        let guard = ChildGuard {
            pid: Pid::from_raw(i32::MAX - 1),
            reaped: true,
        };
        guard.kill();
        guard.kill();
    }

    #[test]
    fn test_address_space_limit() {
        let mut limits = ExecutionLimits::default();
        assert_eq!(limits.address_space_bytes(), None);
        limits.address_space_factor = 4;
        assert_eq!(limits.address_space_bytes(), Some(4 * 256 * 1024 * 1024));
    }
}
