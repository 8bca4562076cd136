//! Resident memory watchdog for a running process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::fs;
use tokio::time::{interval, MissedTickBehavior};

/// Samples `VmRSS` of one process through procfs
#[derive(Debug)]
pub struct MemoryProbe {
    pid: u32,
    peak_kb: AtomicU64,
}

impl MemoryProbe {
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            peak_kb: AtomicU64::new(0),
        }
    }

    /// Current resident set size in KB.
    ///
    /// `None` once the process is gone or has become a zombie; both simply
    /// mean there is nothing left to measure.
    pub async fn sample(&self) -> Option<u64> {
        let status = fs::read_to_string(format!("/proc/{}/status", self.pid))
            .await
            .ok()?;
        let rss_kb = parse_vm_rss(&status)?;
        self.peak_kb.fetch_max(rss_kb, Ordering::Relaxed);
        Some(rss_kb)
    }

    /// Highest resident set size seen so far, in KB
    pub fn peak_kb(&self) -> u64 {
        self.peak_kb.load(Ordering::Relaxed)
    }

    /// Poll every `period` until resident memory goes above `limit_bytes`.
    ///
    /// Resolves to `Some(rss_kb)` on a violation and to `None` when the
    /// process disappears first.
    pub async fn watch(&self, limit_bytes: u64, period: Duration) -> Option<u64> {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.sample().await {
                Some(rss_kb) if rss_kb.saturating_mul(1024) > limit_bytes => {
                    tracing::debug!(pid = self.pid, rss_kb, "Memory ceiling crossed");
                    return Some(rss_kb);
                }
                Some(_) => {}
                None => {
                    tracing::trace!(pid = self.pid, "Process gone, memory watch finished");
                    return None;
                }
            }
        }
    }
}

/// Extract the `VmRSS` value (KB) from the contents of `/proc/<pid>/status`
fn parse_vm_rss(status: &str) -> Option<u64> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.trim().trim_end_matches("kB").trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vm_rss() {
        let status = "Name:\tmain\nState:\tR (running)\nVmPeak:\t  10000 kB\nVmRSS:\t    2048 kB\nThreads:\t1\n";
        assert_eq!(parse_vm_rss(status), Some(2048));
    }

    #[test]
    fn test_parse_vm_rss_zombie() {
        let status = "Name:\tmain\nState:\tZ (zombie)\nThreads:\t1\n";
        assert_eq!(parse_vm_rss(status), None);
    }

    #[tokio::test]
    async fn test_sample_self() {
        let probe = MemoryProbe::new(std::process::id());
        let rss = probe.sample().await.unwrap();
        assert!(rss > 0);
        assert_eq!(probe.peak_kb(), rss);
    }

    #[tokio::test]
    async fn test_watch_fires_over_limit() {
        let probe = MemoryProbe::new(std::process::id());
        let rss = probe.watch(1, Duration::from_millis(5)).await;
        assert!(rss.is_some());
    }

    #[tokio::test]
    async fn test_watch_ends_for_missing_process() {
        // pid_max on Linux never reaches this value
        let probe = MemoryProbe::new(u32::MAX - 1);
        let rss = probe.watch(1, Duration::from_millis(5)).await;
        assert!(rss.is_none());
        assert_eq!(probe.peak_kb(), 0);
    }
}
