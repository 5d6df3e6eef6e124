//! Resource limiting and cooperative cancellation for analysis runs.
//!
//! The limiter is checked at pipeline entry and between components; the
//! cancel flag is polled at the start of each component, so cancellation
//! surfaces as an error outcome and never as a partial result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::ResourceLimits;
use crate::models::error::{BhaError, Result};

/// Shared cancellation flag, settable from another thread or a signal
/// handler.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(BhaError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Enforces wall-time, memory, graph-size and unit-count ceilings.
#[derive(Debug)]
pub struct ResourceLimiter {
    limits: ResourceLimits,
    started_at: Instant,
}

impl ResourceLimiter {
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            started_at: Instant::now(),
        }
    }

    /// Restarts the wall-time window.
    pub fn start_timer(&mut self) {
        self.started_at = Instant::now();
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    pub fn check_time_limit(&self) -> Result<()> {
        let elapsed = self.elapsed();
        if elapsed > self.limits.max_execution_time {
            return Err(BhaError::ResourceExhausted(format!(
                "execution time {}s exceeds limit of {}s",
                elapsed.as_secs(),
                self.limits.max_execution_time.as_secs()
            )));
        }
        Ok(())
    }

    pub fn check_memory_limit(&self) -> Result<()> {
        let rss = current_rss_bytes();
        if rss > self.limits.max_memory_bytes {
            return Err(BhaError::ResourceExhausted(format!(
                "resident memory {} MiB exceeds limit of {} MiB",
                rss / (1024 * 1024),
                self.limits.max_memory_bytes / (1024 * 1024)
            )));
        }
        Ok(())
    }

    pub fn check_graph_size(&self, nodes: usize, edges: usize) -> Result<()> {
        if nodes > self.limits.max_graph_nodes {
            return Err(BhaError::ResourceExhausted(format!(
                "graph has {nodes} nodes, limit is {}",
                self.limits.max_graph_nodes
            )));
        }
        if edges > self.limits.max_graph_edges {
            return Err(BhaError::ResourceExhausted(format!(
                "graph has {edges} edges, limit is {}",
                self.limits.max_graph_edges
            )));
        }
        Ok(())
    }

    pub fn check_unit_count(&self, count: usize) -> Result<()> {
        if count > self.limits.max_compilation_units {
            return Err(BhaError::ResourceExhausted(format!(
                "{count} compilation units exceed limit of {}",
                self.limits.max_compilation_units
            )));
        }
        Ok(())
    }
}

impl Default for ResourceLimiter {
    fn default() -> Self {
        Self::new(ResourceLimits::default())
    }
}

/// Resident set size of this process. Reads `/proc/self/status` on Linux;
/// returns 0 (never limiting) on platforms without a cheap probe.
pub fn current_rss_bytes() -> u64 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if let Some(rest) = line.strip_prefix("VmRSS:") {
                    let kib: u64 = rest
                        .trim()
                        .trim_end_matches("kB")
                        .trim()
                        .parse()
                        .unwrap_or(0);
                    return kib * 1024;
                }
            }
        }
        0
    }
    #[cfg(not(target_os = "linux"))]
    {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn tight_limits() -> ResourceLimits {
        ResourceLimits {
            max_memory_bytes: u64::MAX,
            max_execution_time: Duration::from_secs(300),
            max_graph_nodes: 10,
            max_graph_edges: 20,
            max_compilation_units: 5,
        }
    }

    #[test]
    fn within_limits_passes() {
        let limiter = ResourceLimiter::new(tight_limits());
        assert!(limiter.check_time_limit().is_ok());
        assert!(limiter.check_graph_size(10, 20).is_ok());
        assert!(limiter.check_unit_count(5).is_ok());
        assert!(limiter.check_memory_limit().is_ok());
    }

    #[test]
    fn exceeding_limits_errors_with_the_bound() {
        let limiter = ResourceLimiter::new(tight_limits());

        let err = limiter.check_graph_size(11, 0).unwrap_err();
        assert!(matches!(err, BhaError::ResourceExhausted(_)));
        assert!(err.to_string().contains("nodes"));

        let err = limiter.check_graph_size(0, 21).unwrap_err();
        assert!(err.to_string().contains("edges"));

        let err = limiter.check_unit_count(6).unwrap_err();
        assert!(err.to_string().contains("compilation units"));
    }

    #[test]
    fn time_limit_trips_after_expiry() {
        let mut limiter = ResourceLimiter::new(ResourceLimits {
            max_execution_time: Duration::ZERO,
            ..tight_limits()
        });
        limiter.start_timer();
        std::thread::sleep(Duration::from_millis(2));
        assert!(limiter.check_time_limit().is_err());
    }

    #[test]
    fn cancel_flag_round_trip() {
        let flag = CancelFlag::new();
        assert!(flag.check().is_ok());

        let clone = flag.clone();
        clone.cancel();
        assert!(flag.is_cancelled());
        assert!(matches!(flag.check().unwrap_err(), BhaError::Cancelled));
    }
}
