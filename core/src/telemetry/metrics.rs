use std::sync::Mutex;

/// Running totals for aiming workflow executions.
pub struct MetricsRecorder {
    inner: Mutex<Totals>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub completed: usize,
    pub failed: usize,
    /// Aim points emitted across all completed runs.
    pub aim_points: usize,
}

#[derive(Default)]
struct Totals {
    completed: usize,
    failed: usize,
    aim_points: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Totals::default()),
        }
    }

    pub fn record_completed(&self, aim_points: usize) {
        if let Ok(mut totals) = self.inner.lock() {
            totals.completed += 1;
            totals.aim_points += aim_points;
        }
    }

    pub fn record_failed(&self) {
        if let Ok(mut totals) = self.inner.lock() {
            totals.failed += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(totals) = self.inner.lock() {
            MetricsSnapshot {
                completed: totals.completed,
                failed: totals.failed,
                aim_points: totals.aim_points,
            }
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_accumulates_runs_and_aim_points() {
        let recorder = MetricsRecorder::new();
        recorder.record_completed(3);
        recorder.record_completed(2);
        recorder.record_failed();
        let snap = recorder.snapshot();
        assert_eq!(snap.completed, 2);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.aim_points, 5);
    }
}
