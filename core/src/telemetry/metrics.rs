use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Counters shared by every pipeline invocation, including concurrent ones.
pub struct PipelineMetrics {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub cubes_processed: usize,
    pub cubes_failed: usize,
    pub detections: usize,
    pub degenerate_cells: usize,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_cube(&self, detections: usize, degenerate_cells: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.cubes_processed += 1;
            metrics.detections += detections;
            metrics.degenerate_cells += degenerate_cells;
        }
    }

    pub fn record_failure(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.cubes_failed += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn counters_accumulate_across_threads() {
        let metrics = Arc::new(PipelineMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || metrics.record_cube(2, 1))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cubes_processed, 4);
        assert_eq!(snapshot.detections, 8);
        assert_eq!(snapshot.degenerate_cells, 4);
        assert_eq!(snapshot.cubes_failed, 1);
    }
}
