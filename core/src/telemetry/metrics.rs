use serde::Serialize;
use std::sync::Mutex;

/// Waveform counters shared by every worker of one run.
#[derive(Debug)]
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub built: usize,
    pub retained: usize,
    pub filtered: usize,
    pub processed: usize,
    pub errors: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    /// One waveform constructed; `retained` when it passed every filter.
    pub fn record_built(&self, retained: bool) {
        self.update(|m| {
            m.built += 1;
            if retained {
                m.retained += 1;
            } else {
                m.filtered += 1;
            }
        });
    }

    pub fn record_processed(&self, count: usize) {
        self.update(|m| m.processed += count);
    }

    pub fn record_error(&self) {
        self.update(|m| m.errors += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().map(|m| *m).unwrap_or_default()
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
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn counters_split_retained_and_filtered() {
        let metrics = MetricsRecorder::new();
        metrics.record_built(true);
        metrics.record_built(false);
        metrics.record_built(true);
        metrics.record_processed(2);
        metrics.record_error();
        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                built: 3,
                retained: 2,
                filtered: 1,
                processed: 2,
                errors: 1
            }
        );
    }

    #[test]
    fn recorder_is_shared_across_threads() {
        let metrics = Arc::new(MetricsRecorder::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || metrics.record_processed(5))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().processed, 20);
    }
}
