//! Process memory sampling for stage reports

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Source of the current process memory figure, in bytes
pub trait MemoryProbe: Send + Sync {
    fn current_bytes(&self) -> u64;
}

/// Resident set size of this process
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessMemoryProbe;

impl MemoryProbe for ProcessMemoryProbe {
    fn current_bytes(&self) -> u64 {
        memory_stats::memory_stats()
            .map(|usage| usage.physical_mem as u64)
            .unwrap_or(0)
    }
}

/// Background task tracking the highest reading while a stage runs
pub struct PeakSampler {
    peak: Arc<AtomicU64>,
    probe: Arc<dyn MemoryProbe>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PeakSampler {
    /// Start sampling every `interval`, seeded with `initial`
    pub fn start(probe: Arc<dyn MemoryProbe>, interval: Duration, initial: u64) -> Self {
        let peak = Arc::new(AtomicU64::new(initial));

        if interval.is_zero() {
            return Self {
                peak,
                probe,
                stop: None,
                task: None,
            };
        }

        let (stop_tx, mut stop_rx) = oneshot::channel();
        let task_peak = peak.clone();
        let task_probe = probe.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        task_peak.fetch_max(task_probe.current_bytes(), Ordering::Relaxed);
                    }
                }
            }
        });

        Self {
            peak,
            probe,
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Stop sampling and return the peak, including one final reading
    pub async fn finish(mut self) -> u64 {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        let last = self.probe.current_bytes();
        self.peak.fetch_max(last, Ordering::Relaxed).max(last)
    }
}

impl Drop for PeakSampler {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedProbe;
    use super::*;

    #[tokio::test]
    async fn test_peak_includes_initial_and_final() {
        let probe = Arc::new(ScriptedProbe::new(vec![10, 30]));
        let sampler = PeakSampler::start(probe, Duration::ZERO, 20);
        assert_eq!(sampler.finish().await, 20);
    }

    #[tokio::test]
    async fn test_sampler_tracks_spikes() {
        let probe = Arc::new(ScriptedProbe::new(vec![5, 500, 5]));
        let sampler = PeakSampler::start(probe, Duration::from_millis(1), 1);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sampler.finish().await, 500);
    }
}
