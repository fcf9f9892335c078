//! In-process engine configuration. Built with the usual consuming-builder shape;
//! there is no file or environment parsing here — callers construct an `EngineConfig`
//! in code and hand it to [`crate::filter::FilterEngine`].

use tracing::warn;

/// Tuning knobs for a [`crate::filter::FilterEngine`] run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    workers: usize,
    batch_size: u32,
    max_alloc: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let workers = match std::thread::available_parallelism() {
            Ok(n) => n.get(),
            Err(err) => {
                warn!(error = %err, "could not probe available parallelism, falling back to a single worker");
                1
            }
        };
        Self {
            workers,
            batch_size: 1024,
            max_alloc: None,
        }
    }
}

impl EngineConfig {
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    pub fn max_alloc(&self) -> Option<u32> {
        self.max_alloc
    }

    /// Sets the worker pool size. A request for zero workers is a logic error in the
    /// caller, not a platform condition, so it's clamped rather than silently accepted.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_alloc(mut self, max_alloc: u32) -> Self {
        self.max_alloc = Some(max_alloc);
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = EngineConfig::default();
        assert!(config.workers() >= 1);
        assert_eq!(config.batch_size(), 1024);
        assert_eq!(config.max_alloc(), None);
    }

    #[test]
    fn builder_methods_clamp_zero_inputs() {
        let config = EngineConfig::default().with_workers(0).with_batch_size(0);
        assert_eq!(config.workers(), 1);
        assert_eq!(config.batch_size(), 1);
    }
}
