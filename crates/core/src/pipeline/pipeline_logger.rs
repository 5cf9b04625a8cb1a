use std::collections::BTreeMap;
use std::time::Instant;

/// Observes a filter run: progress, per-stage timings and metrics.
pub trait PipelineLogger: Send {
    fn progress(&mut self, frames_done: usize);

    /// Time one stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Point-in-time value, e.g. frames drained after one send.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emits an end-of-run report. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _frames_done: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageStats {
    pub count: usize,
    pub total: f64,
    pub max: f64,
}

impl StageStats {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
        if value > self.max {
            self.max = value;
        }
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Aggregates timings and metrics and writes them through the `log` crate.
///
/// Progress is logged every `every_frames` frames.
pub struct LogPipelineLogger {
    every_frames: usize,
    frames_done: usize,
    started: Instant,
    timings: BTreeMap<String, StageStats>,
    metrics: BTreeMap<String, StageStats>,
}

impl LogPipelineLogger {
    pub fn new(every_frames: usize) -> Self {
        Self {
            every_frames: every_frames.max(1),
            frames_done: 0,
            started: Instant::now(),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn timing_stats(&self, stage: &str) -> Option<StageStats> {
        self.timings.get(stage).copied()
    }

    pub fn metric_stats(&self, name: &str) -> Option<StageStats> {
        self.metrics.get(name).copied()
    }

    /// Report text, or `None` before anything was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Filter run: {} frames in {elapsed:.2}s",
            self.frames_done
        )];
        for (stage, stats) in &self.timings {
            lines.push(format!(
                "  {stage:12} avg {:7.3}ms  max {:7.3}ms  total {:8.1}ms",
                stats.mean(),
                stats.max,
                stats.total
            ));
        }
        for (name, stats) in &self.metrics {
            lines.push(format!("  {name}: avg {:.2}, max {:.0}", stats.mean(), stats.max));
        }
        if self.frames_done > 0 && elapsed > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} fps",
                self.frames_done as f64 / elapsed
            ));
        }
        Some(lines.join("\n"))
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn progress(&mut self, frames_done: usize) {
        self.frames_done = frames_done;
        if frames_done % self.every_frames == 0 {
            log::info!("Filtered {frames_done} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullPipelineLogger;
        logger.progress(3);
        logger.timing("filter", 1.0);
        logger.metric("drained", 1.0);
        logger.info("hi");
        logger.summary();
    }

    #[test]
    fn test_timing_aggregates() {
        let mut logger = LogPipelineLogger::new(10);
        logger.timing("filter", 2.0);
        logger.timing("filter", 4.0);

        let stats = logger.timing_stats("filter").unwrap();
        assert_eq!(stats.count, 2);
        assert_relative_eq!(stats.total, 6.0);
        assert_relative_eq!(stats.max, 4.0);
        assert_relative_eq!(stats.mean(), 3.0);
        assert!(logger.timing_stats("consume").is_none());
    }

    #[test]
    fn test_metric_aggregates() {
        let mut logger = LogPipelineLogger::new(10);
        logger.metric("drained", 1.0);
        logger.metric("drained", 0.0);
        logger.metric("drained", 2.0);

        let stats = logger.metric_stats("drained").unwrap();
        assert_eq!(stats.count, 3);
        assert_relative_eq!(stats.mean(), 1.0);
        assert_relative_eq!(stats.max, 2.0);
    }

    #[test]
    fn test_summary_lists_stages_and_metrics() {
        let mut logger = LogPipelineLogger::new(10);
        logger.progress(12);
        logger.timing("filter", 1.5);
        logger.timing("capture_wait", 0.5);
        logger.metric("drained", 1.0);

        let text = logger.summary_string().unwrap();
        assert!(text.starts_with("Filter run: 12 frames"));
        assert!(text.contains("filter"));
        assert!(text.contains("capture_wait"));
        assert!(text.contains("drained: avg 1.00"));
    }

    #[test]
    fn test_empty_summary_is_none() {
        assert!(LogPipelineLogger::default().summary_string().is_none());
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let mut logger = LogPipelineLogger::new(0);
        logger.progress(1);
        assert_eq!(logger.every_frames, 1);
        assert_eq!(logger.frames_done, 1);
    }

    #[test]
    fn test_stage_stats_mean_of_empty_is_zero() {
        assert_relative_eq!(StageStats::default().mean(), 0.0);
    }
}
