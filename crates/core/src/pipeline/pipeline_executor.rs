use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::capture::domain::frame_source::FrameSource;
use crate::encode::domain::frame_consumer::FrameConsumer;
use crate::filter::domain::frame_filter::FrameFilter;
use crate::shared::stream_format::StreamFormat;

use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};

/// Options for one capture → filter → consume run.
pub struct RunConfig {
    /// Called with the number of frames filtered so far. Return false to stop.
    pub on_progress: Option<Box<dyn Fn(usize) -> bool + Send>>,
    pub cancelled: Arc<AtomicBool>,
    pub logger: Box<dyn PipelineLogger>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            on_progress: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            logger: Box::new(NullPipelineLogger),
        }
    }
}

/// Counts from a finished run.
#[derive(Clone, Copy, Debug)]
pub struct RunSummary {
    pub frames_captured: usize,
    pub frames_filtered: usize,
    pub output: StreamFormat,
}

/// Runs frames from a source through a filter into a consumer.
///
/// The filter must already be initialised; its output format is handed to
/// the consumer before the first frame.
pub trait PipelineExecutor: Send {
    fn execute(
        &self,
        source: Box<dyn FrameSource>,
        filter: Box<dyn FrameFilter>,
        consumer: Box<dyn FrameConsumer>,
        config: RunConfig,
    ) -> Result<RunSummary, Box<dyn std::error::Error>>;
}
