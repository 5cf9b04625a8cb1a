use ffmpeg_next::format::Pixel;

use crate::capture::domain::frame_source::FrameSource;
use crate::encode::domain::frame_consumer::FrameConsumer;
use crate::filter::domain::error_reporter::ErrorReporter;
use crate::filter::domain::filter_config::{FilterConfig, ScalingAlgorithm};
use crate::filter::infrastructure::ffmpeg_filter_pipeline::FilterPipeline;
use crate::pipeline::pipeline_executor::{PipelineExecutor, RunConfig, RunSummary};
use crate::shared::constants::DEFAULT_QUEUE_LIMIT;

/// Filter parameters applied to whatever stream the source delivers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterOptions {
    pub scale: f32,
    /// 0 lets libavfilter pick.
    pub threads: u32,
    pub output_format: Option<Pixel>,
    pub scaling: ScalingAlgorithm,
    pub queue_limit: usize,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            threads: 0,
            output_format: None,
            scaling: ScalingAlgorithm::default(),
            queue_limit: DEFAULT_QUEUE_LIMIT,
        }
    }
}

impl FilterOptions {
    pub fn filter_config(&self, source: &dyn FrameSource) -> FilterConfig {
        let config = FilterConfig::for_stream(&source.stream_format(), self.scale, self.threads)
            .with_scaling(self.scaling)
            .with_queue_limit(self.queue_limit);
        match self.output_format {
            Some(format) => config.with_output_format(format),
            None => config,
        }
    }
}

/// Capture → filter → consume. Single use: a second `execute` fails.
pub struct FilterStreamUseCase {
    source: Option<Box<dyn FrameSource>>,
    consumer: Option<Box<dyn FrameConsumer>>,
    executor: Box<dyn PipelineExecutor>,
    options: FilterOptions,
    reporter: ErrorReporter,
}

impl FilterStreamUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        consumer: Box<dyn FrameConsumer>,
        executor: Box<dyn PipelineExecutor>,
        options: FilterOptions,
        reporter: ErrorReporter,
    ) -> Self {
        Self {
            source: Some(source),
            consumer: Some(consumer),
            executor,
            options,
            reporter,
        }
    }

    /// Builds the filter for the source's stream and runs it to completion.
    pub fn execute(&mut self, config: RunConfig) -> Result<RunSummary, Box<dyn std::error::Error>> {
        let source = self.source.take().ok_or("Filter stream already executed")?;
        let consumer = self.consumer.take().ok_or("Filter stream already executed")?;

        let filter_config = self.options.filter_config(source.as_ref());
        log::info!(
            "Configuring filter: {} scale {} ({}, {} threads)",
            filter_config.input_stream(),
            filter_config.scale,
            filter_config.scaling,
            filter_config.threads
        );

        let mut pipeline = FilterPipeline::new();
        pipeline.try_init(filter_config, self.reporter.clone())?;

        self.executor
            .execute(source, Box::new(pipeline), consumer, config)
    }
}
