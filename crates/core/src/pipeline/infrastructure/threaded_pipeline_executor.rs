use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use crate::capture::domain::frame_source::FrameSource;
use crate::encode::domain::frame_consumer::FrameConsumer;
use crate::filter::domain::frame_filter::FrameFilter;
use crate::pipeline::pipeline_executor::{PipelineExecutor, RunConfig, RunSummary};
use crate::shared::frame::Frame;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Runs capture and consumption on their own threads around the filter.
///
/// Layout: `capture → main [send/drain filter] → consumer`
///
/// The filter is driven only from the calling thread. Bounded channels on
/// both sides keep a slow consumer from letting captured frames pile up.
pub struct ThreadedPipelineExecutor {
    channel_capacity: usize,
}

impl ThreadedPipelineExecutor {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(channel_capacity: usize) -> Self {
        Self {
            channel_capacity: channel_capacity.max(1),
        }
    }
}

impl Default for ThreadedPipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Why the main loop stopped early.
enum LoopError {
    /// The consumer thread hung up; its own error explains why.
    ConsumerGone,
    Failed(Box<dyn std::error::Error>),
}

impl From<&str> for LoopError {
    fn from(message: &str) -> Self {
        LoopError::Failed(message.into())
    }
}

#[derive(Default)]
struct Counters {
    captured: usize,
    filtered: usize,
}

impl PipelineExecutor for ThreadedPipelineExecutor {
    fn execute(
        &self,
        source: Box<dyn FrameSource>,
        mut filter: Box<dyn FrameFilter>,
        mut consumer: Box<dyn FrameConsumer>,
        mut config: RunConfig,
    ) -> Result<RunSummary, Box<dyn std::error::Error>> {
        let output = filter.output().ok_or("Filter is not initialised")?;
        let input = source.stream_format();
        config
            .logger
            .info(&format!("Filtering {input} -> {output}"));

        consumer.open(&output)?;

        let cap = self.channel_capacity;
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Result<Frame, SendError>>(cap);
        let (write_tx, write_rx) = crossbeam_channel::bounded::<Frame>(cap);

        let capture_handle = spawn_capture(source, frame_tx, config.cancelled.clone());
        let consumer_handle = spawn_consumer(consumer, write_rx);

        let mut counters = Counters::default();
        let loop_result = run_main_loop(frame_rx, &write_tx, &mut *filter, &mut counters, &mut config);

        drop(write_tx);
        config.logger.summary();

        join_threads(capture_handle, consumer_handle, loop_result)?;

        Ok(RunSummary {
            frames_captured: counters.captured,
            frames_filtered: counters.filtered,
            output,
        })
    }
}

fn spawn_capture(
    mut source: Box<dyn FrameSource>,
    frame_tx: Sender<Result<Frame, SendError>>,
    cancelled: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        while let Some(frame_result) = source.next_frame() {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            let failed = frame_result.is_err();
            let mapped = frame_result.map_err(|e| -> SendError { e.to_string().into() });
            if frame_tx.send(mapped).is_err() || failed {
                break;
            }
        }
        source.close();
    })
}

fn spawn_consumer(
    mut consumer: Box<dyn FrameConsumer>,
    write_rx: Receiver<Frame>,
) -> JoinHandle<Result<Box<dyn FrameConsumer>, SendError>> {
    std::thread::spawn(move || {
        for frame in write_rx {
            consumer
                .consume(&frame)
                .map_err(|e| -> SendError { e.to_string().into() })?;
        }
        Ok(consumer)
    })
}

/// Receives captured frames, pushes each through the filter and drains
/// everything it emits. Ends with an end-of-stream drain unless cancelled.
fn run_main_loop(
    frame_rx: Receiver<Result<Frame, SendError>>,
    write_tx: &Sender<Frame>,
    filter: &mut dyn FrameFilter,
    counters: &mut Counters,
    config: &mut RunConfig,
) -> Result<(), LoopError> {
    loop {
        if config.cancelled.load(Ordering::Relaxed) {
            return Ok(());
        }

        let waited = Instant::now();
        let Ok(captured) = frame_rx.recv() else {
            break;
        };
        config
            .logger
            .timing("capture_wait", waited.elapsed().as_secs_f64() * 1000.0);
        config
            .logger
            .metric("capture_queue_depth", frame_rx.len() as f64);

        let frame = captured.map_err(|e| LoopError::Failed(e.to_string().into()))?;
        counters.captured += 1;

        let started = Instant::now();
        submit(filter, &frame, write_tx, counters, config)?;
        config
            .logger
            .timing("filter", started.elapsed().as_secs_f64() * 1000.0);
    }

    if !filter.send_end_of_stream() {
        return Err("Filter refused end of stream".into());
    }
    drain(filter, write_tx, counters, config)?;
    Ok(())
}

/// Sends one frame, treating a rejection as backpressure: drain, then retry
/// once. A second rejection means the filter is stuck.
fn submit(
    filter: &mut dyn FrameFilter,
    frame: &Frame,
    write_tx: &Sender<Frame>,
    counters: &mut Counters,
    config: &mut RunConfig,
) -> Result<(), LoopError> {
    if !filter.send_frame(frame) {
        let drained = drain(filter, write_tx, counters, config)?;
        log::debug!("Filter backpressure, drained {drained} frames before retry");
        if !filter.send_frame(frame) {
            return Err(LoopError::Failed(
                format!("Filter rejected frame with pts {:?}", frame.pts()).into(),
            ));
        }
    }
    drain(filter, write_tx, counters, config)?;
    Ok(())
}

fn drain(
    filter: &mut dyn FrameFilter,
    write_tx: &Sender<Frame>,
    counters: &mut Counters,
    config: &mut RunConfig,
) -> Result<usize, LoopError> {
    let mut drained = 0;
    while let Some(frame) = filter.receive_frame() {
        write_tx.send(frame).map_err(|_| LoopError::ConsumerGone)?;
        drained += 1;
        counters.filtered += 1;
        config.logger.progress(counters.filtered);

        if let Some(ref callback) = config.on_progress {
            if !callback(counters.filtered) {
                config.cancelled.store(true, Ordering::Relaxed);
                return Err("Cancelled".into());
            }
        }
    }
    config.logger.metric("drained_per_call", drained as f64);
    Ok(drained)
}

/// Joins both worker threads and returns the first error, preferring the
/// consumer's own error over the main loop noticing it hung up.
fn join_threads(
    capture_handle: JoinHandle<()>,
    consumer_handle: JoinHandle<Result<Box<dyn FrameConsumer>, SendError>>,
    loop_result: Result<(), LoopError>,
) -> Result<(), Box<dyn std::error::Error>> {
    fn set_if_none(slot: &mut Option<Box<dyn std::error::Error>>, err: Box<dyn std::error::Error>) {
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    let (mut first_error, consumer_gone) = match loop_result {
        Ok(()) => (None, false),
        Err(LoopError::ConsumerGone) => (None, true),
        Err(LoopError::Failed(e)) => (Some(e), false),
    };

    if capture_handle.join().is_err() {
        set_if_none(&mut first_error, "Capture thread panicked".into());
    }

    match consumer_handle.join() {
        Ok(Ok(mut consumer)) => {
            if let Err(e) = consumer.close() {
                set_if_none(&mut first_error, e);
            }
        }
        Ok(Err(e)) => set_if_none(&mut first_error, e.to_string().into()),
        Err(_) => set_if_none(&mut first_error, "Consumer thread panicked".into()),
    }

    if consumer_gone {
        set_if_none(&mut first_error, "Consumer channel closed unexpectedly".into());
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
