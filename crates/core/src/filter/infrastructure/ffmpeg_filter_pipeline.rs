use ffmpeg_next::ffi;
use ffmpeg_next::filter::Graph;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::util::frame::video::Video;
use ffmpeg_next::Rational;

use crate::filter::domain::error_reporter::{ErrorCallback, ErrorReporter};
use crate::filter::domain::filter_config::FilterConfig;
use crate::filter::domain::filter_error::FilterError;
use crate::filter::domain::frame_filter::FrameFilter;
use crate::shared::constants::{SINK_NODE, SOURCE_NODE};
use crate::shared::frame::Frame;
use crate::shared::stream_format::StreamFormat;

use super::ffmpeg_graph_builder::{build_graph, BuiltGraph};

/// Scales and converts a captured frame stream through a libavfilter graph.
///
/// Starts uninitialised; [`FilterPipeline::init`] builds the graph once.
/// Every operation on an uninitialised pipeline is a no-op that returns
/// `false`/`None`. Dropping the pipeline frees the graph and its worker
/// threads.
///
/// Not `Clone`: the graph has exactly one owner. Moving the pipeline moves
/// that ownership.
pub struct FilterPipeline {
    state: State,
    reporter: ErrorReporter,
}

enum State {
    Uninitialized,
    Ready(ReadyGraph),
}

struct ReadyGraph {
    graph: Graph,
    input: StreamFormat,
    output: StreamFormat,
    queue_limit: usize,
    /// Frames accepted since the sink last reported it needs more input.
    in_flight: usize,
    end_of_stream_sent: bool,
    finished: bool,
    frames_sent: usize,
    frames_received: usize,
}

// Safety: the graph is only driven through `&mut self`, so it is never
// touched from two threads at once. Moving it to another thread is fine.
unsafe impl Send for FilterPipeline {}

impl FilterPipeline {
    pub fn new() -> Self {
        Self {
            state: State::Uninitialized,
            reporter: ErrorReporter::silent(),
        }
    }

    /// Builds the graph. Returns false (after reporting once through
    /// `on_error`, if given) when the configuration or graph is invalid.
    pub fn init(&mut self, config: FilterConfig, on_error: Option<ErrorCallback>) -> bool {
        self.try_init(config, ErrorReporter::from_callback(on_error))
            .is_ok()
    }

    /// Like [`FilterPipeline::init`] but hands the failure back as well.
    pub fn try_init(
        &mut self,
        config: FilterConfig,
        reporter: ErrorReporter,
    ) -> Result<(), FilterError> {
        if self.is_ready() {
            log::warn!("FilterPipeline::init called on a ready pipeline; ignoring");
            return Err(FilterError::AlreadyInitialized);
        }
        self.reporter = reporter;

        match build_graph(&config) {
            Ok(BuiltGraph { graph, output }) => {
                self.state = State::Ready(ReadyGraph {
                    graph,
                    input: config.input_stream(),
                    output,
                    queue_limit: config.queue_limit,
                    in_flight: 0,
                    end_of_stream_sent: false,
                    finished: false,
                    frames_sent: 0,
                    frames_received: 0,
                });
                Ok(())
            }
            Err(e) => {
                self.reporter.report(&e.to_string());
                Err(e)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// Submits one frame. Returns false on backpressure (drain with
    /// [`FilterPipeline::receive_frame`] and retry), after end of stream,
    /// before init, or on error. Only errors are reported, including a frame
    /// whose size, format or time base differs from the configured input.
    pub fn send_frame(&mut self, frame: &Frame) -> bool {
        let State::Ready(ready) = &mut self.state else {
            log::debug!("send_frame on an uninitialised filter pipeline");
            return false;
        };
        if ready.end_of_stream_sent {
            log::debug!("send_frame after end of stream");
            return false;
        }
        if ready.in_flight >= ready.queue_limit {
            log::trace!("Filter queue full ({} frames), caller must drain", ready.in_flight);
            return false;
        }
        if let Err(e) = check_frame(&ready.input, frame) {
            self.reporter.report(&e.to_string());
            return false;
        }

        match ready.push(frame) {
            Ok(()) => {
                ready.in_flight += 1;
                ready.frames_sent += 1;
                true
            }
            Err(e) if is_would_block(&e) => {
                log::trace!("Filter source is full, caller must drain");
                false
            }
            Err(e) => {
                self.reporter.report(&FilterError::Graph(e).to_string());
                false
            }
        }
    }

    /// Pulls one filtered frame, or `None` when nothing is ready yet or the
    /// stream has ended.
    pub fn receive_frame(&mut self) -> Option<Frame> {
        let State::Ready(ready) = &mut self.state else {
            log::debug!("receive_frame on an uninitialised filter pipeline");
            return None;
        };
        if ready.finished {
            return None;
        }

        let mut video = Video::empty();
        match ready.pull(&mut video) {
            Ok(()) => {
                ready.in_flight = ready.in_flight.saturating_sub(1);
                ready.frames_received += 1;
                Some(Frame::new(video, ready.output.time_base))
            }
            Err(ffmpeg_next::Error::Eof) => {
                log::debug!("Filter graph reached end of stream");
                ready.finished = true;
                ready.in_flight = 0;
                None
            }
            Err(e) if is_would_block(&e) => {
                ready.in_flight = 0;
                None
            }
            Err(e) => {
                self.reporter.report(&FilterError::Graph(e).to_string());
                None
            }
        }
    }

    /// Closes the input. Frames still inside the graph stay retrievable.
    pub fn send_end_of_stream(&mut self) -> bool {
        let State::Ready(ready) = &mut self.state else {
            log::debug!("send_end_of_stream on an uninitialised filter pipeline");
            return false;
        };
        if ready.end_of_stream_sent {
            return true;
        }
        match ready.close_source() {
            Ok(()) => {
                ready.end_of_stream_sent = true;
                true
            }
            Err(e) => {
                self.reporter.report(&FilterError::Graph(e).to_string());
                false
            }
        }
    }

    /// True once the graph has emitted its last frame after end of stream.
    pub fn is_finished(&self) -> bool {
        matches!(&self.state, State::Ready(ready) if ready.finished)
    }

    pub fn output(&self) -> Option<StreamFormat> {
        match &self.state {
            State::Ready(ready) => Some(ready.output),
            State::Uninitialized => None,
        }
    }

    pub fn width(&self) -> Option<u32> {
        self.output().map(|o| o.width)
    }

    pub fn height(&self) -> Option<u32> {
        self.output().map(|o| o.height)
    }

    pub fn pixel_format(&self) -> Option<Pixel> {
        self.output().map(|o| o.pixel_format)
    }

    /// Nominal output rate: the input rate. Not re-estimated, so it is only
    /// approximate for variable frame rate input.
    pub fn frame_rate(&self) -> Option<Rational> {
        self.output().map(|o| o.frame_rate)
    }

    pub fn time_base(&self) -> Option<Rational> {
        self.output().map(|o| o.time_base)
    }

    pub fn frames_sent(&self) -> usize {
        match &self.state {
            State::Ready(ready) => ready.frames_sent,
            State::Uninitialized => 0,
        }
    }

    pub fn frames_received(&self) -> usize {
        match &self.state {
            State::Ready(ready) => ready.frames_received,
            State::Uninitialized => 0,
        }
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameFilter for FilterPipeline {
    fn send_frame(&mut self, frame: &Frame) -> bool {
        FilterPipeline::send_frame(self, frame)
    }

    fn receive_frame(&mut self) -> Option<Frame> {
        FilterPipeline::receive_frame(self)
    }

    fn send_end_of_stream(&mut self) -> bool {
        FilterPipeline::send_end_of_stream(self)
    }

    fn output(&self) -> Option<StreamFormat> {
        FilterPipeline::output(self)
    }
}

impl ReadyGraph {
    /// Hands the source a new reference to the frame's buffers; the caller's
    /// frame is left untouched.
    fn push(&mut self, frame: &Frame) -> Result<(), ffmpeg_next::Error> {
        let mut source = self
            .graph
            .get(SOURCE_NODE)
            .ok_or(ffmpeg_next::Error::Bug)?;
        let ret =
            unsafe { ffi::av_buffersrc_write_frame(source.as_mut_ptr(), frame.video().as_ptr()) };
        if ret < 0 {
            Err(ffmpeg_next::Error::from(ret))
        } else {
            Ok(())
        }
    }

    fn pull(&mut self, video: &mut Video) -> Result<(), ffmpeg_next::Error> {
        let mut sink = self.graph.get(SINK_NODE).ok_or(ffmpeg_next::Error::Bug)?;
        sink.sink().frame(video)
    }

    fn close_source(&mut self) -> Result<(), ffmpeg_next::Error> {
        let mut source = self
            .graph
            .get(SOURCE_NODE)
            .ok_or(ffmpeg_next::Error::Bug)?;
        source.source().flush()
    }
}

fn is_would_block(error: &ffmpeg_next::Error) -> bool {
    matches!(
        error,
        ffmpeg_next::Error::Other { errno } if *errno == ffmpeg_next::error::EAGAIN
    )
}

fn check_frame(input: &StreamFormat, frame: &Frame) -> Result<(), FilterError> {
    if frame.width() != input.width
        || frame.height() != input.height
        || frame.format() != input.pixel_format
    {
        return Err(FilterError::FrameMismatch(format!(
            "got {}x{} {:?}, expected {}",
            frame.width(),
            frame.height(),
            frame.format(),
            input
        )));
    }
    // pts passes through the graph unscaled, so it must already be in the
    // input time base.
    if !same_rational(frame.time_base(), input.time_base) {
        return Err(FilterError::FrameMismatch(format!(
            "got time base {}/{}, expected {}/{}",
            frame.time_base().numerator(),
            frame.time_base().denominator(),
            input.time_base.numerator(),
            input.time_base.denominator()
        )));
    }
    Ok(())
}

fn same_rational(a: Rational, b: Rational) -> bool {
    i64::from(a.numerator()) * i64::from(b.denominator())
        == i64::from(b.numerator()) * i64::from(a.denominator())
}
