use crate::shared::frame::Frame;
use crate::shared::stream_format::StreamFormat;

/// Produces raw frames in capture order.
///
/// The format is negotiated before the first frame and does not change;
/// every frame returned matches [`FrameSource::stream_format`].
pub trait FrameSource: Send {
    fn stream_format(&self) -> StreamFormat;

    /// Next captured frame, or `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>>;

    /// Releases the device. Default: no-op.
    fn close(&mut self) {}
}
