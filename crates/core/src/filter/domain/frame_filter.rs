use crate::shared::frame::Frame;
use crate::shared::stream_format::StreamFormat;

/// Push/pull interface of a frame transformation stage.
///
/// Callers follow a push-then-drain protocol: after every accepted
/// `send_frame`, call `receive_frame` until it returns `None`. A rejected
/// send is backpressure; drain and try again.
pub trait FrameFilter: Send {
    /// Offers one frame. Returns false if it was not accepted.
    fn send_frame(&mut self, frame: &Frame) -> bool;

    /// Pulls one processed frame, or `None` if none is ready right now.
    fn receive_frame(&mut self) -> Option<Frame>;

    /// Signals that no more input will follow, so buffered frames can drain.
    fn send_end_of_stream(&mut self) -> bool;

    /// Resolved output description, once the stage is ready.
    fn output(&self) -> Option<StreamFormat>;
}
