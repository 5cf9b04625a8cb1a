use crate::shared::frame::Frame;
use crate::shared::stream_format::StreamFormat;

/// Takes filtered frames downstream of the pipeline (typically an encoder).
pub trait FrameConsumer: Send {
    /// Called once with the pipeline's resolved output before any frame.
    fn open(&mut self, format: &StreamFormat) -> Result<(), Box<dyn std::error::Error>>;

    fn consume(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
