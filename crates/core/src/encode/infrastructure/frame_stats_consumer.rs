use std::sync::{Arc, Mutex};

use crate::encode::domain::frame_consumer::FrameConsumer;
use crate::shared::frame::Frame;
use crate::shared::stream_format::StreamFormat;

/// What a [`FrameStatsConsumer`] observed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub frames: usize,
    pub first_pts: Option<i64>,
    pub last_pts: Option<i64>,
    /// Frames whose pts did not increase over the previous one.
    pub out_of_order: usize,
    pub bytes: usize,
    pub closed: bool,
}

/// Encoder stand-in: validates and counts filtered frames.
///
/// Rejects frames whose geometry differs from the format given to `open`.
/// Stats are shared through a handle so the caller can read them after the
/// consumer has been moved onto a worker thread.
pub struct FrameStatsConsumer {
    format: Option<StreamFormat>,
    stats: Arc<Mutex<FrameStats>>,
}

impl FrameStatsConsumer {
    pub fn new() -> Self {
        Self {
            format: None,
            stats: Arc::new(Mutex::new(FrameStats::default())),
        }
    }

    pub fn stats_handle(&self) -> Arc<Mutex<FrameStats>> {
        self.stats.clone()
    }
}

impl Default for FrameStatsConsumer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameConsumer for FrameStatsConsumer {
    fn open(&mut self, format: &StreamFormat) -> Result<(), Box<dyn std::error::Error>> {
        log::debug!("Consumer opened for {format}");
        self.format = Some(*format);
        Ok(())
    }

    fn consume(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let format = self.format.as_ref().ok_or("FrameStatsConsumer: not opened")?;
        if frame.width() != format.width
            || frame.height() != format.height
            || frame.format() != format.pixel_format
        {
            return Err(format!(
                "frame {}x{} {:?} does not match consumer format {format}",
                frame.width(),
                frame.height(),
                frame.format()
            )
            .into());
        }

        let bytes: usize = (0..frame.planes())
            .map(|p| frame.visible_plane(p).len())
            .sum();

        let mut stats = self.stats.lock().map_err(|_| "stats lock poisoned")?;
        if let (Some(prev), Some(pts)) = (stats.last_pts, frame.pts()) {
            if pts <= prev {
                stats.out_of_order += 1;
            }
        }
        if stats.first_pts.is_none() {
            stats.first_pts = frame.pts();
        }
        if frame.pts().is_some() {
            stats.last_pts = frame.pts();
        }
        stats.frames += 1;
        stats.bytes += bytes;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut stats = self.stats.lock().map_err(|_| "stats lock poisoned")?;
        if !stats.closed {
            log::info!(
                "Consumed {} frames ({} bytes, pts {:?}..{:?})",
                stats.frames,
                stats.bytes,
                stats.first_pts,
                stats.last_pts
            );
        }
        stats.closed = true;
        Ok(())
    }
}
