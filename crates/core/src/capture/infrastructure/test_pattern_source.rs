use ffmpeg_next::format::Pixel;
use ffmpeg_next::util::frame::video::Video;
use ffmpeg_next::Rational;

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;
use crate::shared::stream_format::StreamFormat;

/// Synthetic capture device emitting a moving byte ramp.
///
/// Stands in for camera hardware when exercising the pipeline. Works for
/// any pixel format libavutil can allocate; pts is the frame index.
pub struct TestPatternSource {
    format: StreamFormat,
    total_frames: usize,
    next_index: usize,
}

impl TestPatternSource {
    pub fn new(format: StreamFormat, total_frames: usize) -> Self {
        Self {
            format,
            total_frames,
            next_index: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.total_frames - self.next_index
    }
}

impl FrameSource for TestPatternSource {
    fn stream_format(&self) -> StreamFormat {
        self.format
    }

    fn next_frame(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        if self.next_index >= self.total_frames {
            return None;
        }
        let index = self.next_index as i64;
        self.next_index += 1;
        Some(Ok(pattern_frame(
            self.format.pixel_format,
            self.format.width,
            self.format.height,
            index,
            self.format.time_base,
        )))
    }
}

/// One deterministic frame: byte `(col + 3 * row + 7 * index) mod 256` in
/// every plane.
pub fn pattern_frame(
    format: Pixel,
    width: u32,
    height: u32,
    index: i64,
    time_base: Rational,
) -> Frame {
    let mut video = Video::new(format, width, height);
    for plane in 0..video.planes() {
        let stride = video.stride(plane);
        let rows = video.plane_height(plane) as usize;
        let data = video.data_mut(plane);
        for (row, line) in data.chunks_mut(stride).take(rows).enumerate() {
            for (col, byte) in line.iter_mut().enumerate() {
                *byte = (col as i64 + 3 * row as i64 + 7 * index).rem_euclid(256) as u8;
            }
        }
    }
    video.set_pts(Some(index));
    Frame::new(video, time_base)
}
