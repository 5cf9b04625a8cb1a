use std::fmt;
use std::sync::Arc;

use ffmpeg_next::ffi;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::util::frame::video::Video;
use ffmpeg_next::Rational;
use ndarray::{s, ArrayView2};

/// A single captured or filtered image with its timing metadata.
///
/// Cloning is a reference-count bump: capture, filter and encoder stages can
/// each hold the same frame without copying pixels. The buffer is never
/// mutated once wrapped.
#[derive(Clone)]
pub struct Frame {
    video: Arc<Video>,
    time_base: Rational,
}

// Safety: the wrapped AVFrame is immutable after construction and its buffers
// are reference counted by libavutil, so sharing it between threads is sound.
unsafe impl Send for Frame {}
unsafe impl Sync for Frame {}

impl Frame {
    pub fn new(video: Video, time_base: Rational) -> Self {
        Self {
            video: Arc::new(video),
            time_base,
        }
    }

    pub fn width(&self) -> u32 {
        self.video.width()
    }

    pub fn height(&self) -> u32 {
        self.video.height()
    }

    pub fn format(&self) -> Pixel {
        self.video.format()
    }

    pub fn pts(&self) -> Option<i64> {
        self.video.pts()
    }

    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    pub fn planes(&self) -> usize {
        self.video.planes()
    }

    pub fn stride(&self, plane: usize) -> usize {
        self.video.stride(plane)
    }

    /// Raw plane bytes, including any stride padding at the end of each row.
    pub fn plane(&self, plane: usize) -> &[u8] {
        self.video.data(plane)
    }

    /// Bytes of real pixel data per row of `plane`, excluding padding.
    pub fn row_bytes(&self, plane: usize) -> usize {
        let linesize = unsafe {
            ffi::av_image_get_linesize(self.format().into(), self.width() as i32, plane as i32)
        };
        linesize.max(0) as usize
    }

    /// Rows of `plane` trimmed to [`Frame::row_bytes`].
    pub fn visible_plane(&self, plane: usize) -> ArrayView2<'_, u8> {
        let stride = self.stride(plane);
        let rows = self.video.plane_height(plane) as usize;
        let row_bytes = self.row_bytes(plane).min(stride);
        let data = &self.plane(plane)[..rows * stride];
        ArrayView2::from_shape((rows, stride), data)
            .expect("plane length must equal stride * rows")
            .slice_move(s![.., ..row_bytes])
    }

    pub fn video(&self) -> &Video {
        &self.video
    }

    /// Number of live handles to this frame's buffer.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.video)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("format", &self.format())
            .field("pts", &self.pts())
            .field("time_base", &self.time_base)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_frame(width: u32, height: u32, value: u8, pts: i64) -> Frame {
        let mut video = Video::new(Pixel::GRAY8, width, height);
        video.data_mut(0).fill(value);
        video.set_pts(Some(pts));
        Frame::new(video, Rational(1, 30))
    }

    #[test]
    fn test_construction_and_accessors() {
        let frame = gray_frame(4, 2, 7, 5);
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.format(), Pixel::GRAY8);
        assert_eq!(frame.pts(), Some(5));
        assert_eq!(frame.time_base().numerator(), 1);
        assert_eq!(frame.time_base().denominator(), 30);
    }

    #[test]
    fn test_clone_shares_buffer() {
        let frame = gray_frame(4, 4, 1, 0);
        let cloned = frame.clone();
        assert_eq!(frame.handle_count(), 2);
        assert_eq!(frame.plane(0).as_ptr(), cloned.plane(0).as_ptr());
        drop(cloned);
        assert_eq!(frame.handle_count(), 1);
    }

    #[test]
    fn test_visible_plane_strips_padding() {
        let frame = gray_frame(6, 3, 9, 0);
        let view = frame.visible_plane(0);
        assert_eq!(view.shape(), &[3, 6]);
        assert!(view.iter().all(|&b| b == 9));
    }

    #[test]
    fn test_row_bytes_for_depth_format() {
        let video = Video::new(Pixel::GRAY16LE, 10, 2);
        let frame = Frame::new(video, Rational(1, 30));
        assert_eq!(frame.row_bytes(0), 20);
        assert_eq!(frame.visible_plane(0).shape(), &[2, 20]);
    }

    #[test]
    fn test_row_bytes_for_chroma_planes() {
        let video = Video::new(Pixel::YUV420P, 8, 4);
        let frame = Frame::new(video, Rational(1, 30));
        assert_eq!(frame.planes(), 3);
        assert_eq!(frame.row_bytes(0), 8);
        assert_eq!(frame.row_bytes(1), 4);
        assert_eq!(frame.visible_plane(2).shape(), &[2, 4]);
    }

    #[test]
    fn test_debug_names_geometry() {
        let text = format!("{:?}", gray_frame(2, 2, 0, 3));
        assert!(text.contains("width: 2"));
        assert!(text.contains("pts: Some(3)"));
    }
}
