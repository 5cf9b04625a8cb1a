use std::fmt;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::Rational;

use crate::shared::pixel_format::pixel_format_name;

/// Geometry, pixel format and timing of a frame stream.
///
/// Describes both what a capture source negotiated and what a filter
/// pipeline resolved for its output.
#[derive(Clone, Copy, Debug)]
pub struct StreamFormat {
    pub width: u32,
    pub height: u32,
    pub pixel_format: Pixel,
    /// Nominal frames per second. Not re-estimated for variable-rate input.
    pub frame_rate: Rational,
    pub time_base: Rational,
}

impl StreamFormat {
    /// Builds a format whose time base ticks once per frame.
    pub fn new(width: u32, height: u32, pixel_format: Pixel, frame_rate: Rational) -> Self {
        Self {
            width,
            height,
            pixel_format,
            frame_rate,
            time_base: Rational(frame_rate.denominator(), frame_rate.numerator()),
        }
    }

    pub fn fps(&self) -> f64 {
        if self.frame_rate.denominator() == 0 {
            0.0
        } else {
            self.frame_rate.numerator() as f64 / self.frame_rate.denominator() as f64
        }
    }

    pub fn same_geometry(&self, other: &StreamFormat) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.pixel_format == other.pixel_format
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} {} @ {}/{} fps",
            self.width,
            self.height,
            pixel_format_name(self.pixel_format).unwrap_or("unknown"),
            self.frame_rate.numerator(),
            self.frame_rate.denominator()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_time_base_is_inverse_of_frame_rate() {
        let format = StreamFormat::new(640, 576, Pixel::GRAY16LE, Rational(30000, 1001));
        assert_eq!(format.time_base.numerator(), 1001);
        assert_eq!(format.time_base.denominator(), 30000);
    }

    #[test]
    fn test_fps() {
        let format = StreamFormat::new(640, 576, Pixel::GRAY16LE, Rational(30, 1));
        assert_relative_eq!(format.fps(), 30.0);
    }

    #[test]
    fn test_same_geometry_ignores_timing() {
        let a = StreamFormat::new(320, 288, Pixel::YUV420P, Rational(30, 1));
        let b = StreamFormat::new(320, 288, Pixel::YUV420P, Rational(15, 1));
        let c = StreamFormat::new(320, 288, Pixel::NV12, Rational(30, 1));
        assert!(a.same_geometry(&b));
        assert!(!a.same_geometry(&c));
    }

    #[test]
    fn test_display() {
        let format = StreamFormat::new(640, 576, Pixel::GRAY16LE, Rational(30, 1));
        assert_eq!(format.to_string(), "640x576 gray16le @ 30/1 fps");
    }
}
