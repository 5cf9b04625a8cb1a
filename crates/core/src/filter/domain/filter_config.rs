use std::fmt;
use std::str::FromStr;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::Rational;

use crate::shared::constants::{DEFAULT_QUEUE_LIMIT, MAX_DIMENSION, MIN_OUTPUT_DIMENSION};
use crate::shared::stream_format::StreamFormat;

use super::filter_error::FilterError;

/// Resampling kernel used by the scale node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScalingAlgorithm {
    FastBilinear,
    Bilinear,
    #[default]
    Bicubic,
    Area,
    Neighbor,
    Lanczos,
}

impl ScalingAlgorithm {
    pub const ALL: &[ScalingAlgorithm] = &[
        ScalingAlgorithm::FastBilinear,
        ScalingAlgorithm::Bilinear,
        ScalingAlgorithm::Bicubic,
        ScalingAlgorithm::Area,
        ScalingAlgorithm::Neighbor,
        ScalingAlgorithm::Lanczos,
    ];

    /// Name understood by the `flags` option of ffmpeg's scale filter.
    pub fn flag_name(self) -> &'static str {
        match self {
            ScalingAlgorithm::FastBilinear => "fast_bilinear",
            ScalingAlgorithm::Bilinear => "bilinear",
            ScalingAlgorithm::Bicubic => "bicubic",
            ScalingAlgorithm::Area => "area",
            ScalingAlgorithm::Neighbor => "neighbor",
            ScalingAlgorithm::Lanczos => "lanczos",
        }
    }
}

impl fmt::Display for ScalingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag_name())
    }
}

impl FromStr for ScalingAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        ScalingAlgorithm::ALL
            .iter()
            .copied()
            .find(|a| a.flag_name() == name)
            .ok_or_else(|| format!("unknown scaling algorithm '{s}'"))
    }
}

/// Everything the graph builder needs to know about the input stream and
/// the transformation to apply to it.
#[derive(Clone, Copy, Debug)]
pub struct FilterConfig {
    pub width: u32,
    pub height: u32,
    pub frame_rate: Rational,
    pub pixel_format: Pixel,
    /// Uniform factor for both axes. Below 1 downscales, above 1 upscales.
    pub scale: f32,
    /// Worker threads for the scale node. 0 lets ffmpeg pick.
    pub threads: u32,
    /// Output pixel format. `None` keeps the input format.
    pub output_format: Option<Pixel>,
    pub scaling: ScalingAlgorithm,
    pub queue_limit: usize,
}

impl FilterConfig {
    pub fn new(
        width: u32,
        height: u32,
        frame_rate: Rational,
        pixel_format: Pixel,
        scale: f32,
        threads: u32,
    ) -> Self {
        Self {
            width,
            height,
            frame_rate,
            pixel_format,
            scale,
            threads,
            output_format: None,
            scaling: ScalingAlgorithm::default(),
            queue_limit: DEFAULT_QUEUE_LIMIT,
        }
    }

    /// Config for filtering a stream as a capture source negotiated it.
    pub fn for_stream(input: &StreamFormat, scale: f32, threads: u32) -> Self {
        Self::new(
            input.width,
            input.height,
            input.frame_rate,
            input.pixel_format,
            scale,
            threads,
        )
    }

    pub fn with_output_format(mut self, format: Pixel) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_scaling(mut self, scaling: ScalingAlgorithm) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn with_queue_limit(mut self, limit: usize) -> Self {
        self.queue_limit = limit;
        self
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if self.width == 0 || self.height == 0 {
            return Err(FilterError::InvalidConfig(format!(
                "input size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(FilterError::InvalidConfig(format!(
                "input size {}x{} exceeds {MAX_DIMENSION}",
                self.width, self.height
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(FilterError::InvalidConfig(format!(
                "scale must be a positive number, got {}",
                self.scale
            )));
        }
        if self.frame_rate.numerator() <= 0 || self.frame_rate.denominator() <= 0 {
            return Err(FilterError::InvalidConfig(format!(
                "frame rate must be positive, got {}/{}",
                self.frame_rate.numerator(),
                self.frame_rate.denominator()
            )));
        }
        if self.pixel_format == Pixel::None {
            return Err(FilterError::InvalidConfig(
                "input pixel format is not set".to_string(),
            ));
        }
        if self.output_format == Some(Pixel::None) {
            return Err(FilterError::InvalidConfig(
                "output pixel format is not set".to_string(),
            ));
        }
        if self.queue_limit == 0 {
            return Err(FilterError::InvalidConfig(
                "queue limit must be at least 1".to_string(),
            ));
        }

        let (out_w, out_h) = self.output_size();
        if out_w > MAX_DIMENSION || out_h > MAX_DIMENSION {
            return Err(FilterError::InvalidConfig(format!(
                "scaled size {out_w}x{out_h} exceeds {MAX_DIMENSION}"
            )));
        }
        Ok(())
    }

    /// Output size after applying [`scaled_dimension`] to both axes.
    pub fn output_size(&self) -> (u32, u32) {
        (
            scaled_dimension(self.width, self.scale),
            scaled_dimension(self.height, self.scale),
        )
    }

    pub fn output_format(&self) -> Pixel {
        self.output_format.unwrap_or(self.pixel_format)
    }

    pub fn input_stream(&self) -> StreamFormat {
        StreamFormat::new(self.width, self.height, self.pixel_format, self.frame_rate)
    }
}

/// Resolves one axis of the output size.
///
/// `floor(dim * scale)`, rounded down to an even number so 4:2:0 and 4:2:2
/// chroma planes stay whole. When that would leave nothing (a floor of 0 or
/// 1) the floor itself is kept, raised to [`MIN_OUTPUT_DIMENSION`]. The
/// result never exceeds the floor unless the floor is 0.
pub fn scaled_dimension(dim: u32, scale: f32) -> u32 {
    let scaled = (dim as f64 * scale as f64).floor();
    let scaled = if scaled.is_finite() {
        scaled.clamp(0.0, u32::MAX as f64) as u32
    } else {
        0
    };
    match scaled & !1 {
        0 => scaled.max(MIN_OUTPUT_DIMENSION),
        even => even,
    }
}
