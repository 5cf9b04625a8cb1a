use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use depthcap_core::filter::domain::filter_config::ScalingAlgorithm;
use depthcap_core::pipeline::filter_stream_use_case::FilterOptions;
use depthcap_core::shared::constants::{
    DEFAULT_CAPTURE_FORMAT, DEFAULT_CAPTURE_FPS, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH,
    DEFAULT_QUEUE_LIMIT,
};
use depthcap_core::shared::pixel_format::{parse_frame_rate, pixel_format_from_name};
use depthcap_core::shared::stream_format::StreamFormat;

/// Capture mode and filter parameters, loadable from a JSON file.
///
/// Every field has a default, so a file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub width: u32,
    pub height: u32,
    /// `"30"`, `"30000/1001"` or `"29.97"`.
    pub fps: String,
    /// ffmpeg pixel format name of the captured stream.
    pub format: String,
    pub output_format: Option<String>,
    pub scale: f32,
    pub threads: u32,
    pub scaling: String,
    pub queue_limit: usize,
    /// Frames the test pattern source emits.
    pub frames: usize,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            fps: DEFAULT_CAPTURE_FPS.to_string(),
            format: DEFAULT_CAPTURE_FORMAT.to_string(),
            output_format: None,
            scale: 0.5,
            threads: 0,
            scaling: ScalingAlgorithm::default().to_string(),
            queue_limit: DEFAULT_QUEUE_LIMIT,
            frames: 300,
        }
    }
}

impl FilterSettings {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let json = fs::read_to_string(path)
            .map_err(|e| format!("Cannot read settings {}: {e}", path.display()))?;
        let settings = serde_json::from_str(&json)
            .map_err(|e| format!("Invalid settings {}: {e}", path.display()))?;
        Ok(settings)
    }

    /// Resolves names into the capture stream and filter options.
    ///
    /// Numeric ranges are left to `FilterConfig::validate`, which reports
    /// them through the pipeline's error callback.
    pub fn resolve(&self) -> Result<(StreamFormat, FilterOptions), String> {
        let pixel_format = pixel_format_from_name(&self.format)
            .ok_or_else(|| format!("Unknown pixel format '{}'", self.format))?;
        let frame_rate = parse_frame_rate(&self.fps)?;
        let output_format = match &self.output_format {
            Some(name) => Some(
                pixel_format_from_name(name)
                    .ok_or_else(|| format!("Unknown output pixel format '{name}'"))?,
            ),
            None => None,
        };
        let scaling = self.scaling.parse::<ScalingAlgorithm>()?;

        let input = StreamFormat::new(self.width, self.height, pixel_format, frame_rate);
        let options = FilterOptions {
            scale: self.scale,
            threads: self.threads,
            output_format,
            scaling,
            queue_limit: self.queue_limit,
        };
        Ok((input, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use depthcap_core::ffmpeg_next::format::Pixel;

    fn write_settings(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_describe_depth_stream() {
        let (input, options) = FilterSettings::default().resolve().unwrap();
        assert_eq!((input.width, input.height), (640, 576));
        assert_eq!(input.pixel_format, Pixel::GRAY16LE);
        assert_eq!(input.frame_rate.numerator(), 30);
        assert_eq!(options.scaling, ScalingAlgorithm::Bicubic);
        assert_eq!(options.queue_limit, DEFAULT_QUEUE_LIMIT);
        assert!(options.output_format.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_settings(r#"{ "scale": 0.25, "output_format": "gray8" }"#);
        let settings = FilterSettings::load(file.path()).unwrap();

        assert_eq!(settings.scale, 0.25);
        assert_eq!(settings.output_format.as_deref(), Some("gray8"));
        assert_eq!(settings.width, DEFAULT_CAPTURE_WIDTH);
        assert_eq!(settings.frames, 300);
    }

    #[test]
    fn test_round_trips_through_json() {
        let settings = FilterSettings {
            fps: "30000/1001".into(),
            scaling: "lanczos".into(),
            ..FilterSettings::default()
        };
        let file = write_settings(&serde_json::to_string_pretty(&settings).unwrap());
        assert_eq!(FilterSettings::load(file.path()).unwrap(), settings);
    }

    #[test]
    fn test_malformed_file_names_path() {
        let file = write_settings("{ not json");
        let err = FilterSettings::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid settings"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FilterSettings::load(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_unknown_names_are_rejected() {
        let bad_format = FilterSettings {
            format: "gray17".into(),
            ..FilterSettings::default()
        };
        assert!(bad_format.resolve().is_err());

        let bad_scaling = FilterSettings {
            scaling: "sinc2".into(),
            ..FilterSettings::default()
        };
        assert!(bad_scaling.resolve().is_err());

        let bad_fps = FilterSettings {
            fps: "fast".into(),
            ..FilterSettings::default()
        };
        assert!(bad_fps.resolve().is_err());
    }
}
