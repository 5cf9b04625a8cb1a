mod settings;

use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use crossbeam_channel::Receiver;

use depthcap_core::capture::infrastructure::test_pattern_source::TestPatternSource;
use depthcap_core::encode::infrastructure::frame_stats_consumer::FrameStatsConsumer;
use depthcap_core::filter::domain::error_reporter::ErrorReporter;
use depthcap_core::pipeline::filter_stream_use_case::FilterStreamUseCase;
use depthcap_core::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
use depthcap_core::pipeline::pipeline_executor::RunConfig;
use depthcap_core::pipeline::pipeline_logger::LogPipelineLogger;

use settings::FilterSettings;

/// Runs a synthetic depth capture stream through the scale/convert filter.
#[derive(Parser)]
#[command(name = "depthcap-filter")]
struct Cli {
    /// JSON settings file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Capture width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Capture height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Capture frame rate: 30, 30000/1001 or 29.97.
    #[arg(long)]
    fps: Option<String>,

    /// Capture pixel format (ffmpeg name, e.g. gray16le, bgra, nv12).
    #[arg(long)]
    format: Option<String>,

    /// Convert to this pixel format. Defaults to the capture format.
    #[arg(long)]
    output_format: Option<String>,

    /// Uniform scale factor applied to both axes.
    #[arg(long)]
    scale: Option<f32>,

    /// Filter worker threads (0 = automatic).
    #[arg(long)]
    threads: Option<u32>,

    /// Scaling algorithm: fast_bilinear, bilinear, bicubic, area, neighbor, lanczos.
    #[arg(long)]
    scaling: Option<String>,

    /// Frames accepted before the filter must be drained.
    #[arg(long)]
    queue_limit: Option<usize>,

    /// Number of frames to capture.
    #[arg(long)]
    frames: Option<usize>,
}

impl Cli {
    fn apply_to(self, settings: &mut FilterSettings) {
        if let Some(width) = self.width {
            settings.width = width;
        }
        if let Some(height) = self.height {
            settings.height = height;
        }
        if let Some(fps) = self.fps {
            settings.fps = fps;
        }
        if let Some(format) = self.format {
            settings.format = format;
        }
        if self.output_format.is_some() {
            settings.output_format = self.output_format;
        }
        if let Some(scale) = self.scale {
            settings.scale = scale;
        }
        if let Some(threads) = self.threads {
            settings.threads = threads;
        }
        if let Some(scaling) = self.scaling {
            settings.scaling = scaling;
        }
        if let Some(limit) = self.queue_limit {
            settings.queue_limit = limit;
        }
        if let Some(frames) = self.frames {
            settings.frames = frames;
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = load_settings(cli)?;
    let (input, options) = settings.resolve()?;
    log::info!("Capture stream: {input}");

    let (reporter, errors) = ErrorReporter::channel();
    let consumer = FrameStatsConsumer::new();
    let stats = consumer.stats_handle();

    let mut use_case = FilterStreamUseCase::new(
        Box::new(TestPatternSource::new(input, settings.frames)),
        Box::new(consumer),
        Box::new(ThreadedPipelineExecutor::new()),
        options,
        reporter,
    );

    let total = settings.frames;
    let progress: Box<dyn Fn(usize) -> bool + Send> = Box::new(move |done| {
        eprint!("\rFiltered frame {done}/{total}");
        true
    });
    let result = use_case.execute(RunConfig {
        on_progress: Some(progress),
        cancelled: Arc::new(AtomicBool::new(false)),
        logger: Box::new(LogPipelineLogger::default()),
    });
    eprintln!();

    print_reported(&errors);
    let summary = result?;

    let stats = stats.lock().map_err(|_| "Consumer stats lock poisoned")?;
    println!("Output: {}", summary.output);
    println!(
        "Captured {} frames, filtered {}, consumed {} ({} bytes, {} out of order)",
        summary.frames_captured, summary.frames_filtered, stats.frames, stats.bytes, stats.out_of_order
    );
    Ok(())
}

fn load_settings(cli: Cli) -> Result<FilterSettings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.config {
        Some(path) => FilterSettings::load(path)?,
        None => FilterSettings::default(),
    };
    cli.apply_to(&mut settings);
    Ok(settings)
}

/// Prints errors the filter reported from whichever thread hit them.
fn print_reported(errors: &Receiver<String>) {
    for message in errors.try_iter() {
        eprintln!("Filter error: {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["depthcap-filter"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_no_flags_uses_defaults() {
        let settings = load_settings(parse(&[])).unwrap();
        assert_eq!(settings, FilterSettings::default());
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = parse(&[
            "--width",
            "320",
            "--height",
            "288",
            "--fps",
            "15",
            "--format",
            "bgra",
            "--output-format",
            "nv12",
            "--scale",
            "0.25",
            "--threads",
            "4",
            "--scaling",
            "area",
            "--queue-limit",
            "2",
            "--frames",
            "10",
        ]);
        let settings = load_settings(cli).unwrap();

        assert_eq!((settings.width, settings.height), (320, 288));
        assert_eq!(settings.fps, "15");
        assert_eq!(settings.format, "bgra");
        assert_eq!(settings.output_format.as_deref(), Some("nv12"));
        assert_eq!(settings.scale, 0.25);
        assert_eq!(settings.threads, 4);
        assert_eq!(settings.scaling, "area");
        assert_eq!(settings.queue_limit, 2);
        assert_eq!(settings.frames, 10);
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "width": 1024, "height": 1024, "scale": 0.5 }}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let settings = load_settings(parse(&["--config", &path, "--scale", "0.75"])).unwrap();

        assert_eq!((settings.width, settings.height), (1024, 1024));
        assert_eq!(settings.scale, 0.75);
    }

    #[test]
    fn test_missing_config_file_is_error() {
        assert!(load_settings(parse(&["--config", "/nonexistent/depthcap.json"])).is_err());
    }

    #[test]
    fn test_print_reported_drains_channel() {
        let (reporter, errors) = ErrorReporter::channel();
        reporter.report("scale must be positive");
        print_reported(&errors);
        assert!(errors.try_recv().is_err());
    }
}
