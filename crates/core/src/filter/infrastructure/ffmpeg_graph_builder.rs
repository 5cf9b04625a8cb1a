use ffmpeg_next::ffi;
use ffmpeg_next::filter::{self, Graph};
use ffmpeg_next::Rational;

use crate::filter::domain::filter_config::FilterConfig;
use crate::filter::domain::filter_error::FilterError;
use crate::shared::constants::{SCALE_NODE, SINK_NODE, SOURCE_NODE};
use crate::shared::pixel_format::pixel_format_name;
use crate::shared::stream_format::StreamFormat;

/// A configured libavfilter graph together with what it will emit.
pub struct BuiltGraph {
    pub graph: Graph,
    pub output: StreamFormat,
}

/// Builds and validates `buffer -> scale -> buffersink`.
///
/// The scale node performs both resizing and, when the sink is constrained
/// to a different pixel format, the format conversion. Any failure drops the
/// partially built graph before returning.
pub fn build_graph(config: &FilterConfig) -> Result<BuiltGraph, FilterError> {
    config.validate()?;
    ffmpeg_next::init().map_err(FilterError::Init)?;

    let (out_width, out_height) = config.output_size();
    let out_format = config.output_format();

    let mut graph = Graph::new();
    // Must be set before the first node is created; the worker pool is
    // initialised along with it.
    unsafe {
        (*graph.as_mut_ptr()).nb_threads = config.threads.min(i32::MAX as u32) as i32;
    }

    let buffer = find_filter("buffer")?;
    let scale = find_filter("scale")?;
    let sink = find_filter("buffersink")?;

    add_node(&mut graph, &buffer, SOURCE_NODE, &source_args(config))?;
    add_node(
        &mut graph,
        &scale,
        SCALE_NODE,
        &format!(
            "w={out_width}:h={out_height}:flags={}",
            config.scaling.flag_name()
        ),
    )?;
    add_node(&mut graph, &sink, SINK_NODE, "")?;
    graph
        .get(SINK_NODE)
        .ok_or(FilterError::MissingNode(SINK_NODE))?
        .set_pixel_format(out_format);

    link(&mut graph, SOURCE_NODE, SCALE_NODE)?;
    link(&mut graph, SCALE_NODE, SINK_NODE)?;

    graph.validate().map_err(FilterError::Validate)?;
    log::debug!("Filter graph:\n{}", graph.dump());

    let output = negotiated_output(&mut graph, config)?;
    log::info!(
        "Filter graph ready: {} -> {} ({} threads, {})",
        config.input_stream(),
        output,
        config.threads,
        config.scaling
    );

    Ok(BuiltGraph { graph, output })
}

fn find_filter(name: &'static str) -> Result<filter::Filter, FilterError> {
    filter::find(name).ok_or(FilterError::FilterUnavailable(name))
}

fn add_node(
    graph: &mut Graph,
    filter: &filter::Filter,
    name: &'static str,
    args: &str,
) -> Result<(), FilterError> {
    graph
        .add(filter, name, args)
        .map(|_| ())
        .map_err(|source| FilterError::CreateNode { name, source })
}

fn source_args(config: &FilterConfig) -> String {
    let rate = config.frame_rate;
    let time_base = Rational(rate.denominator(), rate.numerator());
    let pix_fmt: ffi::AVPixelFormat = config.pixel_format.into();
    format!(
        "video_size={}x{}:pix_fmt={}:time_base={}/{}:frame_rate={}/{}:pixel_aspect=1/1",
        config.width,
        config.height,
        pix_fmt as i32,
        time_base.numerator(),
        time_base.denominator(),
        rate.numerator(),
        rate.denominator()
    )
}

fn node_ptr(graph: &mut Graph, name: &'static str) -> Result<*mut ffi::AVFilterContext, FilterError> {
    let mut ctx = graph.get(name).ok_or(FilterError::MissingNode(name))?;
    Ok(unsafe { ctx.as_mut_ptr() })
}

fn link(graph: &mut Graph, from: &'static str, to: &'static str) -> Result<(), FilterError> {
    let src = node_ptr(graph, from)?;
    let dst = node_ptr(graph, to)?;
    let ret = unsafe { ffi::avfilter_link(src, 0, dst, 0) };
    if ret < 0 {
        return Err(FilterError::Link {
            from,
            to,
            source: ffmpeg_next::Error::from(ret),
        });
    }
    Ok(())
}

/// Reads back what the sink actually negotiated and checks it against the
/// requested output.
fn negotiated_output(graph: &mut Graph, config: &FilterConfig) -> Result<StreamFormat, FilterError> {
    let sink = node_ptr(graph, SINK_NODE)?;
    let (width, height, format, time_base) = unsafe {
        (
            ffi::av_buffersink_get_w(sink),
            ffi::av_buffersink_get_h(sink),
            ffi::av_buffersink_get_format(sink),
            ffi::av_buffersink_get_time_base(sink),
        )
    };

    let (want_width, want_height) = config.output_size();
    if width != want_width as i32 || height != want_height as i32 {
        return Err(FilterError::UnexpectedOutput(format!(
            "size {width}x{height}, expected {want_width}x{want_height}"
        )));
    }

    let want_format = config.output_format();
    let want_format_id: ffi::AVPixelFormat = want_format.into();
    if format != want_format_id as i32 {
        return Err(FilterError::UnexpectedOutput(format!(
            "pixel format id {format}, expected {}",
            pixel_format_name(want_format).unwrap_or("unknown")
        )));
    }

    Ok(StreamFormat {
        width: want_width,
        height: want_height,
        pixel_format: want_format,
        frame_rate: config.frame_rate,
        time_base: Rational::from(time_base),
    })
}
