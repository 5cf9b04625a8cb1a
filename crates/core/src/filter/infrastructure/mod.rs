pub mod ffmpeg_filter_pipeline;
pub mod ffmpeg_graph_builder;
