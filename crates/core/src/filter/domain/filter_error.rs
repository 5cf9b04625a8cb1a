use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("invalid filter configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to initialise ffmpeg: {0}")]
    Init(#[source] ffmpeg_next::Error),
    #[error("filter '{0}' is not available in this ffmpeg build")]
    FilterUnavailable(&'static str),
    #[error("failed to create filter node '{name}': {source}")]
    CreateNode {
        name: &'static str,
        #[source]
        source: ffmpeg_next::Error,
    },
    #[error("filter node '{0}' is missing from the graph")]
    MissingNode(&'static str),
    #[error("failed to link '{from}' -> '{to}': {source}")]
    Link {
        from: &'static str,
        to: &'static str,
        #[source]
        source: ffmpeg_next::Error,
    },
    #[error("filter graph validation failed: {0}")]
    Validate(#[source] ffmpeg_next::Error),
    #[error("filter graph negotiated an unexpected output: {0}")]
    UnexpectedOutput(String),
    #[error("frame does not match the pipeline input: {0}")]
    FrameMismatch(String),
    #[error("filter graph error: {0}")]
    Graph(#[source] ffmpeg_next::Error),
    #[error("filter pipeline is already initialised")]
    AlreadyInitialized,
}
