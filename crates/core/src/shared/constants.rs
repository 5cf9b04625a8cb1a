/// Graph node names. Nodes are looked up by name so no handle can outlive the graph.
pub const SOURCE_NODE: &str = "in";
pub const SCALE_NODE: &str = "scale";
pub const SINK_NODE: &str = "out";

/// Smallest output dimension, used only when `floor(dim * scale)` is 0.
pub const MIN_OUTPUT_DIMENSION: u32 = 1;

/// Largest dimension accepted on either side of the graph.
pub const MAX_DIMENSION: u32 = 16384;

/// Frames accepted by `send_frame` before the caller must drain.
pub const DEFAULT_QUEUE_LIMIT: usize = 8;

/// Depth stream of the default capture mode (NFOV unbinned, 30 fps).
pub const DEFAULT_CAPTURE_WIDTH: u32 = 640;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 576;
pub const DEFAULT_CAPTURE_FPS: i32 = 30;
pub const DEFAULT_CAPTURE_FORMAT: &str = "gray16le";
