//! Depth camera frame filtering: a libavfilter `buffer -> scale -> buffersink`
//! graph driven by a push/drain protocol, plus the capture and consumer
//! ports a recorder plugs into it.

pub use ffmpeg_next;

pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod pixel_format;
    pub mod stream_format;
}

pub mod filter {
    pub mod domain {
        pub mod error_reporter;
        pub mod filter_config;
        pub mod filter_error;
        pub mod frame_filter;
    }
    pub mod infrastructure;
}

pub mod capture {
    pub mod domain {
        pub mod frame_source;
    }
    pub mod infrastructure {
        pub mod test_pattern_source;
    }
}

pub mod encode {
    pub mod domain {
        pub mod frame_consumer;
    }
    pub mod infrastructure {
        pub mod frame_stats_consumer;
    }
}

pub mod pipeline {
    pub mod filter_stream_use_case;
    pub mod pipeline_executor;
    pub mod pipeline_logger;
    pub mod infrastructure {
        pub mod threaded_pipeline_executor;
    }
}
