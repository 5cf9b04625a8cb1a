use std::fmt;
use std::sync::Arc;

use crossbeam_channel::Receiver;

/// Receives human-readable error messages. May be called from any thread.
pub type ErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Delivers pipeline errors to whoever owns the pipeline.
///
/// The callback runs synchronously on the thread that detected the failure.
/// Nothing is queued or retried here; forwarding to another thread (a UI
/// loop, a supervisor) is the owner's job, e.g. via [`ErrorReporter::channel`].
#[derive(Clone, Default)]
pub struct ErrorReporter {
    callback: Option<ErrorCallback>,
}

impl ErrorReporter {
    pub fn new(callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            callback: Some(Arc::new(callback)),
        }
    }

    /// Reporter that only logs.
    pub fn silent() -> Self {
        Self { callback: None }
    }

    pub fn from_callback(callback: Option<ErrorCallback>) -> Self {
        Self { callback }
    }

    /// Reporter that forwards every message into an unbounded channel, so the
    /// owner can pick messages up on its own thread.
    pub fn channel() -> (Self, Receiver<String>) {
        let (tx, rx) = crossbeam_channel::unbounded::<String>();
        let reporter = Self::new(move |message| {
            let _ = tx.send(message.to_string());
        });
        (reporter, rx)
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub fn report(&self, message: &str) {
        log::error!("{message}");
        if let Some(callback) = &self.callback {
            callback(message);
        }
    }
}

impl fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("has_callback", &self.has_callback())
            .finish()
    }
}
