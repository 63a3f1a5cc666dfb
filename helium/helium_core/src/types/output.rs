//! Output sinks.
//!
//! Applications write user-visible results to an append-only sink owned by
//! the paragraph that runs them.

use parking_lot::Mutex;

/// Append-only stream of user-visible output.
pub trait OutputSink: Send + Sync {
    /// Append text to the stream.
    fn write(&self, text: &str);

    /// Discard everything written so far.
    fn clear(&self);
}

/// Output sink that keeps everything in memory.
#[derive(Default)]
pub struct BufferedOutput {
    buffer: Mutex<String>,
}

impl BufferedOutput {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> String {
        self.buffer.lock().clone()
    }
}

impl OutputSink for BufferedOutput {
    fn write(&self, text: &str) {
        self.buffer.lock().push_str(text);
    }

    fn clear(&self) {
        self.buffer.lock().clear();
    }
}
