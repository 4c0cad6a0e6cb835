//! Stdio sinks receive the output of a server's install steps line by line.

use std::sync::Arc;

use log::{info, warn};

pub trait StdioSink: Send + Sync {
    fn stdout(&self, line: &str);
    fn stderr(&self, line: &str);
}

/// Forwards install output to the log, prefixed with the server name.
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl StdioSink for LogSink {
    fn stdout(&self, line: &str) {
        info!("[{}] {}", self.name, line);
    }

    fn stderr(&self, line: &str) {
        warn!("[{}] {}", self.name, line);
    }
}

/// The sink handed to each install in a batch.
pub fn simple_sink(name: &str) -> Arc<dyn StdioSink> {
    Arc::new(LogSink::new(name))
}
