//! Destination for the messages an attempt controller produces
//!
//! Everything the controller reports also goes to the `log` facade. A sink
//! keeps a copy for the caller, e.g. to attach to a notification once the
//! solve has ended.

use log::Level;

pub trait LogSink {
    fn record(&mut self, level: Level, message: &str);

    /// Hand over everything recorded so far and start empty
    fn flush(&mut self) -> String {
        String::new()
    }
}

/// Keeps every line in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryLogSink {
    lines: Vec<String>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Recorded text, one line per message, without clearing
    pub fn contents(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

impl LogSink for MemoryLogSink {
    fn record(&mut self, level: Level, message: &str) {
        self.lines.push(format!("[{level}] {message}"));
    }

    fn flush(&mut self) -> String {
        let out = self.contents();
        self.lines.clear();
        out
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogSink;

impl LogSink for NullLogSink {
    fn record(&mut self, _level: Level, _message: &str) {}
}
