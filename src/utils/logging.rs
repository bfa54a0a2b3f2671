use chrono::Local;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use super::dual_logging::{init_dual_logger, DualLogger};

/// Maximum number of log entries to keep in memory
const MAX_LOG_ENTRIES: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: Level, target: &str, message: String) -> Self {
        Self {
            timestamp: Local::now().format("%H:%M:%S.%3f").to_string(),
            level: level.to_string().to_uppercase(),
            target: target.to_string(),
            message,
        }
    }

    pub fn format_for_display(&self) -> String {
        format!(
            "[{}] {} [{}] {}",
            self.timestamp, self.level, self.target, self.message
        )
    }
}

/// Thread-safe ring buffer for log entries
#[derive(Clone, Default)]
pub struct LogRingBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl LogRingBuffer {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LOG_ENTRIES))),
        }
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.entries();
        if entries.len() >= MAX_LOG_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// The last `count` entries, oldest first.
    pub fn get_recent(&self, count: usize) -> Vec<LogEntry> {
        let entries = self.entries();
        let skip = entries.len().saturating_sub(count);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Split a compact-format line ("LEVEL target: message") into its parts.
fn parse_compact_line(line: &str) -> Option<(Level, &str, &str)> {
    let (level, rest) = line.split_once(' ')?;
    let level = match level {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "INFO" => Level::INFO,
        "WARN" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => return None,
    };
    let rest = rest.trim_start();

    match rest.split_once(':') {
        Some((target, message)) if !target.contains(' ') => Some((level, target, message.trim())),
        _ => Some((level, "general", rest)),
    }
}

/// Writer handed to tracing-subscriber; every formatted line goes to the dual logger.
#[derive(Clone)]
pub struct DualWriter {
    logger: &'static DualLogger,
}

impl DualWriter {
    pub fn new(logger: &'static DualLogger) -> Self {
        Self { logger }
    }
}

impl std::io::Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(text) = std::str::from_utf8(buf) {
            for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                let entry = match parse_compact_line(line) {
                    Some((level, target, message)) => {
                        LogEntry::new(level, target, message.to_string())
                    }
                    None => LogEntry::new(Level::INFO, "general", line.to_string()),
                };
                self.logger.log(entry);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.logger.flush();
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for DualWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Ring buffer of the global logger, for the F5 log view.
pub fn get_log_buffer() -> Option<LogRingBuffer> {
    super::dual_logging::get_dual_logger().map(|logger| logger.ring_buffer().clone())
}

/// Install the global subscriber writing to the ring buffer and the log file.
/// `RUST_LOG` controls the filter; the default is `info`.
pub fn init_tracing_with_dual_logging() -> LogRingBuffer {
    let logger = init_dual_logger();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = tracing_subscriber::fmt()
        .with_writer(DualWriter::new(logger))
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false)
        .without_time()
        .compact()
        .try_init();

    if result.is_ok() {
        tracing::info!(target: "system", "logging to {}", logger.log_path().display());
    }

    logger.ring_buffer().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_caps_entries() {
        let buffer = LogRingBuffer::new();
        for i in 0..MAX_LOG_ENTRIES + 5 {
            buffer.push(LogEntry::new(Level::INFO, "test", format!("entry {}", i)));
        }
        assert_eq!(buffer.len(), MAX_LOG_ENTRIES);

        let recent = buffer.get_recent(2);
        assert_eq!(recent[0].message, format!("entry {}", MAX_LOG_ENTRIES + 3));
        assert_eq!(recent[1].message, format!("entry {}", MAX_LOG_ENTRIES + 4));

        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_parse_compact_line() {
        assert_eq!(
            parse_compact_line("WARN navigation: discarding stale response"),
            Some((Level::WARN, "navigation", "discarding stale response"))
        );
        assert_eq!(
            parse_compact_line("INFO no target here: x"),
            Some((Level::INFO, "general", "no target here: x"))
        );
        assert_eq!(parse_compact_line("hello world"), None);
    }
}
