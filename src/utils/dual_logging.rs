use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use super::app_paths::AppPaths;
use super::logging::{LogEntry, LogRingBuffer};

pub const CONSOLE_DEBUG_ENV: &str = "CLUSTER_CONSOLE_DEBUG";

static DUAL_LOGGER: OnceLock<DualLogger> = OnceLock::new();

/// Writes every entry to the in-memory ring buffer (F5 view) and a session log file.
pub struct DualLogger {
    ring_buffer: LogRingBuffer,
    log_file: Mutex<Option<File>>,
    log_path: PathBuf,
    echo_stderr: bool,
}

impl DualLogger {
    pub fn new() -> Self {
        let log_dir =
            AppPaths::log_dir().unwrap_or_else(|_| std::env::temp_dir().join("cluster-console"));
        Self::in_dir(&log_dir)
    }

    /// Logger writing `cluster-console_<timestamp>.log` under `log_dir`,
    /// with `latest.log` pointing at it.
    pub fn in_dir(log_dir: &Path) -> Self {
        let _ = std::fs::create_dir_all(log_dir);

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_path = log_dir.join(format!("cluster-console_{}.log", timestamp));
        let latest_path = log_dir.join("latest.log");

        #[cfg(unix)]
        {
            let _ = std::fs::remove_file(&latest_path);
            let _ = std::os::unix::fs::symlink(&log_path, &latest_path);
        }

        #[cfg(windows)]
        {
            let _ = std::fs::write(
                &latest_path,
                format!("Current log file: {}\n", log_path.display()),
            );
        }

        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .ok();

        Self {
            ring_buffer: LogRingBuffer::new(),
            log_file: Mutex::new(log_file),
            log_path,
            echo_stderr: std::env::var(CONSOLE_DEBUG_ENV).is_ok(),
        }
    }

    pub fn log(&self, entry: LogEntry) {
        if let Ok(mut file) = self.log_file.lock() {
            if let Some(file) = file.as_mut() {
                let line = format!(
                    "[{}] {} [{}] {}\n",
                    entry.timestamp, entry.level, entry.target, entry.message
                );
                let _ = file.write_all(line.as_bytes());
                let _ = file.flush();
            }
        }

        if self.echo_stderr {
            eprintln!("{}", entry.format_for_display());
        }

        self.ring_buffer.push(entry);
    }

    pub fn ring_buffer(&self) -> &LogRingBuffer {
        &self.ring_buffer
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn flush(&self) {
        if let Ok(mut file) = self.log_file.lock() {
            if let Some(file) = file.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

impl Default for DualLogger {
    fn default() -> Self {
        Self::new()
    }
}

pub fn init_dual_logger() -> &'static DualLogger {
    DUAL_LOGGER.get_or_init(DualLogger::new)
}

pub fn get_dual_logger() -> Option<&'static DualLogger> {
    DUAL_LOGGER.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tracing::Level;

    #[test]
    fn test_writes_file_and_buffer() {
        let dir = TempDir::new().unwrap();
        let logger = DualLogger::in_dir(dir.path());

        logger.log(LogEntry::new(Level::WARN, "navigation", "stale response".to_string()));
        logger.flush();

        let contents = std::fs::read_to_string(logger.log_path()).unwrap();
        assert!(contents.contains("WARN [navigation] stale response"));
        assert_eq!(logger.ring_buffer().len(), 1);

        #[cfg(unix)]
        assert!(dir.path().join("latest.log").exists());
    }
}
