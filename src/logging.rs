//! Decoupled logging pipeline for build runs.
//!
//! A single collector receives every `log::*` record over an unbounded
//! crossbeam channel and a background persister thread writes it out, so log
//! delivery never blocks the patch step and every line reaches disk even when
//! the run is killed right after a flush. Records are mirrored to stderr for
//! visibility in the CI transcript.
//!
//! The flush protocol is a marker message carrying an ack channel: `flush()`
//! returns only after the persister has drained everything queued before it.

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

/// A log line with metadata
#[derive(Clone, Debug)]
pub struct LogLine {
    pub message: String,
    pub level: log::Level,
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: log::Level, message: String) -> Self {
        LogLine {
            message,
            level,
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }
}

/// Internal log line or special marker
enum LogMessage {
    /// Regular log line
    Line(LogLine),
    /// Flush marker with channel sender to signal completion
    Flush(std::sync::mpsc::Sender<()>),
}

/// Collector handling disk persistence and stderr mirroring.
#[derive(Clone)]
pub struct LogCollector {
    tx: Sender<LogMessage>,
    min_level: LevelFilter,
}

impl LogCollector {
    /// Create a collector with a background persister thread.
    ///
    /// When `log_dir` is given, lines are appended to a per-run file under it;
    /// a failure to open the file degrades to stderr-only instead of failing
    /// the build.
    pub fn new(log_dir: Option<PathBuf>, min_level: LevelFilter) -> Self {
        let (tx, rx) = unbounded::<LogMessage>();

        let mut log_file = log_dir.and_then(|dir| open_run_log(&dir));

        // Plain OS thread: the pipeline is synchronous and the persister must
        // outlive any scoped work without an async runtime.
        std::thread::spawn(move || {
            while let Ok(message) = rx.recv() {
                match message {
                    LogMessage::Line(line) => {
                        let rendered =
                            format!("[{}] [{}] {}", line.timestamp, line.level, line.message);
                        eprintln!("{}", rendered);
                        if let Some(file) = log_file.as_mut() {
                            // Disk is best effort once the run started
                            let _ = writeln!(file, "{}", rendered);
                        }
                    }
                    LogMessage::Flush(ack) => {
                        if let Some(file) = log_file.as_mut() {
                            let _ = file.flush();
                        }
                        let _ = ack.send(());
                    }
                }
            }
        });

        LogCollector { tx, min_level }
    }

    /// Block until every line queued before this call is persisted.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = std::sync::mpsc::channel();
        if self.tx.send(LogMessage::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv_timeout(Duration::from_secs(5));
        }
    }
}

impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.min_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = LogLine::new(record.level(), record.args().to_string());
        let _ = self.tx.send(LogMessage::Line(line));
    }

    fn flush(&self) {
        LogCollector::flush(self);
    }
}

/// Wire a collector as the global logger for the `log` facade.
///
/// Returns the collector handle so the caller can flush before exiting.
pub fn initialize_logging(log_dir: Option<PathBuf>, verbose: bool) -> LogCollector {
    let min_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let collector = LogCollector::new(log_dir, min_level);
    if log::set_boxed_logger(Box::new(collector.clone())).is_ok() {
        log::set_max_level(min_level);
    }
    collector
}

/// Open the per-run log file under `dir`, creating the directory as needed.
fn open_run_log(dir: &PathBuf) -> Option<File> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("[Log] Failed to create log directory {}: {}", dir.display(), e);
        return None;
    }
    let path = dir.join(format!(
        "fadogen-build-{}.log",
        Local::now().format("%Y%m%d-%H%M%S")
    ));
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("[Log] Failed to open log file {}: {}", path.display(), e);
            None
        }
    }
}
