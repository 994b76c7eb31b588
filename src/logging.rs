use std::{
    fmt,
    fmt::Write as _,
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    thread::{self, JoinHandle},
};

use chrono::{DateTime, Local};
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Log levels; `log::Level` has no level above `Error`, so this carries `Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info,
    Warn,
    Error,
    Critical,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        })
    }
}

#[derive(Debug, Clone)]
pub struct LogMessage {
    pub level: Level,
    pub msg: String,
    pub created_at: DateTime<Local>,
}

impl LogMessage {
    pub fn new(level: Level, msg: String) -> Self {
        LogMessage {
            level,
            msg,
            created_at: Local::now(),
        }
    }
}

/// Run-scoped logger.
///
/// Messages go through a channel to a writer thread which appends them to
/// `log/<name>_<date>.log` and echoes them to the console. `close` must be
/// called to wait for the writer before the process exits.
pub struct Logger {
    writer: Sender<LogMessage>,
    worker: Option<JoinHandle<()>>,
}

impl Logger {
    pub fn new(log_name: &str) -> Self {
        let log_path = Self::get_log_path(log_name);
        let (tx, rx) = unbounded::<LogMessage>();

        // 寫入檔案的操作使用另一個線程處理
        let worker = thread::spawn(move || write_logs(log_path, rx));

        Logger {
            writer: tx,
            worker: Some(worker),
        }
    }

    /// A logger whose messages are handed to the returned receiver instead of
    /// being written anywhere.
    pub fn capture() -> (Self, Receiver<LogMessage>) {
        let (tx, rx) = unbounded::<LogMessage>();
        (
            Logger {
                writer: tx,
                worker: None,
            },
            rx,
        )
    }

    pub fn info(&self, log: impl Into<String>) {
        self.send(Level::Info, log.into());
    }

    pub fn warn(&self, log: impl Into<String>) {
        self.send(Level::Warn, log.into());
    }

    pub fn error(&self, log: impl Into<String>) {
        self.send(Level::Error, log.into());
    }

    pub fn critical(&self, log: impl Into<String>) {
        self.send(Level::Critical, log.into());
    }

    fn send(&self, level: Level, msg: String) {
        if let Err(why) = self.writer.send(LogMessage::new(level, msg)) {
            console(&why.into_inner());
        }
    }

    /// Stops accepting messages and waits until everything is written.
    pub fn close(self) {
        let Logger { writer, worker } = self;
        drop(writer);

        if let Some(worker) = worker {
            if worker.join().is_err() {
                console(&LogMessage::new(
                    Level::Error,
                    "The log writer thread panicked".to_string(),
                ));
            }
        }
    }

    fn get_log_path(name: &str) -> Option<PathBuf> {
        let path = Path::new("log");

        if !path.exists() {
            fs::create_dir_all(path).ok()?;
        }

        let mut log_path = PathBuf::from(path);
        log_path.push(format!("{}_{}.log", name, Local::now().format("%Y-%m-%d")));

        Some(log_path)
    }
}

/// 批次寫入檔案，無法開檔時只輸出到 console
fn write_logs(log_path: Option<PathBuf>, rx: Receiver<LogMessage>) {
    let mut writer = log_path.and_then(|p| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(p)
            .ok()
            .map(BufWriter::new)
    });
    let mut line = String::with_capacity(4096);

    while let Ok(received) = rx.recv() {
        console(&received);

        if writeln!(
            &mut line,
            "{} {} {}",
            received.created_at.format("%F %X%.6f"),
            received.level,
            received.msg
        )
        .is_err()
        {
            continue;
        }

        if rx.is_empty() || line.len() >= 4096 {
            if let Some(w) = writer.as_mut() {
                if w.write_all(line.as_bytes()).and_then(|_| w.flush()).is_err() {
                    eprintln!("Failed to write the log file");
                }
            }

            line.clear();
        }
    }

    if let Some(w) = writer.as_mut() {
        if !line.is_empty() {
            w.write_all(line.as_bytes()).ok();
        }
        w.flush().ok();
    }
}

fn console(log: &LogMessage) {
    let text = format!(
        "{} {} {}",
        log.created_at.format("%Y-%m-%d %H:%M:%S.%3f"),
        log.level,
        log.msg
    );

    if log.level >= Level::Error {
        eprintln!("{}", text);
    } else {
        println!("{}", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_keeps_order() {
        let (logger, rx) = Logger::capture();
        logger.info("first");
        logger.error(String::from("second"));
        logger.critical("third");

        let logs: Vec<(Level, String)> = rx.try_iter().map(|l| (l.level, l.msg)).collect();
        assert_eq!(
            logs,
            vec![
                (Level::Info, "first".to_string()),
                (Level::Error, "second".to_string()),
                (Level::Critical, "third".to_string()),
            ]
        );
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::Critical.to_string(), "CRITICAL");
        assert!(Level::Critical > Level::Error);
    }

    #[test]
    fn test_write_logs_to_file() {
        let dir = std::env::temp_dir().join(format!("stock_data_fetcher_log_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.log");
        let (tx, rx) = unbounded::<LogMessage>();

        tx.send(LogMessage::new(Level::Info, "Done sending all stock data".to_string()))
            .unwrap();
        drop(tx);
        write_logs(Some(path.clone()), rx);

        let content = fs::read_to_string(&path).unwrap();
        fs::remove_dir_all(&dir).ok();
        assert!(content.contains("INFO Done sending all stock data"));
    }
}
