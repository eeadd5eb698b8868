//! Logging setup for emote: env_logger text output or JSON records

use chrono::{Local, Utc};
use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;
use serde_json::json;
use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};

/// Environment variable selecting level and format, e.g. `debug` or `json:trace`
pub const LOG_LEVEL_ENV: &str = "EMOTE_LOG_LEVEL";

/// Environment variable naming a file that receives JSON records
pub const LOG_PATH_ENV: &str = "EMOTE_LOG_PATH";

/// Parsed form of a level string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSpec {
    pub json: bool,
    pub filter: LevelFilter,
}

/// Parse `"json:debug"`, `"json"` or a bare level; unknown levels mean info
pub fn parse_level_spec(level_str: &str) -> LevelSpec {
    let (json, level) = match level_str.strip_prefix("json:") {
        Some(rest) => (true, rest),
        None if level_str == "json" => (true, "info"),
        None => (false, level_str),
    };

    let filter = match level.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    };

    LevelSpec { json, filter }
}

/// JSON logger writing one object per record
#[derive(Debug)]
pub struct JsonLogger {
    level: LevelFilter,
    target_file: Mutex<Option<File>>,
}

impl JsonLogger {
    pub fn new(level: LevelFilter, log_path: Option<String>) -> Self {
        let target_file =
            log_path.and_then(|path| OpenOptions::new().create(true).append(true).open(path).ok());

        JsonLogger {
            level,
            target_file: Mutex::new(target_file),
        }
    }

    /// Install a logger for `level_str`; returns the spec that was applied
    pub fn init_with_level(level_str: &str) -> LevelSpec {
        let spec = parse_level_spec(level_str);

        if !spec.json {
            let result = env_logger::Builder::new()
                .filter_level(spec.filter)
                .format(|buf, record| {
                    writeln!(
                        buf,
                        "🙂 [{} {} {}] {}",
                        Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                        record.level(),
                        record.target(),
                        record.args()
                    )
                })
                .try_init();
            if let Err(e) = result {
                eprintln!("Failed to initialize logger: {e}");
            }
            return spec;
        }

        let logger = Box::new(JsonLogger::new(spec.filter, env::var(LOG_PATH_ENV).ok()));
        if let Err(e) = log::set_boxed_logger(logger) {
            eprintln!("Failed to initialize JSON logger: {e}");
            return spec;
        }
        log::set_max_level(spec.filter);
        spec
    }

    /// Install a logger configured from `EMOTE_LOG_LEVEL` (default `info`)
    pub fn init() -> LevelSpec {
        let level = env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".to_string());
        Self::init_with_level(&level)
    }

    fn record_line(record: &Record<'_>) -> String {
        let entry = json!({
            "@timestamp": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            "@level": record.level().to_string().to_lowercase(),
            "@message": record.args().to_string(),
            "@module": record.target(),
            "@pid": std::process::id(),
            "@file": record.file().unwrap_or("unknown"),
            "@line": record.line().unwrap_or(0),
        });
        format!("{}\n", serde_json::to_string(&entry).unwrap_or_default())
    }
}

impl Log for JsonLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = Self::record_line(record);
        let mut guard = self.target_file.lock();
        match guard.as_mut() {
            Some(file) => {
                let _ = file.write_all(line.as_bytes());
                let _ = file.flush();
            }
            None => {
                let _ = io::stderr().write_all(line.as_bytes());
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = self.target_file.lock().as_mut() {
            let _ = file.flush();
        }
        let _ = io::stderr().flush();
    }
}

/// Severity used when a manifest entry is skipped
pub fn skip_level() -> Level {
    Level::Warn
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_level_spec() {
        assert_eq!(
            parse_level_spec("debug"),
            LevelSpec { json: false, filter: LevelFilter::Debug }
        );
        assert_eq!(
            parse_level_spec("json:trace"),
            LevelSpec { json: true, filter: LevelFilter::Trace }
        );
        assert_eq!(
            parse_level_spec("json"),
            LevelSpec { json: true, filter: LevelFilter::Info }
        );
        assert_eq!(parse_level_spec("loud").filter, LevelFilter::Info);
    }

    #[test]
    fn test_json_logger_writes_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("emote.log");
        let logger = JsonLogger::new(LevelFilter::Debug, Some(path.to_string_lossy().into_owned()));

        logger.log(
            &Record::builder()
                .level(Level::Warn)
                .target("emote::assets::loader")
                .args(format_args!("skipped layout entry"))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Trace)
                .args(format_args!("filtered"))
                .build(),
        );
        logger.flush();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["@level"], "warn");
        assert_eq!(value["@message"], "skipped layout entry");
    }
}
