use crate::shared::constants;
use lazy_static::lazy_static;
use std::backtrace::Backtrace;
use std::fs::OpenOptions;
use std::io::Write;
use std::panic;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

#[derive(Clone)]
struct LoggerPaths {
    error_path: String,
    debug_path: String,
}

lazy_static! {
    static ref LOGGER: Mutex<Option<LoggerPaths>> = Mutex::new(None);
}

fn paths() -> MutexGuard<'static, Option<LoggerPaths>> {
    match LOGGER.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn append_line(path: &str, line: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{}", line);
    }
}

fn start_file(path: &Path, title: &str) {
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
    {
        let _ = writeln!(file, "=== {} Log Started: {} ===", title, chrono::Local::now());
    }
}

/// Truncates `error.log`/`debug.log` under `dir` and routes all later log
/// calls there. Until this runs every log call is a no-op.
pub fn init(dir: &Path) {
    let error_path = dir.join(constants::ERROR_LOG_FILE);
    let debug_path = dir.join(constants::DEBUG_LOG_FILE);

    start_file(&error_path, "Error");
    start_file(&debug_path, "Debug");

    let paths_for_hook = LoggerPaths {
        error_path: error_path.to_string_lossy().to_string(),
        debug_path: debug_path.to_string_lossy().to_string(),
    };
    *paths() = Some(paths_for_hook.clone());

    panic::set_hook(Box::new(move |info| {
        let backtrace = Backtrace::capture();
        let msg = match info.payload().downcast_ref::<&str>() {
            Some(s) => *s,
            None => match info.payload().downcast_ref::<String>() {
                Some(s) => &s[..],
                None => "Box<Any>",
            },
        };

        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());

        let thread = std::thread::current()
            .name()
            .unwrap_or("<unnamed>")
            .to_string();

        let error_msg = format!(
            "\nCRITICAL PANIC in thread '{}' at {}:\nMessage: {}\nBacktrace:\n{:?}\n",
            thread, location, msg, backtrace
        );

        append_line(&paths_for_hook.error_path, &error_msg);
        append_line(&paths_for_hook.debug_path, &error_msg);

        // Best effort, the terminal sink may have left raw mode on.
        let _ = crossterm::terminal::disable_raw_mode();
        eprintln!(
            "{} crashed. See {} for details.",
            constants::APP_NAME,
            paths_for_hook.error_path
        );
    }));
}

pub fn log(level: &str, msg: &str) {
    if let Some(paths) = paths().as_ref() {
        let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
        let line = format!("[{}][{}] {}", timestamp, level, msg);
        append_line(&paths.debug_path, &line);

        if level == "ERROR" || level == "WARN" {
            append_line(&paths.error_path, &line);
        }
    }
}

pub fn info(msg: &str) {
    log("INFO", msg);
}

pub fn warn(msg: &str) {
    log("WARN", msg);
}

pub fn error(msg: &str) {
    log("ERROR", msg);
}

pub fn debug(msg: &str) {
    log("DEBUG", msg);
}
