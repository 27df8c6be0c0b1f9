use std::fs::{File, OpenOptions};
use std::io::{Result as IoResult, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use std::{cell::RefCell, fmt::Display};

static LOG_FILE: OnceLock<Arc<Mutex<File>>> = OnceLock::new();
thread_local! {
    static LOG_PREFIX: RefCell<Option<String>> = const { RefCell::new(None) };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Warning,
    Error,
}

impl Level {
    const fn label(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

fn current_prefix() -> Option<String> {
    LOG_PREFIX.with(|prefix| prefix.borrow().clone())
}

fn format_with_prefix(message: impl Display) -> String {
    current_prefix().map_or_else(|| message.to_string(), |p| format!("{p}: {message}"))
}

/// Appends warnings and errors emitted by the decoder to `path`.
///
/// Only the first configured file is used for the lifetime of the process.
///
/// # Errors
///
/// Returns an error if the log file or its parent directory cannot be created.
pub fn set_log_file(path: &Path) -> IoResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let _ = LOG_FILE.set(Arc::new(Mutex::new(file)));
    Ok(())
}

/// Sets a thread-local prefix (usually the input file name) for subsequent
/// messages on this thread. The previous prefix is restored when the guard drops.
pub fn set_log_prefix(prefix: impl Into<String>) -> LogPrefixGuard {
    let previous = LOG_PREFIX.with(|slot| slot.borrow_mut().replace(prefix.into()));
    LogPrefixGuard { previous }
}

pub struct LogPrefixGuard {
    previous: Option<String>,
}

impl Drop for LogPrefixGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        LOG_PREFIX.with(|slot| {
            *slot.borrow_mut() = previous;
        });
    }
}

fn emit(level: Level, message: &str) {
    let message = format_with_prefix(message);
    eprintln!("{}: {message}", level.label());
    if let Some(writer) = LOG_FILE.get()
        && let Ok(mut file) = writer.lock()
    {
        let _ = writeln!(file, "{}: {message}", level.label());
    }
}

pub fn log_warn(message: &str) {
    emit(Level::Warning, message);
}

pub fn log_error(message: &str) {
    emit(Level::Error, message);
}
