//! Logging init: file under the XDG state dir, falling back to stderr.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// One log sink: the engine log file, or stderr whenever the file handle
/// cannot be duplicated for a writer.
struct LogWriter(Option<fs::File>);

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.0 {
            Some(f) => f.write(buf),
            None => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.0 {
            Some(f) => f.flush(),
            None => io::stderr().lock().flush(),
        }
    }
}

fn log_path() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("bulkdl")?;
    let dir = dirs.get_state_home();
    fs::create_dir_all(&dir)?;
    Ok(dir.join("bulkdl.log"))
}

fn init_with(writer: BoxMakeWriter) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,bulkdl=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
}

/// Initialize structured logging to `~/.local/state/bulkdl/bulkdl.log`.
/// On failure (e.g. log dir unwritable), returns Err so the caller can fall
/// back to [`init_logging_stderr`].
pub fn init_logging() -> Result<()> {
    let path = log_path()?;
    let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
    init_with(BoxMakeWriter::new(move || LogWriter(file.try_clone().ok())));
    tracing::info!("logging to {}", path.display());
    Ok(())
}

/// Initialize logging to stderr only (no file). Use when `init_logging()`
/// fails so the process still starts.
pub fn init_logging_stderr() {
    init_with(BoxMakeWriter::new(io::stderr));
}
