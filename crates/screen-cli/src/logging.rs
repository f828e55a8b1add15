use crate::error::{CliError, Result};
use crate::ui::UiEvent;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, MakeWriter},
    prelude::*,
};

/// Routes console log lines through the UI manager so they are printed above the
/// progress bars instead of tearing them.
#[derive(Clone)]
pub struct UiLogMakeWriter {
    sender: mpsc::Sender<UiEvent>,
}

impl UiLogMakeWriter {
    pub fn new(sender: mpsc::Sender<UiEvent>) -> Self {
        Self { sender }
    }
}

impl<'a> MakeWriter<'a> for UiLogMakeWriter {
    type Writer = UiLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        UiLogWriter {
            sender: self.sender.clone(),
            buffer: Vec::new(),
        }
    }
}

/// Collects one formatted event and hands it to the UI when dropped.
pub struct UiLogWriter {
    sender: mpsc::Sender<UiEvent>,
    buffer: Vec<u8>,
}

impl Write for UiLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for UiLogWriter {
    fn drop(&mut self) {
        let line = String::from_utf8_lossy(&self.buffer);
        let line = line.trim_end();
        if line.is_empty() {
            return;
        }
        // The UI may already be gone during shutdown; the line must still reach the user.
        if self.sender.try_send(UiEvent::Log(line.to_string())).is_err() {
            eprintln!("{}", line);
        }
    }
}

pub fn setup_logging(
    verbosity: u8,
    quiet: bool,
    log_file: &Option<PathBuf>,
    ui_sender: mpsc::Sender<UiEvent>,
) -> Result<()> {
    let level_filter = if quiet {
        LevelFilter::OFF
    } else {
        match verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    let console_layer = fmt::layer()
        .with_writer(UiLogMakeWriter::new(ui_sender))
        .with_ansi(true)
        .with_target(false)
        .compact()
        .with_filter(level_filter);

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path).map_err(CliError::Io)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_thread_ids(true)
                    .with_target(true)
                    .with_filter(LevelFilter::TRACE),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to install logger: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::thread;
    use std::time::Duration;
    use tracing::{debug, info};

    #[test]
    fn writer_sends_one_trimmed_line_per_event() {
        let (sender, mut receiver) = mpsc::channel(4);
        let make_writer = UiLogMakeWriter::new(sender);

        {
            let mut writer = make_writer.make_writer();
            writer.write_all(b" WARN candidate failed\n").unwrap();
        }
        {
            let mut writer = make_writer.make_writer();
            writer.write_all(b"\n").unwrap();
        }

        match receiver.try_recv() {
            Ok(UiEvent::Log(line)) => assert_eq!(line, " WARN candidate failed"),
            _ => panic!("expected a log event"),
        }
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    #[serial]
    fn scoped_subscriber_routes_events_to_the_ui() {
        let (sender, mut receiver) = mpsc::channel(4);
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(UiLogMakeWriter::new(sender))
                .with_ansi(false)
                .with_filter(LevelFilter::INFO),
        );

        tracing::subscriber::with_default(subscriber, || {
            info!("Screening with 4 worker(s).");
            debug!("filtered out");
        });

        match receiver.try_recv() {
            Ok(UiEvent::Log(line)) => assert!(line.contains("Screening with 4 worker(s).")),
            _ => panic!("expected a log event"),
        }
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    #[serial]
    fn file_layer_records_thread_ids() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("screen.log");

        let file = File::create(&log_path).unwrap();
        let file_layer = fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_thread_ids(true);
        let subscriber = tracing_subscriber::registry().with(file_layer);

        tracing::subscriber::with_default(subscriber, || {
            debug!("Message for file-only test.");
        });

        thread::sleep(Duration::from_millis(100));

        let content = std::fs::read_to_string(log_path).unwrap();
        assert!(content.contains("Message for file-only test."));
        assert!(content.contains("DEBUG"));
        assert!(content.contains("ThreadId"));
    }

    #[test]
    #[serial]
    fn invalid_log_file_path_propagates_error() {
        let invalid_path = PathBuf::from("/");
        let (sender, _receiver) = mpsc::channel(1);

        if cfg!(unix) && invalid_path.is_dir() {
            let result = setup_logging(0, false, &Some(invalid_path), sender);
            assert!(matches!(result, Err(CliError::Io(_))));
        }
    }
}
