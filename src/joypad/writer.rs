//! Fifo writer task.
//!
//! Drains the outbound event queue and persists each record to the joystick
//! sink, a named pipe another process reads as if it were a joystick device.
//! The sink is opened lazily and re-opened with indefinite retry when it goes
//! away; events queue upstream in the meantime, so delivery is at-least-once
//! in emission order.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::joypad::event::JsEvent;

const RETRY_DELAY: Duration = Duration::from_millis(500);

// Writer errors
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error("Failed to create joypad fifo: {0}")]
    CreateError(String),
}

// Public interface for spawning the writer task
pub struct WriterHandle {}

impl WriterHandle {
    /// Create the fifo when the configured path does not exist yet, then
    /// spawn the drain task. Without a path the task still drains the queue
    /// (dropping the records) so the bridge never backs up.
    pub fn spawn(
        path: Option<PathBuf>,
        mut event_receiver: mpsc::UnboundedReceiver<JsEvent>,
    ) -> Result<Self, WriterError> {
        if let Some(path) = &path {
            ensure_fifo(path)?;
        }

        tokio::spawn(async move {
            let mut writer = EventWriter { path, sink: None };
            while let Some(event) = event_receiver.recv().await {
                writer.deliver(event).await;
            }
            info!("Joypad event queue closed, writer task exiting");
        });

        Ok(Self {})
    }
}

struct EventWriter {
    path: Option<PathBuf>,
    sink: Option<File>,
}

impl EventWriter {
    // Blocks until the record is on the sink. Failure closes the handle and
    // retries the same record, so a record is never skipped, only delayed.
    async fn deliver(&mut self, event: JsEvent) {
        let Some(path) = self.path.clone() else {
            debug!("No joypad sink configured, discarding {:?}", event);
            return;
        };

        loop {
            match self.write_record(&path, &event) {
                Ok(()) => {
                    debug!("Wrote joypad event {:?}", event);
                    return;
                }
                Err(e) => {
                    self.sink = None;
                    warn!("Joypad sink {} unavailable: {}", path.display(), e);
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    fn write_record(&mut self, path: &Path, event: &JsEvent) -> std::io::Result<()> {
        if self.sink.is_none() {
            let opened = OpenOptions::new().write(true).open(path)?;
            info!("Opened joypad sink {}", path.display());
            self.sink = Some(opened);
        }

        if let Some(sink) = self.sink.as_mut() {
            sink.write_all(&event.to_bytes())?;
            sink.flush()?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn ensure_fifo(path: &Path) -> Result<(), WriterError> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    if path.exists() {
        return Ok(());
    }

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| WriterError::CreateError(e.to_string()))?;
    // mkfifo has no std wrapper
    if unsafe { libc::mkfifo(c_path.as_ptr(), 0o644) } != 0 {
        return Err(WriterError::CreateError(
            std::io::Error::last_os_error().to_string(),
        ));
    }

    info!("Created joypad fifo at {}", path.display());
    Ok(())
}

#[cfg(not(unix))]
fn ensure_fifo(_path: &Path) -> Result<(), WriterError> {
    Err(WriterError::CreateError(
        "named pipes are only supported on unix".to_string(),
    ))
}
