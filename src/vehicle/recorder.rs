//! # Command Recorder
//!
//! A vehicle that accepts manual 6-DOF control and appends every command it
//! receives to a JSON Lines file. Useful for bench testing a 3D mouse
//! without a live vehicle link.
//!
//! Each line looks like:
//!
//! ```text
//! {"timestamp":"2026-10-18T12:00:00.020+00:00","vehicle_id":1,"command":{"x":0.0,"y":1.0,"z":0.0,"a":0.0,"b":0.0,"c":0.0}}
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

use super::{ManualControl, Vehicle};
use crate::device::sample::ManualControlCommand;
use crate::error::Result;

#[derive(Debug, Serialize)]
struct CommandRecord {
    timestamp: DateTime<Utc>,
    vehicle_id: u32,
    command: ManualControlCommand,
}

/// Vehicle that writes received commands to a JSONL file.
#[derive(Debug)]
pub struct CommandRecorder {
    id: u32,
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl CommandRecorder {
    /// Opens (or creates) `path` in append mode, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory or file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, id: u32) -> Result<Arc<Self>> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!("Recording manual control commands to {}", path.display());

        Ok(Arc::new(Self {
            id,
            path,
            writer: Mutex::new(BufWriter::new(file)),
        }))
    }

    /// Path of the JSONL file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one command record.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` or `Io` on failure.
    pub fn record(&self, command: ManualControlCommand) -> Result<()> {
        let record = CommandRecord {
            timestamp: Utc::now(),
            vehicle_id: self.id,
            command,
        };

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        serde_json::to_writer(&mut *writer, &record)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Flushes buffered records to disk.
    pub fn flush(&self) -> Result<()> {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()?;
        Ok(())
    }
}

impl ManualControl for CommandRecorder {
    fn set_manual_6dof_control(&self, command: ManualControlCommand) {
        if let Err(e) = self.record(command) {
            warn!("Failed to record command to {}: {}", self.path.display(), e);
        }
    }
}

impl Vehicle for CommandRecorder {
    fn id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> String {
        format!("recorder-{}", self.id)
    }

    fn manual_control(self: Arc<Self>) -> Option<Arc<dyn ManualControl>> {
        Some(self)
    }
}

impl Drop for CommandRecorder {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Failed to flush {}: {}", self.path.display(), e);
        }
    }
}
