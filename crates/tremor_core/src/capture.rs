//! One-Shot Payload Capture
//!
//! The first payload a process sees is written to disk once, for offline
//! inspection of what the sensor actually sends. Later payloads never touch
//! the file system.
//!
//! ```text
//! every message ──▶ OneShotCapture ──first caller only──▶ PayloadSink
//!                        │
//!                  PersistenceGuard (atomic compare-exchange)
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;
use tracing::{error, info};

use crate::error::CoreResult;

/// Header of the single column in a capture file
pub const CAPTURE_HEADER: &str = "sensorData";

/// A flag that can be acquired exactly once
///
/// `try_acquire` returns `true` to precisely one caller over the guard's
/// lifetime, no matter how many threads race for it.
#[derive(Debug, Default)]
pub struct PersistenceGuard {
    acquired: AtomicBool,
}

impl PersistenceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> bool {
        self.acquired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_acquired(&self) -> bool {
        self.acquired.load(Ordering::Acquire)
    }
}

/// Destination for a captured payload
pub trait PayloadSink: Send + Sync {
    fn persist(&self, payload: &[u8]) -> CoreResult<()>;
}

/// Writes `raw_<timestamp>.csv` with a `sensorData` header and the payload
/// as one lowercase hex string
#[derive(Debug, Clone)]
pub struct CsvCaptureSink {
    dir: PathBuf,
}

impl CsvCaptureSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `payload` and return the file path
    pub fn write(&self, payload: &[u8]) -> CoreResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let timestamp = Local::now().format("%Y%m%d%H%M%S");
        let path = self.dir.join(format!("raw_{timestamp}.csv"));

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record([CAPTURE_HEADER])?;
        writer.write_record([hex_encode(payload)])?;
        writer.flush()?;

        Ok(path)
    }
}

impl PayloadSink for CsvCaptureSink {
    fn persist(&self, payload: &[u8]) -> CoreResult<()> {
        let path = self.write(payload)?;
        info!("Captured {} byte payload to {:?}", payload.len(), path);
        Ok(())
    }
}

/// Lowercase hex, two digits per byte
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Guard plus sink: the sink runs for the first payload only
pub struct OneShotCapture {
    guard: PersistenceGuard,
    sink: Option<Box<dyn PayloadSink>>,
}

impl OneShotCapture {
    pub fn new(sink: impl PayloadSink + 'static) -> Self {
        Self {
            guard: PersistenceGuard::new(),
            sink: Some(Box::new(sink)),
        }
    }

    /// A capture that never writes anything
    pub fn disabled() -> Self {
        Self {
            guard: PersistenceGuard::new(),
            sink: None,
        }
    }

    /// Offer a payload; returns `true` if this call performed the capture
    ///
    /// Sink failures are logged and not retried: the guard stays acquired.
    pub fn capture_once(&self, payload: &[u8]) -> bool {
        let Some(sink) = &self.sink else {
            return false;
        };
        if !self.guard.try_acquire() {
            return false;
        }

        if let Err(e) = sink.persist(payload) {
            error!("Failed to capture raw payload: {}", e);
        }
        true
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn has_fired(&self) -> bool {
        self.guard.is_acquired()
    }
}

impl fmt::Debug for OneShotCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneShotCapture")
            .field("enabled", &self.is_enabled())
            .field("fired", &self.has_fired())
            .finish()
    }
}
