//! Message Types
//!
//! `RawMessage` flows in from the transport.
//! `BroadcastEvent` flows out to subscribers and visualization clients.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tremor_dsp::SpectralResult;

/// One payload as delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    sequence: u64,
    payload: Arc<[u8]>,
}

impl RawMessage {
    pub fn new(sequence: u64, payload: impl Into<Arc<[u8]>>) -> Self {
        Self {
            sequence,
            payload: payload.into(),
        }
    }

    /// Position in the ingestion stream
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Sensor axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Wire key of this axis' frequency array
    pub const fn freq_key(self) -> &'static str {
        match self {
            Axis::X => "x_freq",
            Axis::Y => "y_freq",
            Axis::Z => "z_freq",
        }
    }

    /// Wire key of this axis' magnitude array
    pub const fn fft_key(self) -> &'static str {
        match self {
            Axis::X => "x_fft",
            Axis::Y => "y_fft",
            Axis::Z => "z_fft",
        }
    }
}

/// Spectra of all three axes for one message
///
/// Field names are the wire format existing plotting clients consume:
/// `{ x_freq, x_fft, y_freq, y_fft, z_freq, z_fft }`. The pipeline builds
/// events through [`BroadcastEvent::from_results`], so no axis is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEvent {
    x_freq: Vec<f64>,
    x_fft: Vec<f64>,
    y_freq: Vec<f64>,
    y_fft: Vec<f64>,
    z_freq: Vec<f64>,
    z_fft: Vec<f64>,
}

impl BroadcastEvent {
    /// Channel event name clients subscribe to
    pub const EVENT_NAME: &'static str = "update_plot";

    /// Group three spectra; `None` unless every axis is non-empty
    pub fn from_results(x: SpectralResult, y: SpectralResult, z: SpectralResult) -> Option<Self> {
        if x.is_empty() || y.is_empty() || z.is_empty() {
            return None;
        }

        let (x_freq, x_fft) = x.into_parts();
        let (y_freq, y_fft) = y.into_parts();
        let (z_freq, z_fft) = z.into_parts();
        Some(Self {
            x_freq,
            x_fft,
            y_freq,
            y_fft,
            z_freq,
            z_fft,
        })
    }

    /// `(frequencies, magnitudes)` for one axis
    pub fn axis(&self, axis: Axis) -> (&[f64], &[f64]) {
        match axis {
            Axis::X => (&self.x_freq, &self.x_fft),
            Axis::Y => (&self.y_freq, &self.y_fft),
            Axis::Z => (&self.z_freq, &self.z_fft),
        }
    }

    /// Serialize to the JSON body sent with [`Self::EVENT_NAME`]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
