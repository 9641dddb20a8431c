//! Tremor Core - Telemetry Pipeline
//!
//! This crate connects the DSP primitives to the outside world:
//! - Per-message orchestration with an all-axes emit gate
//! - One-shot capture of the first raw payload to disk
//! - Fan-out of spectra to any number of in-process subscribers
//! - A dedicated ingest thread fed over a bounded channel
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Transport (MQTT, serial, ...)             │
//! │                 IngestHandle::submit(payload)               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ crossbeam-channel
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Ingest Thread                          │
//! │   capture once ◀── Pipeline ──▶ decode ─▶ FFT x/y/z ─▶ gate │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ Broadcaster::publish
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │   SubscriberRegistry ──try_send──▶ Subscription (per client)│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The library only emits `tracing` events; installing a subscriber is up
//! to the host.

mod broadcast;
mod capture;
mod config;
mod engine;
mod error;
mod message;
mod pipeline;

pub use broadcast::{Broadcaster, SubscriberId, SubscriberRegistry, Subscription};
pub use capture::{
    hex_encode, CsvCaptureSink, OneShotCapture, PayloadSink, PersistenceGuard, CAPTURE_HEADER,
};
pub use config::{PipelineConfig, SpectrumSettings};
pub use engine::{Command, IngestEngine, IngestHandle};
pub use error::{CoreError, CoreResult};
pub use message::{Axis, BroadcastEvent, RawMessage};
pub use pipeline::{
    DiscardReason, MessageHandler, Outcome, Pipeline, PipelineStats, StatsSnapshot,
};

// Re-export DSP types for convenience
pub use tremor_dsp::{
    decode_payload, AxisSeries, DspError, SampleTriplet, SpectralAnalyzer, SpectralResult,
    SpectrumConfig,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Verify public API is accessible
        let _config = PipelineConfig::default();
        let _registry = SubscriberRegistry::default();
        assert_eq!(BroadcastEvent::EVENT_NAME, "update_plot");
    }
}
