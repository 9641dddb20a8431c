//! Pipeline Orchestrator
//!
//! Runs one message at a time through decode, analysis and the emit gate:
//!
//! ```text
//! RawMessage ─┬─▶ OneShotCapture (first message only)
//!             │
//!             └─▶ decode ─▶ analyze x ─┐
//!                          analyze y ─┼─▶ all non-empty? ─yes─▶ Broadcaster
//!                          analyze z ─┘                   └no──▶ discard
//! ```
//!
//! Apart from the capture guard and the statistics counters nothing
//! survives from one message to the next.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, Level};
use tremor_dsp::{decode_payload, SpectralAnalyzer};

use crate::broadcast::Broadcaster;
use crate::capture::{CsvCaptureSink, OneShotCapture};
use crate::config::PipelineConfig;
use crate::error::CoreResult;
use crate::message::{BroadcastEvent, RawMessage};

/// Entry point a transport calls once per received message, in order
pub trait MessageHandler: Send + Sync {
    fn handle(&self, message: RawMessage);
}

/// What happened to one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An event was handed to the broadcaster
    Emitted,
    /// Nothing was published for this message
    Discarded(DiscardReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// At least one axis was too short to analyse
    ShortSeries { samples: usize },
}

/// Running totals, safe to read from any thread
#[derive(Debug, Default)]
pub struct PipelineStats {
    received: AtomicU64,
    emitted: AtomicU64,
    discarded: AtomicU64,
    captured: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub received: u64,
    pub emitted: u64,
    pub discarded: u64,
    pub captured: u64,
}

impl PipelineStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            emitted: self.emitted.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            captured: self.captured.load(Ordering::Relaxed),
        }
    }
}

/// Decode → analyse ×3 → gate → publish
pub struct Pipeline {
    analyzer: SpectralAnalyzer,
    capture: OneShotCapture,
    broadcaster: Arc<dyn Broadcaster>,
    stats: PipelineStats,
}

impl Pipeline {
    pub fn new(
        analyzer: SpectralAnalyzer,
        capture: OneShotCapture,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            analyzer,
            capture,
            broadcaster,
            stats: PipelineStats::default(),
        }
    }

    /// Build from configuration, writing captures under the configured directory
    pub fn from_config(
        config: &PipelineConfig,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> CoreResult<Self> {
        config.validate()?;
        let analyzer = SpectralAnalyzer::new(config.spectrum.to_spectrum_config()?);

        let capture = if config.capture_enabled {
            let dir = config.resolved_capture_dir()?;
            info!("First payload will be captured to {:?}", dir);
            OneShotCapture::new(CsvCaptureSink::new(dir))
        } else {
            OneShotCapture::disabled()
        };

        Ok(Self::new(analyzer, capture, broadcaster))
    }

    /// Run one message to completion
    pub fn process(&self, message: RawMessage) -> Outcome {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        if self.capture.capture_once(message.payload()) {
            self.stats.captured.fetch_add(1, Ordering::Relaxed);
        }

        let series = decode_payload(message.payload());
        let samples = series.len();
        let [x, y, z] = self.analyzer.analyze_axes(&series);

        if tracing::enabled!(Level::DEBUG) && !x.is_empty() {
            debug!(
                "Message {}: {} samples, peaks x={:?} y={:?} z={:?}",
                message.sequence(),
                samples,
                x.peak(),
                y.peak(),
                z.peak()
            );
        }

        match BroadcastEvent::from_results(x, y, z) {
            Some(event) => {
                self.broadcaster.publish(event);
                self.stats.emitted.fetch_add(1, Ordering::Relaxed);
                Outcome::Emitted
            }
            None => {
                debug!(
                    "Discarding message {} ({} bytes, {} samples per axis)",
                    message.sequence(),
                    message.len(),
                    samples
                );
                self.stats.discarded.fetch_add(1, Ordering::Relaxed);
                Outcome::Discarded(DiscardReason::ShortSeries { samples })
            }
        }
    }

    pub fn analyzer(&self) -> &SpectralAnalyzer {
        &self.analyzer
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Whether the one-shot capture has already run
    pub fn has_captured(&self) -> bool {
        self.capture.has_fired()
    }
}

impl MessageHandler for Pipeline {
    fn handle(&self, message: RawMessage) {
        self.process(message);
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("analyzer", &self.analyzer)
            .field("capture", &self.capture)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::SubscriberRegistry;
    use crate::capture::PayloadSink;
    use crate::config::SpectrumSettings;
    use crate::message::Axis;
    use approx::assert_relative_eq;
    use parking_lot::Mutex;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use tremor_dsp::{encode_triplets, SampleTriplet, SpectrumConfig};

    #[derive(Default)]
    struct RecordingBroadcaster {
        events: Mutex<Vec<BroadcastEvent>>,
    }

    impl Broadcaster for RecordingBroadcaster {
        fn publish(&self, event: BroadcastEvent) {
            self.events.lock().push(event);
        }
    }

    #[derive(Default)]
    struct CountingSink {
        writes: Arc<AtomicUsize>,
    }

    impl PayloadSink for CountingSink {
        fn persist(&self, _payload: &[u8]) -> CoreResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn analyzer() -> SpectralAnalyzer {
        SpectralAnalyzer::new(SpectrumConfig::new(100.0, 1.0).unwrap())
    }

    fn payload(samples: usize, value: i16) -> Vec<u8> {
        let triplets: Vec<SampleTriplet> = (0..samples)
            .map(|_| SampleTriplet::new(value, -value, 2 * value))
            .collect();
        encode_triplets(&triplets)
    }

    fn recording_pipeline() -> (Pipeline, Arc<RecordingBroadcaster>) {
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let pipeline = Pipeline::new(analyzer(), OneShotCapture::disabled(), broadcaster.clone());
        (pipeline, broadcaster)
    }

    #[test]
    fn test_emits_when_all_axes_analysed() {
        let (pipeline, broadcaster) = recording_pipeline();

        let outcome = pipeline.process(RawMessage::new(0, payload(8, 3)));
        assert_eq!(outcome, Outcome::Emitted);

        let events = broadcaster.events.lock();
        assert_eq!(events.len(), 1);
        for axis in Axis::ALL {
            let (freq, fft) = events[0].axis(axis);
            assert_eq!(freq.len(), 51);
            assert_eq!(fft.len(), freq.len());
        }
        // Constant axes: DC magnitude is n * |value|
        assert_relative_eq!(events[0].axis(Axis::X).1[0], 24.0, epsilon = 1e-9);
        assert_relative_eq!(events[0].axis(Axis::Y).1[0], 24.0, epsilon = 1e-9);
        assert_relative_eq!(events[0].axis(Axis::Z).1[0], 48.0, epsilon = 1e-9);
    }

    #[test]
    fn test_short_payload_discarded() {
        let (pipeline, broadcaster) = recording_pipeline();

        // 3 full samples plus stray bytes
        let mut bytes = payload(3, 1);
        bytes.extend_from_slice(&[0, 0, 0, 0, 0]);
        let outcome = pipeline.process(RawMessage::new(0, bytes));

        assert_eq!(
            outcome,
            Outcome::Discarded(DiscardReason::ShortSeries { samples: 3 })
        );
        assert!(broadcaster.events.lock().is_empty());
    }

    #[test]
    fn test_empty_payload_discarded() {
        let (pipeline, broadcaster) = recording_pipeline();
        let outcome = pipeline.process(RawMessage::new(0, Vec::<u8>::new()));
        assert!(matches!(outcome, Outcome::Discarded(_)));
        assert!(broadcaster.events.lock().is_empty());
    }

    #[test]
    fn test_minimum_length_passes_gate() {
        let (pipeline, _broadcaster) = recording_pipeline();
        assert_eq!(
            pipeline.process(RawMessage::new(0, payload(4, 1))),
            Outcome::Emitted
        );
    }

    #[test]
    fn test_events_keep_arrival_order() {
        let registry = Arc::new(SubscriberRegistry::new(64));
        let subscriber = registry.subscribe();
        let pipeline = Pipeline::new(analyzer(), OneShotCapture::disabled(), registry.clone());

        for i in 1..=10 {
            pipeline.handle(RawMessage::new(i as u64, payload(8, i)));
        }

        let dc: Vec<f64> = subscriber
            .drain()
            .iter()
            .map(|e| e.axis(Axis::X).1[0].round())
            .collect();
        let expected: Vec<f64> = (1..=10).map(|i| f64::from(8 * i)).collect();
        assert_eq!(dc, expected);
    }

    #[test]
    fn test_capture_runs_once_regardless_of_gate() {
        let writes = Arc::new(AtomicUsize::new(0));
        let capture = OneShotCapture::new(CountingSink {
            writes: Arc::clone(&writes),
        });
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let pipeline = Pipeline::new(analyzer(), capture, broadcaster.clone());

        // First message fails the gate but is still captured
        pipeline.process(RawMessage::new(0, vec![1u8, 2, 3]));
        assert!(pipeline.has_captured());

        for i in 1..5 {
            pipeline.process(RawMessage::new(i, payload(16, 2)));
        }

        assert_eq!(writes.load(Ordering::SeqCst), 1);
        assert_eq!(broadcaster.events.lock().len(), 4);
    }

    #[test]
    fn test_stats() {
        let (pipeline, _broadcaster) = recording_pipeline();
        pipeline.process(RawMessage::new(0, payload(8, 1)));
        pipeline.process(RawMessage::new(1, payload(2, 1)));
        pipeline.process(RawMessage::new(2, payload(8, 1)));

        assert_eq!(
            pipeline.stats(),
            StatsSnapshot {
                received: 3,
                emitted: 2,
                discarded: 1,
                captured: 0,
            }
        );
    }

    #[test]
    fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            spectrum: SpectrumSettings {
                sample_rate_hz: 100.0,
                frequency_step_hz: 1.0,
            },
            capture_dir: Some(PathBuf::from(dir.path())),
            ..Default::default()
        };
        let registry = Arc::new(SubscriberRegistry::new(4));
        let subscriber = registry.subscribe();
        let pipeline = Pipeline::from_config(&config, registry).unwrap();

        assert_eq!(pipeline.analyzer().grid().len(), 51);
        pipeline.process(RawMessage::new(0, payload(8, 1)));

        assert!(subscriber.try_recv().is_some());
        assert_eq!(pipeline.stats().captured, 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let config = PipelineConfig {
            subscriber_capacity: 0,
            ..Default::default()
        };
        let registry = Arc::new(SubscriberRegistry::default());
        assert!(Pipeline::from_config(&config, registry).is_err());
    }
}
