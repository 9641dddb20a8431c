//! Ingest Engine
//!
//! Owns the thread that consumes the message stream. Transports push raw
//! payloads through an [`IngestHandle`]; the worker runs each one through
//! the [`Pipeline`] to completion before taking the next, so subscribers
//! see events in arrival order.
//!
//! ```text
//!  transport ──submit──▶ crossbeam (bounded) ──▶ tremor-ingest thread
//!  transport ──submit──┘                            │
//!                                                   ▼
//!                                          Pipeline::process
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::broadcast::Broadcaster;
use crate::config::PipelineConfig;
use crate::error::{CoreError, CoreResult};
use crate::message::RawMessage;
use crate::pipeline::Pipeline;

/// Commands sent to the ingest thread
#[derive(Debug, Clone)]
pub enum Command {
    /// Process one message
    Ingest(RawMessage),

    /// Finish queued messages, then exit
    Shutdown,
}

/// Cloneable submission side of the engine
///
/// Sequence numbers are assigned under the same lock as the channel send,
/// so they match queue order even with several transports submitting.
#[derive(Clone)]
pub struct IngestHandle {
    command_sender: Sender<Command>,
    next_sequence: Arc<Mutex<u64>>,
    stopped: Arc<AtomicBool>,
}

impl IngestHandle {
    /// Queue a payload; returns the sequence number it was given
    ///
    /// Blocks while the queue is full.
    pub fn submit(&self, payload: impl Into<Arc<[u8]>>) -> CoreResult<u64> {
        let mut next_sequence = self.next_sequence.lock();
        if self.stopped.load(Ordering::SeqCst) {
            return Err(CoreError::EngineStopped);
        }

        let sequence = *next_sequence;
        self.command_sender
            .send(Command::Ingest(RawMessage::new(sequence, payload)))
            .map_err(|_| CoreError::ChannelSendError)?;
        *next_sequence += 1;
        Ok(sequence)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Runs a [`Pipeline`] on a dedicated thread
pub struct IngestEngine {
    handle: IngestHandle,
    pipeline: Arc<Pipeline>,
    worker: Option<JoinHandle<()>>,
}

impl IngestEngine {
    /// Spawn the ingest thread
    pub fn start(pipeline: Arc<Pipeline>, queue_capacity: usize) -> CoreResult<Self> {
        let (command_sender, command_receiver) = bounded::<Command>(queue_capacity.max(1));

        let worker_pipeline = Arc::clone(&pipeline);
        let worker = thread::Builder::new()
            .name("tremor-ingest".into())
            .spawn(move || Self::worker_main(command_receiver, worker_pipeline))
            .map_err(|e| CoreError::SpawnError(e.to_string()))?;

        Ok(Self {
            handle: IngestHandle {
                command_sender,
                next_sequence: Arc::new(Mutex::new(0)),
                stopped: Arc::new(AtomicBool::new(false)),
            },
            pipeline,
            worker: Some(worker),
        })
    }

    /// Build the pipeline from `config` and start it
    pub fn from_config(
        config: &PipelineConfig,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> CoreResult<Self> {
        let pipeline = Pipeline::from_config(config, broadcaster)?;
        Self::start(Arc::new(pipeline), config.ingest_queue_capacity)
    }

    /// Queue a payload for processing
    pub fn submit(&self, payload: impl Into<Arc<[u8]>>) -> CoreResult<u64> {
        self.handle.submit(payload)
    }

    /// A handle transports can hold on to
    pub fn handler(&self) -> IngestHandle {
        self.handle.clone()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Process everything already queued, then stop the thread
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        {
            // Taking the sequence lock orders this against in-flight submits
            let _sequence = self.handle.next_sequence.lock();
            self.handle.stopped.store(true, Ordering::SeqCst);
            let _ = self.handle.command_sender.send(Command::Shutdown);
        }

        if worker.join().is_err() {
            warn!("Ingest thread panicked");
        }
    }

    /// Ingest thread main loop
    fn worker_main(command_receiver: Receiver<Command>, pipeline: Arc<Pipeline>) {
        info!("Ingest thread started");

        loop {
            match command_receiver.recv() {
                Ok(Command::Ingest(message)) => {
                    pipeline.process(message);
                }
                Ok(Command::Shutdown) => {
                    info!("Shutdown command received");
                    break;
                }
                Err(_) => {
                    warn!("Command channel disconnected");
                    break;
                }
            }
        }

        let stats = pipeline.stats();
        info!(
            "Ingest thread shutting down ({} received, {} emitted, {} discarded)",
            stats.received, stats.emitted, stats.discarded
        );
    }
}

impl Drop for IngestEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
