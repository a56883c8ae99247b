use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::Serialize;
use tracing::{debug, info, trace, warn};
use xethru_frame::{code_name, CodeClass, DecodeEvent, Frame, FrameError, FrameReader};
use xethru_transport::{RadarStream, TransportError};

use crate::command::ResponseSlot;
use crate::config::QueueCapacity;
use crate::error::Result;
use crate::messages::DataMessage;
use crate::queue::DataQueues;

/// State shared between callers and the receive loop.
pub(crate) struct Shared {
    pub(crate) slot: ResponseSlot,
    pub(crate) queues: DataQueues,
    pub(crate) counters: Counters,
    pub(crate) closed: AtomicBool,
}

impl Shared {
    pub(crate) fn new(capacity: QueueCapacity) -> Self {
        Self {
            slot: ResponseSlot::default(),
            queues: DataQueues::new(capacity),
            counters: Counters::default(),
            closed: AtomicBool::new(false),
        }
    }

    /// Fail the pending command and wake every queue reader.
    pub(crate) fn shut_endpoints(&self) {
        self.closed.store(true, Ordering::Release);
        self.slot.close();
        self.queues.close_all();
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    corrupt_frames: AtomicU64,
    unknown_frames: AtomicU64,
    stale_responses: AtomicU64,
    discarded_bytes: AtomicU64,
}

/// Receive-side counters for a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStats {
    /// Rejected frame candidates plus data frames that failed to decode.
    pub corrupt_frames: u64,
    /// Frames whose code is neither a response nor a data stream.
    pub unknown_frames: u64,
    /// Responses that matched no pending command.
    pub stale_responses: u64,
    /// Bytes skipped while resynchronizing.
    pub discarded_bytes: u64,
}

impl Counters {
    pub(crate) fn snapshot(&self) -> ConnectionStats {
        ConnectionStats {
            corrupt_frames: self.corrupt_frames.load(Ordering::Relaxed),
            unknown_frames: self.unknown_frames.load(Ordering::Relaxed),
            stale_responses: self.stale_responses.load(Ordering::Relaxed),
            discarded_bytes: self.discarded_bytes.load(Ordering::Relaxed),
        }
    }
}

/// Start the receive loop on its own thread.
pub(crate) fn spawn(reader: FrameReader<RadarStream>, shared: Arc<Shared>) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("xethru-rx".to_string())
        .spawn(move || run(reader, &shared))
        .map_err(TransportError::from)?;
    Ok(handle)
}

fn run(mut reader: FrameReader<RadarStream>, shared: &Shared) {
    debug!("receive loop started");
    while !shared.closed.load(Ordering::Acquire) {
        let event = reader.read_event();
        shared
            .counters
            .discarded_bytes
            .store(reader.stats().discarded_bytes, Ordering::Relaxed);

        match event {
            Ok(DecodeEvent::Frame(frame)) => route(shared, frame),
            Ok(DecodeEvent::Corrupt(err)) => {
                shared.counters.corrupt_frames.fetch_add(1, Ordering::Relaxed);
                warn!(error = %err, "resynchronizing after corrupt frame");
            }
            Err(FrameError::Io(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(FrameError::ConnectionClosed) => {
                info!("module link closed");
                break;
            }
            Err(err) => {
                if !shared.closed.load(Ordering::Acquire) {
                    warn!(error = %err, "receive loop stopped");
                }
                break;
            }
        }
    }
    shared.shut_endpoints();
    debug!("receive loop finished");
}

fn route(shared: &Shared, frame: Frame) {
    trace!(
        code = code_name(frame.code),
        len = frame.payload.len(),
        "received frame"
    );
    match frame.class() {
        CodeClass::Response => {
            let code = frame.code;
            if !shared.slot.resolve(code, frame.payload) {
                shared.counters.stale_responses.fetch_add(1, Ordering::Relaxed);
                warn!(code = code_name(code), "dropping response with no pending command");
            }
        }
        CodeClass::Data => match DataMessage::decode(frame.code, &frame.payload) {
            Ok(message) => shared.queues.push(message),
            Err(err) => {
                shared.counters.corrupt_frames.fetch_add(1, Ordering::Relaxed);
                warn!(error = %err, "dropping undecodable data frame");
            }
        },
        CodeClass::Command | CodeClass::Unknown => {
            shared.counters.unknown_frames.fetch_add(1, Ordering::Relaxed);
            warn!(code = frame.code, "dropping frame with unrecognized code");
        }
    }
}
