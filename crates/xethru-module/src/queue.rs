use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::config::QueueCapacity;
use crate::error::{ModuleError, Result};
use crate::messages::{
    BasebandApData, BasebandIqData, DataMessage, NoisemapByteData, NoisemapFloatData,
    PulseDopplerByteData, PulseDopplerFloatData, RespirationData, RespirationDetectionListData,
    RespirationMovingListData, SleepData,
};

/// FIFO of decoded records for one data stream.
///
/// The receive loop pushes; any number of threads may read. Readers block on
/// a condition variable, never by polling. Closing the queue wakes every
/// reader; records already buffered can still be drained after close.
pub struct SubscriptionQueue<T> {
    name: &'static str,
    capacity: QueueCapacity,
    state: Mutex<QueueState<T>>,
    ready: Condvar,
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
    overflowed: u64,
}

impl<T> SubscriptionQueue<T> {
    pub fn new(name: &'static str, capacity: QueueCapacity) -> Self {
        Self {
            name,
            capacity,
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
                overflowed: 0,
            }),
            ready: Condvar::new(),
        }
    }

    /// Stream name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of buffered, unread records.
    pub fn count(&self) -> usize {
        self.lock().items.len()
    }

    /// Take the oldest record, blocking until one arrives.
    ///
    /// Returns `ModuleError::Closed` once the queue is closed and drained.
    pub fn read(&self) -> Result<T> {
        let guard = self.lock();
        let mut guard = self
            .ready
            .wait_while(guard, |s| s.items.is_empty() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        guard.items.pop_front().ok_or(ModuleError::Closed)
    }

    /// Take the oldest record if one is buffered.
    pub fn try_read(&self) -> Result<Option<T>> {
        let mut guard = self.lock();
        match guard.items.pop_front() {
            Some(item) => Ok(Some(item)),
            None if guard.closed => Err(ModuleError::Closed),
            None => Ok(None),
        }
    }

    /// Take the oldest record, waiting at most `timeout`. `Ok(None)` means the
    /// wait timed out.
    pub fn read_timeout(&self, timeout: Duration) -> Result<Option<T>> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock();
        loop {
            if let Some(item) = guard.items.pop_front() {
                return Ok(Some(item));
            }
            if guard.closed {
                return Err(ModuleError::Closed);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            guard = self
                .ready
                .wait_timeout(guard, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Records evicted by the bounded capacity policy.
    pub fn overflow_count(&self) -> u64 {
        self.lock().overflowed
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Append a record. Under `Bounded(n)` a full queue evicts its oldest
    /// record first. Pushes after close are dropped.
    pub(crate) fn push(&self, item: T) {
        let mut guard = self.lock();
        if guard.closed {
            return;
        }
        if let QueueCapacity::Bounded(max) = self.capacity {
            while guard.items.len() >= max.max(1) {
                guard.items.pop_front();
                guard.overflowed += 1;
                warn!(
                    queue = self.name,
                    overflowed = guard.overflowed,
                    "queue full, evicting oldest record"
                );
            }
        }
        guard.items.push_back(item);
        drop(guard);
        self.ready.notify_one();
    }

    /// Mark the stream ended and wake every blocked reader.
    pub(crate) fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> std::fmt::Debug for SubscriptionQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SubscriptionQueue")
            .field("name", &self.name)
            .field("count", &state.items.len())
            .field("closed", &state.closed)
            .field("overflowed", &state.overflowed)
            .finish()
    }
}

/// One queue per data stream.
#[derive(Debug)]
pub struct DataQueues {
    pub baseband_ap: SubscriptionQueue<BasebandApData>,
    pub baseband_iq: SubscriptionQueue<BasebandIqData>,
    pub respiration_legacy: SubscriptionQueue<RespirationData>,
    pub sleep: SubscriptionQueue<SleepData>,
    pub respiration_moving_list: SubscriptionQueue<RespirationMovingListData>,
    pub respiration_detection_list: SubscriptionQueue<RespirationDetectionListData>,
    pub pulse_doppler_float: SubscriptionQueue<PulseDopplerFloatData>,
    pub pulse_doppler_byte: SubscriptionQueue<PulseDopplerByteData>,
    pub noisemap_float: SubscriptionQueue<NoisemapFloatData>,
    pub noisemap_byte: SubscriptionQueue<NoisemapByteData>,
}

impl DataQueues {
    pub fn new(capacity: QueueCapacity) -> Self {
        Self {
            baseband_ap: SubscriptionQueue::new("baseband_ap", capacity),
            baseband_iq: SubscriptionQueue::new("baseband_iq", capacity),
            respiration_legacy: SubscriptionQueue::new("respiration_legacy", capacity),
            sleep: SubscriptionQueue::new("sleep", capacity),
            respiration_moving_list: SubscriptionQueue::new("respiration_moving_list", capacity),
            respiration_detection_list: SubscriptionQueue::new(
                "respiration_detection_list",
                capacity,
            ),
            pulse_doppler_float: SubscriptionQueue::new("pulse_doppler_float", capacity),
            pulse_doppler_byte: SubscriptionQueue::new("pulse_doppler_byte", capacity),
            noisemap_float: SubscriptionQueue::new("noisemap_float", capacity),
            noisemap_byte: SubscriptionQueue::new("noisemap_byte", capacity),
        }
    }

    /// Route a record to its stream's queue.
    pub(crate) fn push(&self, message: DataMessage) {
        match message {
            DataMessage::BasebandAmplitudePhase(m) => self.baseband_ap.push(m),
            DataMessage::BasebandIq(m) => self.baseband_iq.push(m),
            DataMessage::RespirationLegacy(m) => self.respiration_legacy.push(m),
            DataMessage::Sleep(m) => self.sleep.push(m),
            DataMessage::RespirationMovingList(m) => self.respiration_moving_list.push(m),
            DataMessage::RespirationDetectionList(m) => self.respiration_detection_list.push(m),
            DataMessage::PulseDopplerFloat(m) => self.pulse_doppler_float.push(m),
            DataMessage::PulseDopplerByte(m) => self.pulse_doppler_byte.push(m),
            DataMessage::NoisemapFloat(m) => self.noisemap_float.push(m),
            DataMessage::NoisemapByte(m) => self.noisemap_byte.push(m),
        }
    }

    pub(crate) fn close_all(&self) {
        self.baseband_ap.close();
        self.baseband_iq.close();
        self.respiration_legacy.close();
        self.sleep.close();
        self.respiration_moving_list.close();
        self.respiration_detection_list.close();
        self.pulse_doppler_float.close();
        self.pulse_doppler_byte.close();
        self.noisemap_float.close();
        self.noisemap_byte.close();
    }

    /// Total records buffered across all streams.
    pub fn total_count(&self) -> usize {
        self.baseband_ap.count()
            + self.baseband_iq.count()
            + self.respiration_legacy.count()
            + self.sleep.count()
            + self.respiration_moving_list.count()
            + self.respiration_detection_list.count()
            + self.pulse_doppler_float.count()
            + self.pulse_doppler_byte.count()
            + self.noisemap_float.count()
            + self.noisemap_byte.count()
    }
}
