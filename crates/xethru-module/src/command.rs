use std::io::ErrorKind;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, warn};
use xethru_frame::{code_name, response_code, FrameError, FrameWriter};
use xethru_transport::RadarStream;

use crate::error::{ModuleError, Result};

/// Correlation slot for the single in-flight command.
///
/// The caller arms the slot with the response code it expects, the receive
/// loop resolves it, and the caller waits with a deadline.
///
/// When a call expires, its response code is remembered. One frame with that
/// code arriving before the next command is fully written is taken to be
/// the late answer and dropped. After the write completes the two cannot be
/// told apart.
#[derive(Debug, Default)]
pub(crate) struct ResponseSlot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

#[derive(Debug, Default)]
struct SlotState {
    pending: Option<PendingRequest>,
    expired: Option<u8>,
    closed: bool,
}

#[derive(Debug)]
struct PendingRequest {
    expected: u8,
    sent: bool,
    response: Option<Bytes>,
}

impl ResponseSlot {
    pub(crate) fn arm(&self, expected: u8) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(ModuleError::Closed);
        }
        state.pending = Some(PendingRequest {
            expected,
            sent: false,
            response: None,
        });
        Ok(())
    }

    /// The armed command is fully on the wire.
    pub(crate) fn mark_sent(&self) {
        let mut state = self.lock();
        if let Some(pending) = state.pending.as_mut() {
            pending.sent = true;
        }
        state.expired = None;
    }

    /// Hand a response to the waiting caller. Returns `false` when nothing is
    /// waiting for `code` (a stale or unsolicited response).
    pub(crate) fn resolve(&self, code: u8, payload: Bytes) -> bool {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.expired == Some(code) {
            let unsent = state.pending.as_ref().is_none_or(|p| !p.sent);
            if unsent {
                state.expired = None;
                debug!(code = code_name(code), "dropping late response");
                return false;
            }
        }
        match state.pending.as_mut() {
            Some(pending) if pending.expected == code && pending.response.is_none() => {
                pending.response = Some(payload);
                drop(guard);
                self.ready.notify_all();
                true
            }
            _ => false,
        }
    }

    /// Wait for the armed response. The slot is disarmed on every outcome.
    pub(crate) fn wait(&self, deadline: Instant, timeout: Duration) -> Result<Bytes> {
        let mut state = self.lock();
        loop {
            if state.closed {
                state.pending = None;
                return Err(ModuleError::Closed);
            }
            if let Some(response) = state.pending.as_mut().and_then(|p| p.response.take()) {
                state.pending = None;
                return Ok(response);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                state.expired = state.pending.take().map(|p| p.expected);
                return Err(ModuleError::Timeout(timeout));
            }
            state = self
                .ready
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    pub(crate) fn disarm(&self) {
        self.lock().pending = None;
    }

    /// Give up on the armed command; a late answer to it may still come.
    pub(crate) fn expire(&self) {
        let mut state = self.lock();
        state.expired = state.pending.take().map(|p| p.expected);
    }

    /// Fail the pending call (if any) and every later `arm`.
    pub(crate) fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sends command frames and correlates their responses.
///
/// The writer lock is held for the whole round trip, so concurrent callers
/// run one after another and at most one command is ever in flight.
pub(crate) struct CommandChannel {
    writer: Mutex<FrameWriter<RadarStream>>,
}

impl CommandChannel {
    pub(crate) fn new(writer: FrameWriter<RadarStream>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Send `code` with `payload` and wait for its response.
    ///
    /// `timeout` bounds the whole call from entry, including the wait for the
    /// writer lock and the write itself. Returns the response data after the
    /// status byte.
    pub(crate) fn call(
        &self,
        slot: &ResponseSlot,
        code: u8,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Bytes> {
        let deadline = Instant::now() + timeout;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ModuleError::Timeout(timeout));
        }
        writer
            .get_mut()
            .set_write_timeout(Some(remaining.max(MIN_WRITE_TIMEOUT)))?;
        slot.arm(response_code(code))?;

        debug!(
            code = code_name(code),
            payload_len = payload.len(),
            "sending command"
        );
        if let Err(err) = writer.send_until(code, payload, deadline) {
            if slot.is_closed() {
                slot.disarm();
                return Err(ModuleError::Closed);
            }
            if is_write_timeout(&err) {
                slot.expire();
                warn!(code = code_name(code), ?timeout, "command write timed out");
                return Err(ModuleError::Timeout(timeout));
            }
            slot.disarm();
            return Err(err.into());
        }
        slot.mark_sent();

        let response = slot.wait(deadline, timeout)?;
        drop(writer);

        let status = *response.first().ok_or_else(|| ModuleError::MalformedResponse {
            code,
            reason: "empty response".to_string(),
        })?;
        debug!(code = code_name(code), status, "command answered");
        if status != 0 {
            return Err(ModuleError::DeviceRejected { code, status });
        }
        Ok(response.slice(1..))
    }
}

/// Unix sockets reject a zero write timeout.
const MIN_WRITE_TIMEOUT: Duration = Duration::from_millis(1);

fn is_write_timeout(err: &FrameError) -> bool {
    matches!(
        err,
        FrameError::Io(io) if matches!(io.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn resolve_only_matches_expected_code() {
        let slot = ResponseSlot::default();
        slot.arm(0x83).unwrap();
        assert!(!slot.resolve(0x84, Bytes::from_static(b"\x00")));
        assert!(slot.resolve(0x83, Bytes::from_static(b"\x00ok")));
        assert!(!slot.resolve(0x83, Bytes::from_static(b"\x00dup")));

        let deadline = Instant::now() + Duration::from_millis(10);
        let response = slot.wait(deadline, Duration::from_millis(10)).unwrap();
        assert_eq!(response.as_ref(), b"\x00ok");
    }

    #[test]
    fn resolve_without_pending_is_stale() {
        let slot = ResponseSlot::default();
        assert!(!slot.resolve(0x83, Bytes::new()));
    }

    #[test]
    fn wait_times_out_and_disarms() {
        let slot = ResponseSlot::default();
        slot.arm(0x89).unwrap();
        let timeout = Duration::from_millis(30);
        let started = Instant::now();
        let err = slot.wait(started + timeout, timeout).unwrap_err();
        assert!(matches!(err, ModuleError::Timeout(t) if t == timeout));
        assert!(started.elapsed() >= timeout);
        assert!(!slot.resolve(0x89, Bytes::new()));
    }

    #[test]
    fn late_answer_before_next_write_is_dropped() {
        let slot = ResponseSlot::default();
        let timeout = Duration::from_millis(5);
        slot.arm(0x83).unwrap();
        assert!(slot.wait(Instant::now() + timeout, timeout).is_err());

        // Next PING armed but not yet written: the old answer shows up.
        slot.arm(0x83).unwrap();
        assert!(!slot.resolve(0x83, Bytes::from_static(b"\x00late")));
        slot.mark_sent();
        assert!(slot.resolve(0x83, Bytes::from_static(b"\x00fresh")));

        let response = slot.wait(Instant::now() + timeout, timeout).unwrap();
        assert_eq!(response.as_ref(), b"\x00fresh");
    }

    #[test]
    fn only_one_late_answer_is_dropped() {
        let slot = ResponseSlot::default();
        slot.arm(0x83).unwrap();
        slot.expire();

        // Arrives between calls: stale, and it clears the expired code.
        assert!(!slot.resolve(0x83, Bytes::from_static(b"\x00late")));
        slot.arm(0x83).unwrap();
        assert!(slot.resolve(0x83, Bytes::from_static(b"\x00fresh")));
    }

    #[test]
    fn expired_code_does_not_affect_other_commands() {
        let slot = ResponseSlot::default();
        slot.arm(0x83).unwrap();
        slot.expire();

        slot.arm(0x8C).unwrap();
        assert!(slot.resolve(0x8C, Bytes::from_static(b"\x00\x01")));
    }

    #[test]
    fn close_wakes_waiter_and_blocks_arm() {
        let slot = Arc::new(ResponseSlot::default());
        slot.arm(0x85).unwrap();
        let waiter = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                let timeout = Duration::from_secs(5);
                slot.wait(Instant::now() + timeout, timeout)
            })
        };
        thread::sleep(Duration::from_millis(20));
        slot.close();
        assert!(matches!(waiter.join().unwrap(), Err(ModuleError::Closed)));
        assert!(matches!(slot.arm(0x85), Err(ModuleError::Closed)));
    }
}
