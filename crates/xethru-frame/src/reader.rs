use std::io::{ErrorKind, Read};

use tracing::warn;
use xethru_transport::RadarStream;

use crate::codec::{DecodeEvent, DecodeStats, Frame, FrameConfig, FrameDecoder};
use crate::error::{FrameError, Result};

/// Blocking frame source over a byte stream from the module.
///
/// Bytes are pulled in `read_chunk_size` pieces and fed to a
/// [`FrameDecoder`]. [`read_event`](Self::read_event) reports corrupt
/// candidates; [`read_frame`](Self::read_frame) logs and skips them.
pub struct FrameReader<T> {
    inner: T,
    decoder: FrameDecoder,
    chunk: Vec<u8>,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Reader with [`FrameConfig::default`].
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::with_max_payload(config.max_payload_size),
            chunk: vec![0u8; config.read_chunk_size.max(1)],
            config,
        }
    }

    /// Read the next decode event (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached. Read
    /// timeouts surface as `FrameError::Io` with kind `WouldBlock` or
    /// `TimedOut`; buffered bytes are kept and the call may be retried.
    pub fn read_event(&mut self) -> Result<DecodeEvent> {
        loop {
            if let Some(event) = self.decoder.next_event() {
                return Ok(event);
            }

            let read = match self.inner.read(&mut self.chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.decoder.push_bytes(&self.chunk[..read]);
        }
    }

    /// Next well-formed frame. Corrupt candidates are logged and dropped.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            match self.read_event()? {
                DecodeEvent::Frame(frame) => return Ok(frame),
                DecodeEvent::Corrupt(err) => warn!(error = %err, "discarding corrupt frame"),
            }
        }
    }

    /// Decoder totals so far.
    pub fn stats(&self) -> DecodeStats {
        self.decoder.stats()
    }

    pub fn max_payload_size(&self) -> usize {
        self.config.max_payload_size
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl FrameReader<RadarStream> {
    /// Reader over a radar link. The link gets `config.read_timeout` so a
    /// silent module wakes the caller periodically.
    pub fn over_link(mut inner: RadarStream, config: FrameConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}
