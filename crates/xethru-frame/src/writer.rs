use std::io::{ErrorKind, Write};
use std::time::Instant;

use bytes::BytesMut;
use tracing::trace;
use xethru_transport::RadarStream;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::codes::code_name;
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Encodes frames into a reusable buffer and pushes them out whole.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Writer with [`FrameConfig::default`].
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.code, frame.payload.as_ref())
    }

    /// Encode and send a payload under a message code.
    ///
    /// The whole frame is written before returning; a frame is never
    /// interleaved with another on the wire. A write timeout on the link
    /// surfaces as `FrameError::Io` with kind `WouldBlock` or `TimedOut`,
    /// possibly after part of the frame went out.
    pub fn send(&mut self, code: u8, payload: &[u8]) -> Result<()> {
        self.send_inner(code, payload, None)
    }

    /// Like [`send`](Self::send), but a link timeout is retried while
    /// `deadline` has not passed. Each retry blocks for the link's own write
    /// timeout, so the link must carry one.
    pub fn send_until(&mut self, code: u8, payload: &[u8], deadline: Instant) -> Result<()> {
        self.send_inner(code, payload, Some(deadline))
    }

    fn send_inner(&mut self, code: u8, payload: &[u8], deadline: Option<Instant>) -> Result<()> {
        if payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }

        self.buf.clear();
        encode_frame(code, payload, &mut self.buf)?;
        trace!(
            code = code_name(code),
            payload_len = payload.len(),
            wire_len = self.buf.len(),
            "sending frame"
        );

        let mut rest = &self.buf[..];
        while !rest.is_empty() {
            match self.inner.write(rest) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => rest = &rest[n..],
                Err(err) if should_retry(&err, deadline) => {}
                Err(err) => return Err(err.into()),
            }
        }

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if should_retry(&err, deadline) => {}
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Raw access to the link, for injecting bytes outside the framing.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}


fn should_retry(err: &std::io::Error, deadline: Option<Instant>) -> bool {
    match err.kind() {
        ErrorKind::Interrupted => true,
        ErrorKind::WouldBlock | ErrorKind::TimedOut => {
            deadline.is_some_and(|deadline| Instant::now() < deadline)
        }
        _ => false,
    }
}

impl FrameWriter<RadarStream> {
    /// Writer over a radar link with `config.write_timeout` applied.
    pub fn over_link(mut inner: RadarStream, config: FrameConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}
