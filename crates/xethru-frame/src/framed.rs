//! Tokio codec adapter for the frame format.
//!
//! Lets async callers wrap any `AsyncRead`/`AsyncWrite` link (for example a
//! `tokio_serial` port or a `UnixStream`) with `tokio_util::codec::Framed`.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, DecodeEvent, DecodeStats, Frame, FrameConfig, FrameDecoder};
use crate::error::{FrameError, Result};

/// `tokio_util` codec yielding [`DecodeEvent`]s and accepting [`Frame`]s.
#[derive(Debug)]
pub struct XethruCodec {
    decoder: FrameDecoder,
    max_payload_size: usize,
}

impl Default for XethruCodec {
    fn default() -> Self {
        Self::with_config(&FrameConfig::default())
    }
}

impl XethruCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            decoder: FrameDecoder::with_max_payload(config.max_payload_size),
            max_payload_size: config.max_payload_size,
        }
    }

    /// Decoder totals so far.
    pub fn stats(&self) -> DecodeStats {
        self.decoder.stats()
    }
}

impl Decoder for XethruCodec {
    type Item = DecodeEvent;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<DecodeEvent>> {
        if !src.is_empty() {
            let chunk = src.split();
            self.decoder.push_bytes(&chunk);
        }
        Ok(self.decoder.next_event())
    }
}

impl Encoder<Frame> for XethruCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        if frame.payload.len() > self.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: frame.payload.len(),
                max: self.max_payload_size,
            });
        }
        encode_frame(frame.code, &frame.payload, dst)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio::io::AsyncWriteExt;
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;
    use crate::error::ProtocolError;

    #[tokio::test]
    async fn framed_roundtrip() {
        let (client, server) = tokio::io::duplex(1024);
        let mut sink = FramedWrite::new(client, XethruCodec::new());
        let mut stream = FramedRead::new(server, XethruCodec::new());

        sink.send(Frame::new(0x83, b"\x00pong".to_vec())).await.unwrap();
        sink.send(Frame::new(0xC3, vec![0x7D, 0x7E, 0x7F])).await.unwrap();

        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(
            first,
            DecodeEvent::Frame(Frame::new(0x83, b"\x00pong".to_vec()))
        );
        assert_eq!(
            second,
            DecodeEvent::Frame(Frame::new(0xC3, vec![0x7D, 0x7E, 0x7F]))
        );
    }

    #[tokio::test]
    async fn framed_reports_garbage_then_frame() {
        let (mut client, server) = tokio::io::duplex(1024);
        let mut stream = FramedRead::new(server, XethruCodec::new());

        let mut wire = BytesMut::new();
        encode_frame(0xC0, b"data", &mut wire).unwrap();
        client.write_all(&[0xAB, 0xCD]).await.unwrap();
        client.write_all(&wire).await.unwrap();
        drop(client);

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(
            first,
            DecodeEvent::Corrupt(ProtocolError::Garbage { len: 2 })
        );
        let second = stream.next().await.unwrap().unwrap();
        assert!(matches!(second, DecodeEvent::Frame(f) if f.code == 0xC0));
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn encoder_enforces_payload_limit() {
        let cfg = FrameConfig {
            max_payload_size: 2,
            ..FrameConfig::default()
        };
        let mut codec = XethruCodec::with_config(&cfg);
        let mut dst = BytesMut::new();
        let err = codec
            .encode(Frame::new(0x03, b"abc".to_vec()), &mut dst)
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }
}
