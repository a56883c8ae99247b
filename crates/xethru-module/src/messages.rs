//! Streaming data records and their payload decoders.
//!
//! Every record starts with the module's frame counter. Decoding is strict:
//! a short payload, trailing bytes, or an element count that does not fit
//! the payload are all rejected.

use serde::Serialize;
use xethru_frame::codes;

use crate::payload::{PayloadError, PayloadReader};

/// Baseband amplitude/phase frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasebandApData {
    pub frame_counter: u32,
    pub num_bins: u32,
    pub bin_length: f32,
    pub sampling_frequency: f32,
    pub carrier_frequency: f32,
    pub range_offset: f32,
    pub amplitude: Vec<f32>,
    pub phase: Vec<f32>,
}

/// Baseband I/Q frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasebandIqData {
    pub frame_counter: u32,
    pub num_bins: u32,
    pub bin_length: f32,
    pub sampling_frequency: f32,
    pub carrier_frequency: f32,
    pub range_offset: f32,
    pub i_data: Vec<f32>,
    pub q_data: Vec<f32>,
}

/// Legacy respiration status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RespirationData {
    pub frame_counter: u32,
    pub sensor_state: u32,
    pub respiration_rate: u32,
    pub distance: f32,
    pub movement: f32,
    pub signal_quality: u32,
}

/// Sleep status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleepData {
    pub frame_counter: u32,
    pub sensor_state: u32,
    pub respiration_rate: f32,
    pub distance: f32,
    pub signal_quality: u32,
    pub movement_slow: f32,
    pub movement_fast: f32,
}

/// Per-interval movement over the detection zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RespirationMovingListData {
    pub frame_counter: u32,
    pub movement_slow: Vec<f32>,
    pub movement_fast: Vec<f32>,
}

/// Individual detections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RespirationDetectionListData {
    pub frame_counter: u32,
    pub distance: Vec<f32>,
    pub radar_cross_section: Vec<f32>,
    pub velocity: Vec<f32>,
}

/// Header shared by pulse-Doppler and noisemap records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PulseDopplerHeader {
    pub frame_counter: u32,
    pub matrix_counter: u32,
    pub range_idx: u32,
    pub range_bins: u32,
    pub frequency_count: u32,
    pub pulsedoppler_instance: u32,
    pub fps: f32,
    pub fps_decimated: f32,
    pub frequency_start: f32,
    pub frequency_step: f32,
    pub range: f32,
}

/// One range bin of a pulse-Doppler (or noisemap) matrix as floats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PulseDopplerFloatData {
    #[serde(flatten)]
    pub header: PulseDopplerHeader,
    pub data: Vec<f32>,
}

/// One range bin of a pulse-Doppler (or noisemap) matrix, byte-compressed.
///
/// `value = byte_step_start + byte * byte_step_size` (in dB).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PulseDopplerByteData {
    #[serde(flatten)]
    pub header: PulseDopplerHeader,
    pub byte_step_start: f32,
    pub byte_step_size: f32,
    pub data: Vec<u8>,
}

impl PulseDopplerByteData {
    /// Expand the compressed bytes to floats.
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.data
            .iter()
            .map(|b| self.byte_step_start + f32::from(*b) * self.byte_step_size)
    }
}

pub type NoisemapFloatData = PulseDopplerFloatData;
pub type NoisemapByteData = PulseDopplerByteData;

/// A decoded streaming record, tagged by its message code.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataMessage {
    BasebandAmplitudePhase(BasebandApData),
    BasebandIq(BasebandIqData),
    RespirationLegacy(RespirationData),
    Sleep(SleepData),
    RespirationMovingList(RespirationMovingListData),
    RespirationDetectionList(RespirationDetectionListData),
    PulseDopplerFloat(PulseDopplerFloatData),
    PulseDopplerByte(PulseDopplerByteData),
    NoisemapFloat(NoisemapFloatData),
    NoisemapByte(NoisemapByteData),
}

/// A data frame that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataDecodeError {
    #[error("code {0:#04x} is not a data message")]
    UnknownCode(u8),
    #[error("bad {name} payload: {source}")]
    Payload {
        name: &'static str,
        source: PayloadError,
    },
}

impl DataMessage {
    /// Decode a data frame payload.
    pub fn decode(code: u8, payload: &[u8]) -> Result<Self, DataDecodeError> {
        let mut r = PayloadReader::new(payload);
        let message = match code {
            codes::DATA_BASEBAND_AP => decode_baseband_ap(&mut r).map(Self::BasebandAmplitudePhase),
            codes::DATA_BASEBAND_IQ => decode_baseband_iq(&mut r).map(Self::BasebandIq),
            codes::DATA_RESPIRATION_LEGACY => decode_respiration(&mut r).map(Self::RespirationLegacy),
            codes::DATA_SLEEP => decode_sleep(&mut r).map(Self::Sleep),
            codes::DATA_RESPIRATION_MOVING_LIST => {
                decode_moving_list(&mut r).map(Self::RespirationMovingList)
            }
            codes::DATA_RESPIRATION_DETECTION_LIST => {
                decode_detection_list(&mut r).map(Self::RespirationDetectionList)
            }
            codes::DATA_PULSE_DOPPLER_FLOAT => decode_pd_float(&mut r).map(Self::PulseDopplerFloat),
            codes::DATA_PULSE_DOPPLER_BYTE => decode_pd_byte(&mut r).map(Self::PulseDopplerByte),
            codes::DATA_NOISEMAP_FLOAT => decode_pd_float(&mut r).map(Self::NoisemapFloat),
            codes::DATA_NOISEMAP_BYTE => decode_pd_byte(&mut r).map(Self::NoisemapByte),
            other => return Err(DataDecodeError::UnknownCode(other)),
        };
        message
            .and_then(|message| r.finish().map(|()| message))
            .map_err(|source| DataDecodeError::Payload {
                name: xethru_frame::code_name(code),
                source,
            })
    }

    /// Message code this record arrives under.
    pub fn code(&self) -> u8 {
        match self {
            Self::BasebandAmplitudePhase(_) => codes::DATA_BASEBAND_AP,
            Self::BasebandIq(_) => codes::DATA_BASEBAND_IQ,
            Self::RespirationLegacy(_) => codes::DATA_RESPIRATION_LEGACY,
            Self::Sleep(_) => codes::DATA_SLEEP,
            Self::RespirationMovingList(_) => codes::DATA_RESPIRATION_MOVING_LIST,
            Self::RespirationDetectionList(_) => codes::DATA_RESPIRATION_DETECTION_LIST,
            Self::PulseDopplerFloat(_) => codes::DATA_PULSE_DOPPLER_FLOAT,
            Self::PulseDopplerByte(_) => codes::DATA_PULSE_DOPPLER_BYTE,
            Self::NoisemapFloat(_) => codes::DATA_NOISEMAP_FLOAT,
            Self::NoisemapByte(_) => codes::DATA_NOISEMAP_BYTE,
        }
    }

    pub fn frame_counter(&self) -> u32 {
        match self {
            Self::BasebandAmplitudePhase(m) => m.frame_counter,
            Self::BasebandIq(m) => m.frame_counter,
            Self::RespirationLegacy(m) => m.frame_counter,
            Self::Sleep(m) => m.frame_counter,
            Self::RespirationMovingList(m) => m.frame_counter,
            Self::RespirationDetectionList(m) => m.frame_counter,
            Self::PulseDopplerFloat(m) | Self::NoisemapFloat(m) => m.header.frame_counter,
            Self::PulseDopplerByte(m) | Self::NoisemapByte(m) => m.header.frame_counter,
        }
    }
}

struct BasebandHeader {
    frame_counter: u32,
    num_bins: u32,
    bin_length: f32,
    sampling_frequency: f32,
    carrier_frequency: f32,
    range_offset: f32,
}

fn decode_baseband_header(r: &mut PayloadReader<'_>) -> Result<BasebandHeader, PayloadError> {
    Ok(BasebandHeader {
        frame_counter: r.u32()?,
        num_bins: r.u32()?,
        bin_length: r.f32()?,
        sampling_frequency: r.f32()?,
        carrier_frequency: r.f32()?,
        range_offset: r.f32()?,
    })
}

fn decode_baseband_ap(r: &mut PayloadReader<'_>) -> Result<BasebandApData, PayloadError> {
    let h = decode_baseband_header(r)?;
    Ok(BasebandApData {
        amplitude: r.f32_vec(h.num_bins)?,
        phase: r.f32_vec(h.num_bins)?,
        frame_counter: h.frame_counter,
        num_bins: h.num_bins,
        bin_length: h.bin_length,
        sampling_frequency: h.sampling_frequency,
        carrier_frequency: h.carrier_frequency,
        range_offset: h.range_offset,
    })
}

fn decode_baseband_iq(r: &mut PayloadReader<'_>) -> Result<BasebandIqData, PayloadError> {
    let h = decode_baseband_header(r)?;
    Ok(BasebandIqData {
        i_data: r.f32_vec(h.num_bins)?,
        q_data: r.f32_vec(h.num_bins)?,
        frame_counter: h.frame_counter,
        num_bins: h.num_bins,
        bin_length: h.bin_length,
        sampling_frequency: h.sampling_frequency,
        carrier_frequency: h.carrier_frequency,
        range_offset: h.range_offset,
    })
}

fn decode_respiration(r: &mut PayloadReader<'_>) -> Result<RespirationData, PayloadError> {
    Ok(RespirationData {
        frame_counter: r.u32()?,
        sensor_state: r.u32()?,
        respiration_rate: r.u32()?,
        distance: r.f32()?,
        movement: r.f32()?,
        signal_quality: r.u32()?,
    })
}

fn decode_sleep(r: &mut PayloadReader<'_>) -> Result<SleepData, PayloadError> {
    Ok(SleepData {
        frame_counter: r.u32()?,
        sensor_state: r.u32()?,
        respiration_rate: r.f32()?,
        distance: r.f32()?,
        signal_quality: r.u32()?,
        movement_slow: r.f32()?,
        movement_fast: r.f32()?,
    })
}

fn decode_moving_list(r: &mut PayloadReader<'_>) -> Result<RespirationMovingListData, PayloadError> {
    let frame_counter = r.u32()?;
    let count = r.u32()?;
    Ok(RespirationMovingListData {
        frame_counter,
        movement_slow: r.f32_vec(count)?,
        movement_fast: r.f32_vec(count)?,
    })
}

fn decode_detection_list(
    r: &mut PayloadReader<'_>,
) -> Result<RespirationDetectionListData, PayloadError> {
    let frame_counter = r.u32()?;
    let count = r.u32()?;
    Ok(RespirationDetectionListData {
        frame_counter,
        distance: r.f32_vec(count)?,
        radar_cross_section: r.f32_vec(count)?,
        velocity: r.f32_vec(count)?,
    })
}

fn decode_pd_header(r: &mut PayloadReader<'_>) -> Result<PulseDopplerHeader, PayloadError> {
    Ok(PulseDopplerHeader {
        frame_counter: r.u32()?,
        matrix_counter: r.u32()?,
        range_idx: r.u32()?,
        range_bins: r.u32()?,
        frequency_count: r.u32()?,
        pulsedoppler_instance: r.u32()?,
        fps: r.f32()?,
        fps_decimated: r.f32()?,
        frequency_start: r.f32()?,
        frequency_step: r.f32()?,
        range: r.f32()?,
    })
}

fn decode_pd_float(r: &mut PayloadReader<'_>) -> Result<PulseDopplerFloatData, PayloadError> {
    let header = decode_pd_header(r)?;
    let data = r.f32_vec(header.frequency_count)?;
    Ok(PulseDopplerFloatData { header, data })
}

fn decode_pd_byte(r: &mut PayloadReader<'_>) -> Result<PulseDopplerByteData, PayloadError> {
    let header = decode_pd_header(r)?;
    let byte_step_start = r.f32()?;
    let byte_step_size = r.f32()?;
    let data = r.byte_vec(header.frequency_count)?;
    Ok(PulseDopplerByteData {
        header,
        byte_step_start,
        byte_step_size,
        data,
    })
}

#[cfg(test)]
mod tests {
    use bytes::{BufMut, BytesMut};

    use super::*;

    fn baseband_payload(num_bins: u32, values: &[f32]) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_u32_le(42);
        buf.put_u32_le(num_bins);
        buf.put_f32_le(0.05);
        buf.put_f32_le(23.328e9);
        buf.put_f32_le(7.29e9);
        buf.put_f32_le(0.18);
        for v in values {
            buf.put_f32_le(*v);
        }
        buf
    }

    fn pd_header(buf: &mut BytesMut, frequency_count: u32) {
        for v in [7u32, 1, 3, 20, frequency_count, 0] {
            buf.put_u32_le(v);
        }
        for v in [17.0f32, 1.0, -8.5, 0.5, 1.2] {
            buf.put_f32_le(v);
        }
    }

    #[test]
    fn decodes_baseband_iq() {
        let payload = baseband_payload(2, &[1.0, 2.0, -1.0, -2.0]);
        let msg = DataMessage::decode(codes::DATA_BASEBAND_IQ, &payload).unwrap();
        match msg {
            DataMessage::BasebandIq(ref iq) => {
                assert_eq!(iq.frame_counter, 42);
                assert_eq!(iq.i_data, vec![1.0, 2.0]);
                assert_eq!(iq.q_data, vec![-1.0, -2.0]);
            }
            other => panic!("unexpected message {other:?}"),
        }
        assert_eq!(msg.code(), codes::DATA_BASEBAND_IQ);
        assert_eq!(msg.frame_counter(), 42);
    }

    #[test]
    fn baseband_with_wrong_bin_count_rejected() {
        let payload = baseband_payload(3, &[1.0, 2.0, -1.0, -2.0]);
        let err = DataMessage::decode(codes::DATA_BASEBAND_AP, &payload).unwrap_err();
        assert!(matches!(
            err,
            DataDecodeError::Payload {
                source: PayloadError::Count(3),
                ..
            }
        ));
    }

    #[test]
    fn decodes_sleep() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(9);
        buf.put_u32_le(1);
        buf.put_f32_le(14.5);
        buf.put_f32_le(1.1);
        buf.put_u32_le(8);
        buf.put_f32_le(0.2);
        buf.put_f32_le(0.4);

        let msg = DataMessage::decode(codes::DATA_SLEEP, &buf).unwrap();
        assert_eq!(
            msg,
            DataMessage::Sleep(SleepData {
                frame_counter: 9,
                sensor_state: 1,
                respiration_rate: 14.5,
                distance: 1.1,
                signal_quality: 8,
                movement_slow: 0.2,
                movement_fast: 0.4,
            })
        );
    }

    #[test]
    fn respiration_with_trailing_bytes_rejected() {
        let mut buf = BytesMut::new();
        for _ in 0..6 {
            buf.put_u32_le(0);
        }
        buf.put_u8(0xFF);
        let err = DataMessage::decode(codes::DATA_RESPIRATION_LEGACY, &buf).unwrap_err();
        assert!(matches!(
            err,
            DataDecodeError::Payload {
                source: PayloadError::Trailing(1),
                ..
            }
        ));
    }

    #[test]
    fn decodes_detection_list() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(5);
        buf.put_u32_le(2);
        for v in [0.5f32, 1.5, 0.01, 0.02, -0.1, 0.1] {
            buf.put_f32_le(v);
        }
        let msg = DataMessage::decode(codes::DATA_RESPIRATION_DETECTION_LIST, &buf).unwrap();
        let DataMessage::RespirationDetectionList(list) = msg else {
            panic!("wrong variant");
        };
        assert_eq!(list.distance, vec![0.5, 1.5]);
        assert_eq!(list.radar_cross_section, vec![0.01, 0.02]);
        assert_eq!(list.velocity, vec![-0.1, 0.1]);
    }

    #[test]
    fn decodes_noisemap_byte_and_expands_values() {
        let mut buf = BytesMut::new();
        pd_header(&mut buf, 3);
        buf.put_f32_le(-10.0);
        buf.put_f32_le(0.5);
        buf.put_slice(&[0, 2, 4]);

        let msg = DataMessage::decode(codes::DATA_NOISEMAP_BYTE, &buf).unwrap();
        let DataMessage::NoisemapByte(nm) = msg else {
            panic!("wrong variant");
        };
        assert_eq!(nm.header.frame_counter, 7);
        assert_eq!(nm.header.frequency_count, 3);
        assert_eq!(nm.values().collect::<Vec<_>>(), vec![-10.0, -9.0, -8.0]);
    }

    #[test]
    fn decodes_pulse_doppler_float() {
        let mut buf = BytesMut::new();
        pd_header(&mut buf, 2);
        buf.put_f32_le(3.0);
        buf.put_f32_le(4.0);

        let msg = DataMessage::decode(codes::DATA_PULSE_DOPPLER_FLOAT, &buf).unwrap();
        assert!(matches!(msg, DataMessage::PulseDopplerFloat(ref pd) if pd.data == vec![3.0, 4.0]));
    }

    #[test]
    fn non_data_code_rejected() {
        assert_eq!(
            DataMessage::decode(codes::PING, &[]).unwrap_err(),
            DataDecodeError::UnknownCode(codes::PING)
        );
    }

    #[test]
    fn serializes_with_type_tag() {
        let msg = DataMessage::RespirationLegacy(RespirationData {
            frame_counter: 1,
            sensor_state: 2,
            respiration_rate: 12,
            distance: 0.5,
            movement: 0.0,
            signal_quality: 9,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "respiration_legacy");
        assert_eq!(json["respiration_rate"], 12);
    }
}
