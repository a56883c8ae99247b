use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use xethru_module::DataMessage;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Two-column table for key/value reports.
pub fn print_fields(title: &str, rows: &[(&str, String)], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![title, ""]);
            for (key, value) in rows {
                table.add_row(vec![key.to_string(), value.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Json => {
            println!("{title}:");
            let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
            for (key, value) in rows {
                println!("  {key:<width$}  {value}");
            }
        }
    }
}

pub struct MessagePrinter {
    format: OutputFormat,
    table: Option<Table>,
}

impl MessagePrinter {
    pub fn new(format: OutputFormat) -> Self {
        let table = (format == OutputFormat::Table).then(|| {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "FRAME", "SUMMARY"]);
            table
        });
        Self { format, table }
    }

    pub fn print(&mut self, message: &DataMessage) {
        match (&mut self.table, self.format) {
            (Some(table), _) => {
                table.add_row(vec![
                    message_type(message).to_string(),
                    message.frame_counter().to_string(),
                    summary(message),
                ]);
            }
            (None, OutputFormat::Json) => print_json(message),
            (None, _) => println!(
                "{} frame={} {}",
                message_type(message),
                message.frame_counter(),
                summary(message)
            ),
        }
    }

    /// Tables are printed once recording stops.
    pub fn finish(self) {
        if let Some(table) = self.table {
            println!("{table}");
        }
    }
}

pub fn message_type(message: &DataMessage) -> &'static str {
    match message {
        DataMessage::BasebandAmplitudePhase(_) => "baseband_amplitude_phase",
        DataMessage::BasebandIq(_) => "baseband_iq",
        DataMessage::RespirationLegacy(_) => "respiration",
        DataMessage::Sleep(_) => "sleep",
        DataMessage::RespirationMovingList(_) => "respiration_moving_list",
        DataMessage::RespirationDetectionList(_) => "respiration_detection_list",
        DataMessage::PulseDopplerFloat(_) => "pulse_doppler_float",
        DataMessage::PulseDopplerByte(_) => "pulse_doppler_byte",
        DataMessage::NoisemapFloat(_) => "noisemap_float",
        DataMessage::NoisemapByte(_) => "noisemap_byte",
    }
}

fn summary(message: &DataMessage) -> String {
    match message {
        DataMessage::BasebandAmplitudePhase(m) => {
            format!("bins={} offset={:.2}m", m.num_bins, m.range_offset)
        }
        DataMessage::BasebandIq(m) => format!("bins={} offset={:.2}m", m.num_bins, m.range_offset),
        DataMessage::RespirationLegacy(m) => format!(
            "state={} rpm={} distance={:.2}m movement={:.2} quality={}",
            m.sensor_state, m.respiration_rate, m.distance, m.movement, m.signal_quality
        ),
        DataMessage::Sleep(m) => format!(
            "state={} rpm={:.1} distance={:.2}m quality={}",
            m.sensor_state, m.respiration_rate, m.distance, m.signal_quality
        ),
        DataMessage::RespirationMovingList(m) => format!("intervals={}", m.movement_slow.len()),
        DataMessage::RespirationDetectionList(m) => format!("detections={}", m.distance.len()),
        DataMessage::PulseDopplerFloat(m) | DataMessage::NoisemapFloat(m) => format!(
            "range_idx={} frequencies={}",
            m.header.range_idx,
            m.data.len()
        ),
        DataMessage::PulseDopplerByte(m) | DataMessage::NoisemapByte(m) => format!(
            "range_idx={} frequencies={}",
            m.header.range_idx,
            m.data.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use xethru_module::SleepData;

    use super::*;

    #[test]
    fn sleep_summary() {
        let message = DataMessage::Sleep(SleepData {
            frame_counter: 3,
            sensor_state: 0,
            respiration_rate: 14.5,
            distance: 1.5,
            signal_quality: 8,
            movement_slow: 0.0,
            movement_fast: 0.0,
        });
        assert_eq!(message_type(&message), "sleep");
        assert_eq!(
            summary(&message),
            "state=0 rpm=14.5 distance=1.50m quality=8"
        );
    }
}
