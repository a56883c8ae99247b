use std::collections::BTreeMap;

use serde::Serialize;
use xethru_module::{ModuleError, SystemInfoCode, X4M200};

use crate::cmd::{connect, InfoArgs};
use crate::exit::{module_error, CliResult, SUCCESS};
use crate::output::{print_fields, print_json, OutputFormat};

#[derive(Serialize)]
struct InfoOutput {
    system: BTreeMap<&'static str, Option<String>>,
    profile_id: Option<String>,
    sensor_mode: String,
    detection_zone: Option<[f32; 2]>,
}

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let radar = connect(&args.link)?;
    let out = collect(&radar).map_err(|err| module_error("info failed", err))?;
    radar.close();

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => {
            let mut rows: Vec<(&str, String)> = out
                .system
                .iter()
                .map(|(name, value)| (*name, display(value.as_deref())))
                .collect();
            rows.push(("profile_id", display(out.profile_id.as_deref())));
            rows.push(("sensor_mode", out.sensor_mode.clone()));
            let zone = out
                .detection_zone
                .map(|[start, end]| format!("{start:.2}..{end:.2} m"));
            rows.push(("detection_zone", display(zone.as_deref())));
            print_fields("X4M200", &rows, format);
        }
    }
    Ok(SUCCESS)
}

fn collect(radar: &X4M200) -> xethru_module::Result<InfoOutput> {
    let mut system = BTreeMap::new();
    for code in SystemInfoCode::ALL {
        system.insert(code.name(), optional(radar.get_system_info(code))?);
    }
    let profile_id = radar.get_profile_id()?.map(|id| format!("{id:#010x}"));
    let sensor_mode = radar.get_sensor_mode()?.to_string();
    let detection_zone = optional(radar.get_detection_zone())?.map(|z| [z.start, z.end]);

    Ok(InfoOutput {
        system,
        profile_id,
        sensor_mode,
        detection_zone,
    })
}

/// Older firmware rejects some queries; report those as unavailable.
fn optional<T>(result: xethru_module::Result<T>) -> xethru_module::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ModuleError::DeviceRejected { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

fn display(value: Option<&str>) -> String {
    value.unwrap_or("unavailable").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_queries_become_unavailable() {
        let rejected: xethru_module::Result<String> = Err(ModuleError::DeviceRejected {
            code: 0x04,
            status: 1,
        });
        assert!(optional(rejected).unwrap().is_none());

        let timeout: xethru_module::Result<String> =
            Err(ModuleError::Timeout(std::time::Duration::from_secs(1)));
        assert!(optional(timeout).is_err());
    }
}
