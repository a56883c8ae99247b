use std::time::Instant;

use serde::Serialize;

use crate::cmd::{connect, PingArgs};
use crate::exit::{module_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct PingOutput {
    pong: String,
    ready: bool,
    latency_ms: f64,
}

pub fn run(args: PingArgs, format: OutputFormat) -> CliResult<i32> {
    let radar = connect(&args.link)?;

    let started = Instant::now();
    let pong = radar.ping().map_err(|err| module_error("ping failed", err))?;
    let latency_ms = (started.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0;
    radar.close();

    let out = PingOutput {
        pong: format!("{:#010x}", pong.0),
        ready: pong.is_ready(),
        latency_ms,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => println!(
            "pong {} ({}) in {:.2}ms",
            out.pong,
            if out.ready { "ready" } else { "not ready" },
            out.latency_ms
        ),
    }

    Ok(if out.ready { SUCCESS } else { FAILURE })
}
