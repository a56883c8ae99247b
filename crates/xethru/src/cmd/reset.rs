use serde::Serialize;
use tracing::info;

use crate::cmd::{connect, ResetArgs};
use crate::exit::{module_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct ResetOutput {
    reset: &'static str,
}

pub fn run(args: ResetArgs, format: OutputFormat) -> CliResult<i32> {
    let radar = connect(&args.link)?;

    let kind = if args.factory {
        radar
            .reset_to_factory_preset()
            .map_err(|err| module_error("factory reset failed", err))?;
        radar.close();
        "factory"
    } else {
        radar
            .reset()
            .map_err(|err| module_error("reset failed", err))?;
        "module"
    };
    info!(kind, "reset sent; the module restarts and may re-enumerate");

    match format {
        OutputFormat::Json => print_json(&ResetOutput { reset: kind }),
        OutputFormat::Table | OutputFormat::Pretty => println!("{kind} reset done"),
    }
    Ok(SUCCESS)
}
