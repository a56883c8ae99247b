use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use xethru_module::{profiles, ModuleConfig, X4M200};
use xethru_transport::{SerialConfig, DEFAULT_BAUD_RATE};

use crate::exit::{module_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod info;
pub mod ping;
pub mod record;
pub mod reset;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the module answers and is ready.
    Ping(PingArgs),
    /// Print system information and the current sensor configuration.
    Info(InfoArgs),
    /// Reset the module.
    Reset(ResetArgs),
    /// Run a profile and print decoded sensor data.
    Record(RecordArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ping(args) => ping::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Reset(args) => reset::run(args, format),
        Command::Record(args) => record::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where the module is reachable. `--socket` wins when both are given.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial port of the module (e.g. /dev/ttyACM0, COM3).
    #[arg(long, short = 'p', env = "XETHRU_PORT")]
    pub port: Option<String>,
    /// Unix socket of a module bridge or simulator.
    #[arg(long, env = "XETHRU_SOCKET", value_name = "PATH")]
    pub socket: Option<PathBuf>,
    /// Serial line rate.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Per-command response timeout (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct PingArgs {
    #[command(flatten)]
    pub link: LinkArgs,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub link: LinkArgs,
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Restore the factory preset instead of a plain reset.
    #[arg(long)]
    pub factory: bool,
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Profile to load before running.
    #[arg(long, value_enum, default_value = "sleep")]
    pub profile: Profile,
    /// Output feature to enable and print.
    #[arg(long, short = 'o', value_enum, default_value = "sleep")]
    pub output: RecordOutput,
    /// Stop after N messages.
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
    /// Detection sensitivity (0-9).
    #[arg(long)]
    pub sensitivity: Option<u32>,
    /// Detection zone start in meters.
    #[arg(long, requires = "zone_end", allow_negative_numbers = true)]
    pub zone_start: Option<f32>,
    /// Detection zone end in meters.
    #[arg(long, requires = "zone_start")]
    pub zone_end: Option<f32>,
    /// Give up when no message arrives for this long (e.g. 30s).
    #[arg(long, default_value = "30s")]
    pub data_timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    Respiration2,
    Respiration3,
    Sleep,
}

impl Profile {
    pub fn id(self) -> u32 {
        match self {
            Profile::Respiration2 => profiles::RESPIRATION_2,
            Profile::Respiration3 => profiles::RESPIRATION_3,
            Profile::Sleep => profiles::SLEEP,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RecordOutput {
    Respiration,
    Sleep,
    MovingList,
    DetectionList,
    BasebandAp,
    BasebandIq,
    PulseDopplerFloat,
    PulseDopplerByte,
    NoisemapFloat,
    NoisemapByte,
}

/// Open the module named by `link`.
pub fn connect(link: &LinkArgs) -> CliResult<X4M200> {
    let config = ModuleConfig {
        command_timeout: parse_duration(&link.timeout)?,
        ..ModuleConfig::default()
    };

    if let Some(path) = &link.socket {
        #[cfg(unix)]
        return X4M200::connect_unix(path, config)
            .map_err(|err| module_error("connect failed", err));
        #[cfg(not(unix))]
        return Err(CliError::new(
            USAGE,
            format!("{}: unix sockets are not available on this platform", path.display()),
        ));
    }

    let Some(port) = &link.port else {
        return Err(CliError::new(
            USAGE,
            "no module given; pass --port or --socket (or set XETHRU_PORT / XETHRU_SOCKET)",
        ));
    };
    let serial = SerialConfig {
        port: port.clone(),
        baud_rate: link.baud,
        timeout: config.read_poll_interval,
    };
    X4M200::open_serial(&serial, config).map_err(|err| module_error("open failed", err))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}
