mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "xethru", version, about = "XeThru X4M200 radar CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::cmd::{Profile, RecordOutput};

    #[test]
    fn parses_ping_with_socket() {
        let cli = Cli::try_parse_from(["xethru", "ping", "--socket", "/tmp/x4m200.sock"])
            .expect("ping args should parse");

        let Command::Ping(args) = cli.command else {
            panic!("expected ping");
        };
        assert_eq!(args.link.socket, Some(PathBuf::from("/tmp/x4m200.sock")));
        assert_eq!(args.link.baud, 115_200);
        assert_eq!(args.link.timeout, "2s");
    }

    #[test]
    fn parses_record_options() {
        let cli = Cli::try_parse_from([
            "xethru",
            "--format",
            "json",
            "record",
            "--port",
            "/dev/ttyACM0",
            "--profile",
            "respiration2",
            "-o",
            "respiration",
            "-n",
            "10",
            "--zone-start",
            "0.4",
            "--zone-end",
            "2.0",
        ])
        .expect("record args should parse");

        assert_eq!(cli.format, Some(OutputFormat::Json));
        let Command::Record(args) = cli.command else {
            panic!("expected record");
        };
        assert_eq!(args.link.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(args.profile, Profile::Respiration2);
        assert_eq!(args.output, RecordOutput::Respiration);
        assert_eq!(args.count, Some(10));
        assert_eq!(args.zone_start, Some(0.4));
        assert_eq!(args.zone_end, Some(2.0));
    }

    #[test]
    fn zone_bounds_come_in_pairs() {
        let err = Cli::try_parse_from(["xethru", "record", "--zone-start", "0.4"])
            .expect_err("a lone zone bound should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_factory_reset() {
        let cli = Cli::try_parse_from(["xethru", "reset", "--factory", "--port", "COM3"])
            .expect("reset args should parse");
        assert!(matches!(cli.command, Command::Reset(args) if args.factory));
    }

    #[test]
    fn rejects_unknown_output() {
        let err = Cli::try_parse_from(["xethru", "record", "-o", "heartbeat"])
            .expect_err("unknown output should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
