mod cmd;
mod demo;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "schemaipc", version, about = "Schema-driven binary IPC CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
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
    use super::*;

    #[test]
    fn parses_serve_subcommand() {
        let cli = Cli::try_parse_from([
            "schemaipc",
            "serve",
            "127.0.0.1:6000",
            "--max-message-size",
            "1024",
            "--overflow-policy",
            "terminate",
        ])
        .expect("serve args should parse");

        assert!(matches!(cli.command, Command::Serve(_)));
    }

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "schemaipc",
            "send",
            "127.0.0.1:6000",
            "--data",
            "hello",
            "--network",
            "tcp",
        ])
        .expect("send args should parse");

        let Command::Send(args) = cli.command else {
            panic!("expected send command");
        };
        assert_eq!(args.data, "hello");
        assert_eq!(args.network, "tcp");
    }

    #[test]
    fn parses_ping_with_count() {
        let cli = Cli::try_parse_from(["schemaipc", "ping", "127.0.0.1:6000", "-c", "5"])
            .expect("ping args should parse");

        let Command::Ping(args) = cli.command else {
            panic!("expected ping command");
        };
        assert_eq!(args.count, 5);
    }

    #[test]
    fn rejects_unknown_overflow_policy() {
        let err = Cli::try_parse_from([
            "schemaipc",
            "serve",
            "127.0.0.1:6000",
            "--overflow-policy",
            "panic",
        ])
        .expect_err("unknown policy should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn parses_info_with_format() {
        let cli = Cli::try_parse_from([
            "schemaipc",
            "info",
            "127.0.0.1:6000",
            "--format",
            "json",
        ])
        .expect("info args should parse");

        assert!(matches!(cli.command, Command::Info(_)));
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
    }
}
