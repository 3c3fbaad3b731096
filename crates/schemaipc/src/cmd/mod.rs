use clap::{Args, Subcommand, ValueEnum};
use schemaipc_peer::OverflowPolicy;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod info;
pub mod ping;
pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a demo echo server.
    Serve(ServeArgs),
    /// Send one Echo message and print the reply.
    Send(SendArgs),
    /// Measure round-trip time with the internal Ping message.
    Ping(PingArgs),
    /// Connect, handshake, and print the advertised schema.
    Info(InfoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Send(args) => send::run(args, format),
        Command::Ping(args) => ping::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OverflowPolicyArg {
    Discard,
    Terminate,
}

impl From<OverflowPolicyArg> for OverflowPolicy {
    fn from(arg: OverflowPolicyArg) -> Self {
        match arg {
            OverflowPolicyArg::Discard => OverflowPolicy::Discard,
            OverflowPolicyArg::Terminate => OverflowPolicy::Terminate,
        }
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind (host:port for tcp, socket path for unix).
    pub address: String,
    /// Transport network.
    #[arg(long, default_value = "tcp")]
    pub network: String,
    /// Maximum inbound message body size in bytes.
    #[arg(long, default_value_t = schemaipc_peer::DEFAULT_MAX_MESSAGE_SIZE)]
    pub max_message_size: u32,
    /// What to do with messages over the size limit.
    #[arg(long, value_enum, default_value = "discard")]
    pub overflow_policy: OverflowPolicyArg,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Address to connect to.
    pub address: String,
    /// Transport network.
    #[arg(long, default_value = "tcp")]
    pub network: String,
    /// Payload to send.
    #[arg(long)]
    pub data: String,
}

#[derive(Args, Debug)]
pub struct PingArgs {
    /// Address to connect to.
    pub address: String,
    /// Transport network.
    #[arg(long, default_value = "tcp")]
    pub network: String,
    /// Number of pings to send.
    #[arg(long, short = 'c', default_value_t = 1)]
    pub count: u32,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Address to connect to.
    pub address: String,
    /// Transport network.
    #[arg(long, default_value = "tcp")]
    pub network: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
