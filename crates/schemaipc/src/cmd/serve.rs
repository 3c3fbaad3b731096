use schemaipc_peer::{Server, ServerConfig};
use schemaipc_schema::MessageDirection;
use tracing::{debug, info};

use crate::cmd::ServeArgs;
use crate::demo::{demo_schema, EchoMessage};
use crate::exit::{peer_error, CliError, CliResult, INTERNAL, SUCCESS};

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let config = ServerConfig {
        max_message_size: args.max_message_size,
        overflow_policy: args.overflow_policy.into(),
        ..ServerConfig::default()
    };

    let mut server = Server::new(demo_schema(), config);
    server.bind(MessageDirection::Inbound, "Echo", |decoder, conn| {
        let mut message = EchoMessage::default();
        decoder.decode(&mut message)?;
        debug!(peer = %conn.peer(), size = message.payload.len(), "echoing message");
        conn.send("Echo", &message)
    });
    server
        .init()
        .map_err(|err| peer_error("server init failed", err))?;

    install_ctrlc_handler()?;

    server
        .listen_and_serve(&args.network, &args.address)
        .map_err(|err| peer_error("serve failed", err))?;

    Ok(SUCCESS)
}

fn install_ctrlc_handler() -> CliResult<()> {
    ctrlc::set_handler(|| {
        info!("interrupted; shutting down");
        std::process::exit(SUCCESS);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
