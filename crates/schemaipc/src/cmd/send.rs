use schemaipc_peer::Client;

use crate::cmd::SendArgs;
use crate::demo::{demo_schema, EchoMessage};
use crate::exit::{peer_error, CliResult, SUCCESS};
use crate::output::{print_echo, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let mut client = Client::connect(&args.network, &args.address, demo_schema())
        .map_err(|err| peer_error("connect failed", err))?;

    client
        .send(
            "Echo",
            &EchoMessage {
                payload: args.data.into_bytes(),
            },
        )
        .map_err(|err| peer_error("send failed", err))?;

    let mut reply = EchoMessage::default();
    client
        .recv_into(&mut reply)
        .map_err(|err| peer_error("receive failed", err))?;

    print_echo(&reply.payload, format);
    Ok(SUCCESS)
}
