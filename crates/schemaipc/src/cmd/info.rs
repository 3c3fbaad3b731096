use schemaipc_peer::Client;
use schemaipc_schema::Schema;

use crate::cmd::InfoArgs;
use crate::exit::{peer_error, CliResult, SUCCESS};
use crate::output::{print_info, OutputFormat};

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let client = Client::connect(&args.network, &args.address, Schema::default())
        .map_err(|err| peer_error("connect failed", err))?;

    print_info(client.server_versions(), client.advertised(), format);
    Ok(SUCCESS)
}
