use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use schemaipc_peer::Client;
use schemaipc_schema::Schema;

use crate::cmd::PingArgs;
use crate::exit::{peer_error, CliResult, SUCCESS};
use crate::output::{print_ping, OutputFormat};

pub fn run(args: PingArgs, format: OutputFormat) -> CliResult<i32> {
    let mut client = Client::connect(&args.network, &args.address, Schema::default())
        .map_err(|err| peer_error("connect failed", err))?;

    for seq in 0..args.count {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as i64)
            .unwrap_or(0);

        let started = Instant::now();
        let echoed = client
            .ping(timestamp)
            .map_err(|err| peer_error("ping failed", err))?;
        let rtt_us = started.elapsed().as_micros();

        print_ping(seq, echoed, rtt_us, format);

        if seq + 1 < args.count {
            std::thread::sleep(Duration::from_millis(500));
        }
    }

    Ok(SUCCESS)
}
