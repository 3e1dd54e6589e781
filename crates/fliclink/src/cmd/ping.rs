use std::time::Instant;

use fliclink_protocol::Event;
use serde::Serialize;

use crate::cmd::{open, parse_duration, wait_for, ConnectArgs, PingArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct PingOutput {
    ping_id: u32,
    latency_ms: f64,
}

pub fn run(args: PingArgs, conn: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&conn.timeout)?;
    let mut client = open(conn, false)?;

    let start = Instant::now();
    client
        .ping(args.id)
        .map_err(|err| session_error("send failed", err))?;
    wait_for(&mut client, timeout, "ping response", |ev| match ev.event {
        Event::PingResponse { ping_id } if ping_id == args.id => Some(()),
        _ => None,
    })?;
    let latency_ms = (start.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0;

    let out = PingOutput {
        ping_id: args.id,
        latency_ms,
    };
    print_record(
        &out,
        &[
            ("Ping id", out.ping_id.to_string()),
            ("Latency", format!("{latency_ms:.2}ms")),
        ],
        format,
    );
    Ok(SUCCESS)
}
