use fliclink_protocol::BdAddr;
use serde::Serialize;

use crate::cmd::{open, parse_addr, AddrArgs, ConnectArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct ForceDisconnectOutput {
    bd_addr: BdAddr,
    sent: bool,
}

/// Fire and forget: the daemon reports the effect to channel owners, not to
/// the sender.
pub fn run(args: AddrArgs, conn: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let bd_addr = parse_addr(&args.address)?;
    let mut client = open(conn, false)?;

    client
        .force_disconnect(bd_addr)
        .map_err(|err| session_error("send failed", err))?;

    print_record(
        &ForceDisconnectOutput {
            bd_addr,
            sent: true,
        },
        &[("Address", bd_addr.to_string()), ("Sent", "yes".to_string())],
        format,
    );
    Ok(SUCCESS)
}
