use fliclink_protocol::{BdAddr, Event};
use serde::Serialize;

use crate::cmd::{open, parse_addr, parse_duration, wait_for, AddrArgs, ConnectArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct DeleteOutput {
    bd_addr: BdAddr,
    deleted: bool,
    deleted_by_this_client: bool,
}

pub fn run(args: AddrArgs, conn: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let bd_addr = parse_addr(&args.address)?;
    let timeout = parse_duration(&conn.timeout)?;
    let mut client = open(conn, false)?;

    client
        .delete_button(bd_addr)
        .map_err(|err| session_error("send failed", err))?;
    let by_us = wait_for(&mut client, timeout, "delete confirmation", |ev| match ev.event {
        Event::ButtonDeleted {
            bd_addr: deleted,
            deleted_by_this_client,
        } if deleted == bd_addr => Some(deleted_by_this_client),
        _ => None,
    })?;

    let out = DeleteOutput {
        bd_addr,
        deleted: true,
        deleted_by_this_client: by_us,
    };
    print_record(
        &out,
        &[
            ("Address", bd_addr.to_string()),
            ("Deleted", "yes".to_string()),
        ],
        format,
    );
    Ok(SUCCESS)
}
