use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fliclink_protocol::Event;
use tracing::{info, warn};

use crate::cmd::{
    install_ctrlc_handler, open_with, parse_addr, parse_duration, poll_event, ConnectArgs,
    ListenArgs,
};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_event, OutputFormat};

pub fn run(args: ListenArgs, conn: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let addresses = args
        .addresses
        .iter()
        .map(|text| parse_addr(text))
        .collect::<CliResult<Vec<_>>>()?;
    let timeout = parse_duration(&conn.timeout)?;
    let mut client = open_with(
        conn,
        false,
        timeout,
        args.latency.into(),
        args.auto_disconnect_time,
    )?;

    for bd_addr in addresses {
        if client.state().connection_for(bd_addr).is_some() {
            warn!(%bd_addr, "address listed twice, ignoring");
            continue;
        }
        let conn_id = client.state().next_free_conn_id();
        client
            .create_connection_channel(conn_id, bd_addr)
            .map_err(|err| session_error("create connection channel failed", err))?;
        info!(%conn_id, %bd_addr, "connection channel requested");
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut presses = 0usize;
    while running.load(Ordering::SeqCst) {
        let Some(ev) = poll_event(&mut client)? else {
            continue;
        };
        print_event(&ev, format);

        if ev.event.as_button_event().is_some() {
            presses = presses.saturating_add(1);
            if args.count.is_some_and(|count| presses >= count) {
                break;
            }
        }
        if matches!(ev.event, Event::ConnectionChannelRemoved { .. })
            && client.state().connections().is_empty()
        {
            info!("all connection channels removed by the daemon");
            return Ok(SUCCESS);
        }
    }

    let channels: Vec<_> = client.state().connections().iter().map(|(id, _)| id).collect();
    for conn_id in channels {
        client
            .remove_connection_channel(conn_id)
            .map_err(|err| session_error("remove connection channel failed", err))?;
    }
    Ok(SUCCESS)
}
