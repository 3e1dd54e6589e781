use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fliclink_protocol::Event;

use crate::cmd::{install_ctrlc_handler, open, poll_event, ConnectArgs, ScanArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_event, OutputFormat};

pub fn run(args: ScanArgs, conn: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let mut client = open(conn, false)?;

    let scan_id = client.state().next_free_scan_id();
    client
        .create_scanner(scan_id)
        .map_err(|err| session_error("create scanner failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut seen = 0usize;
    while running.load(Ordering::SeqCst) {
        let Some(ev) = poll_event(&mut client)? else {
            continue;
        };
        if !matches!(ev.event, Event::AdvertisementPacket(_)) {
            continue;
        }
        print_event(&ev, format);
        seen = seen.saturating_add(1);
        if args.count.is_some_and(|count| seen >= count) {
            break;
        }
    }

    client
        .remove_scanner(scan_id)
        .map_err(|err| session_error("remove scanner failed", err))?;
    Ok(SUCCESS)
}
