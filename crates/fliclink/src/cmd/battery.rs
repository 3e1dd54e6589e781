use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fliclink_protocol::{BatteryStatusEvent, Event};

use crate::cmd::{
    install_ctrlc_handler, open, parse_addr, parse_duration, poll_event, wait_for, BatteryArgs,
    ConnectArgs,
};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_event, print_record, OutputFormat};

pub fn run(args: BatteryArgs, conn: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let bd_addr = parse_addr(&args.address)?;
    let timeout = parse_duration(&conn.timeout)?;
    let mut client = open(conn, false)?;

    let listener_id = client.state().next_free_listener_id();
    client
        .create_battery_status_listener(listener_id, bd_addr)
        .map_err(|err| session_error("create battery listener failed", err))?;

    if args.follow {
        let running = Arc::new(AtomicBool::new(true));
        install_ctrlc_handler(running.clone())?;
        while running.load(Ordering::SeqCst) {
            if let Some(ev) = poll_event(&mut client)? {
                if matches!(ev.event, Event::BatteryStatus(_)) {
                    print_event(&ev, format);
                }
            }
        }
    } else {
        let status = wait_for(&mut client, timeout, "battery status", |ev| match ev.event {
            Event::BatteryStatus(status) if status.listener_id == listener_id => Some(status),
            _ => None,
        })?;
        print_record(&status, &rows(&status, &args.address), format);
    }

    client
        .remove_battery_status_listener(listener_id)
        .map_err(|err| session_error("remove battery listener failed", err))?;
    Ok(SUCCESS)
}

fn rows(status: &BatteryStatusEvent, address: &str) -> Vec<(&'static str, String)> {
    vec![
        ("Address", address.to_string()),
        ("Battery", format!("{}%", status.battery_percentage)),
        ("Status", status.status().to_string()),
        ("Measured at", status.timestamp.to_string()),
    ]
}
