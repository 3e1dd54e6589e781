use fliclink_protocol::{Event, ServerInfo};

use crate::cmd::{open, parse_duration, wait_for, ConnectArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

pub fn run(conn: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&conn.timeout)?;
    let mut client = open(conn, true)?;

    let info = wait_for(&mut client, timeout, "server info", |ev| match &ev.event {
        Event::GetInfoResponse(info) => Some(info.clone()),
        _ => None,
    })?;

    print_record(&info, &rows(&info), format);
    Ok(SUCCESS)
}

fn rows(info: &ServerInfo) -> Vec<(&'static str, String)> {
    let verified = if info.verified_buttons.is_empty() {
        "none".to_string()
    } else {
        info.verified_buttons
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    };

    vec![
        ("Controller", info.bluetooth_controller_state.to_string()),
        (
            "Address",
            format!("{} ({})", info.my_bd_addr, info.my_bd_addr_type),
        ),
        (
            "Pending",
            format!(
                "{} of {}",
                info.current_pending_connections, info.max_pending_connections
            ),
        ),
        (
            "Max connected",
            if info.max_concurrently_connected_buttons < 0 {
                "unknown".to_string()
            } else {
                info.max_concurrently_connected_buttons.to_string()
            },
        ),
        (
            "Space",
            if info.currently_no_space_for_new_connection {
                "full".to_string()
            } else {
                "available".to_string()
            },
        ),
        ("Verified buttons", verified),
    ]
}
