use fliclink_protocol::{ButtonInfo, Event};

use crate::cmd::{open, parse_addr, parse_duration, wait_for, AddrArgs, ConnectArgs};
use crate::exit::{session_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_record, OutputFormat};

pub fn run(args: AddrArgs, conn: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let bd_addr = parse_addr(&args.address)?;
    let timeout = parse_duration(&conn.timeout)?;
    let mut client = open(conn, false)?;

    client
        .get_button_info(bd_addr)
        .map_err(|err| session_error("send failed", err))?;
    let info = wait_for(&mut client, timeout, "button info", |ev| match &ev.event {
        Event::GetButtonInfoResponse(info) if info.bd_addr == bd_addr => Some(info.clone()),
        _ => None,
    })?;

    print_record(&info, &rows(&info), format);

    // The daemon answers with an empty uuid for buttons it has never verified.
    if info.uuid.is_empty() {
        return Ok(FAILURE);
    }
    Ok(SUCCESS)
}

fn rows(info: &ButtonInfo) -> Vec<(&'static str, String)> {
    if info.uuid.is_empty() {
        return vec![
            ("Address", info.bd_addr.to_string()),
            ("Status", "not verified".to_string()),
        ];
    }
    vec![
        ("Address", info.bd_addr.to_string()),
        ("UUID", info.uuid_hex()),
        ("Name", info.name.clone()),
        ("Color", format!("{:#08x}", info.color)),
        ("Serial", info.serial_number.clone()),
        ("Flic version", info.flic_version.to_string()),
        ("Firmware", info.firmware_version.to_string()),
    ]
}
