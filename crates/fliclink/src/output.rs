use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use fliclink_protocol::Event;
use fliclink_session::{EventContext, SessionEvent, WizardProgress};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EventOutput<'a> {
    #[serde(flatten)]
    event: &'a SessionEvent,
    received_at: u64,
}

/// Print one event as it arrives.
pub fn print_event(ev: &SessionEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&EventOutput {
            event: ev,
            received_at: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["EVENT", "TARGET", "DETAILS"])
                .add_row(vec![
                    ev.event.name().to_string(),
                    context_label(&ev.context),
                    event_details(&ev.event),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} [{}] {}",
                ev.event.name(),
                context_label(&ev.context),
                event_details(&ev.event)
            );
        }
    }
}

/// Print a one-shot result: JSON for `json`, a two-column table otherwise.
pub fn print_record<T: Serialize>(value: &T, rows: &[(&str, String)], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (key, value) in rows {
                table.add_row(vec![key.to_string(), value.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
            for (key, value) in rows {
                println!("  {key:<width$}  {value}");
            }
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn context_label(ctx: &EventContext) -> String {
    match ctx {
        EventContext::Unscoped => "-".to_string(),
        EventContext::Connection { conn_id, bd_addr } => format!("conn {conn_id} {bd_addr}"),
        EventContext::Scanner { scan_id } => format!("scanner {scan_id}"),
        EventContext::Listener {
            listener_id,
            bd_addr,
        } => format!("battery {listener_id} {bd_addr}"),
        EventContext::Wizard {
            scan_wizard_id,
            progress,
        } => format!("wizard {scan_wizard_id} ({})", progress_label(progress)),
        EventContext::UnknownId { class, id } => format!("untracked {class} {id}"),
    }
}

fn progress_label(progress: &WizardProgress) -> String {
    match progress {
        WizardProgress::Started => "started".to_string(),
        WizardProgress::FoundPrivateButton => "found private button".to_string(),
        WizardProgress::FoundPublicButton { bd_addr, name } => format!("found {name} {bd_addr}"),
        WizardProgress::ButtonConnected => "button connected".to_string(),
    }
}

/// Short human summary of an event's fields.
pub fn event_details(event: &Event) -> String {
    match event {
        Event::AdvertisementPacket(adv) => format!(
            "{} name={:?} rssi={} private={} verified={}",
            adv.bd_addr, adv.name, adv.rssi, adv.is_private, adv.already_verified
        ),
        Event::CreateConnectionChannelResponse {
            error,
            connection_status,
            ..
        } => format!("{error}, {connection_status}"),
        Event::ConnectionStatusChanged {
            connection_status,
            disconnect_reason,
            ..
        } => format!("{connection_status} (reason: {disconnect_reason})"),
        Event::ConnectionChannelRemoved { removed_reason, .. } => removed_reason.to_string(),
        Event::ButtonUpOrDown(b)
        | Event::ButtonClickOrHold(b)
        | Event::ButtonSingleOrDoubleClick(b)
        | Event::ButtonSingleOrDoubleClickOrHold(b) => {
            if b.was_queued {
                format!("{} (queued {}s)", b.click_type, b.time_diff)
            } else {
                b.click_type.to_string()
            }
        }
        Event::NewVerifiedButton { bd_addr } => bd_addr.to_string(),
        Event::GetInfoResponse(info) => format!(
            "controller {} {}, {} verified",
            info.bluetooth_controller_state,
            info.my_bd_addr,
            info.verified_buttons.len()
        ),
        Event::NoSpaceForNewConnection {
            max_concurrently_connected_buttons,
        }
        | Event::GotSpaceForNewConnection {
            max_concurrently_connected_buttons,
        } => format!("max {max_concurrently_connected_buttons}"),
        Event::BluetoothControllerStateChange { state } => state.to_string(),
        Event::PingResponse { ping_id } => format!("ping {ping_id}"),
        Event::GetButtonInfoResponse(info) => format!(
            "{} name={:?} serial={:?} fw={}",
            info.bd_addr, info.name, info.serial_number, info.firmware_version
        ),
        Event::ScanWizardFoundPrivateButton { .. } => {
            "hold the button for 7 seconds to make it public".to_string()
        }
        Event::ScanWizardFoundPublicButton { bd_addr, name, .. } => format!("{name} {bd_addr}"),
        Event::ScanWizardButtonConnected { .. } => "connected, verifying".to_string(),
        Event::ScanWizardCompleted { result, .. } => result.to_string(),
        Event::ButtonDeleted {
            bd_addr,
            deleted_by_this_client,
        } => format!("{bd_addr} (by this client: {deleted_by_this_client})"),
        Event::BatteryStatus(status) => format!(
            "{}% ({}) at {}",
            status.battery_percentage,
            status.status(),
            status.timestamp
        ),
        Event::Unrecognized { opcode, raw } => format!("opcode {opcode}, {} bytes", raw.len()),
    }
}

fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
