use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fliclink_protocol::{Event, ScanWizardResult};
use tracing::info;

use crate::cmd::{install_ctrlc_handler, open, parse_duration, poll_event, ConnectArgs};
use crate::exit::{session_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT};
use crate::output::{print_event, OutputFormat};

/// Runs the scan wizard until the daemon reports a result. Ctrl-C cancels
/// the wizard and still waits for the daemon's completion event.
pub fn run(conn: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&conn.timeout)?;
    let mut client = open(conn, false)?;

    let wizard_id = client.state().next_free_wizard_id();
    client
        .create_scan_wizard(wizard_id)
        .map_err(|err| session_error("create scan wizard failed", err))?;
    info!(%wizard_id, "scan wizard started, press and hold the button");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut cancel_deadline = None;
    loop {
        if cancel_deadline.is_none() && !running.load(Ordering::SeqCst) {
            client
                .cancel_scan_wizard(wizard_id)
                .map_err(|err| session_error("cancel scan wizard failed", err))?;
            cancel_deadline = Some(std::time::Instant::now() + timeout);
        }
        if cancel_deadline.is_some_and(|deadline| std::time::Instant::now() >= deadline) {
            return Err(CliError::new(TIMEOUT, "daemon did not confirm cancellation"));
        }

        let Some(ev) = poll_event(&mut client)? else {
            continue;
        };
        print_event(&ev, format);

        if let Event::ScanWizardCompleted {
            scan_wizard_id,
            result,
        } = ev.event
        {
            if scan_wizard_id == wizard_id {
                return Ok(if result == ScanWizardResult::Success {
                    SUCCESS
                } else {
                    FAILURE
                });
            }
        }
    }
}
