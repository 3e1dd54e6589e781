//! Opens a connection channel to every verified button and prints clicks.
//!
//! Run with:
//!   cargo run --example monitor -- [host] [port]

use fliclink::protocol::Event;
use fliclink::session::connect;
use fliclink::transport::DEFAULT_PORT;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "localhost".to_string());
    let port = match args.next() {
        Some(port) => port.parse()?,
        None => DEFAULT_PORT,
    };

    let mut client = connect(&host, port)?;
    eprintln!("Connected to {host}:{port}");

    loop {
        let ev = match client.next_event() {
            Ok(ev) => ev,
            Err(err) if !err.is_fatal() => {
                eprintln!("Skipping record: {err}");
                continue;
            }
            Err(err) if err.is_orderly_shutdown() => {
                eprintln!("Daemon closed the connection");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        match &ev.event {
            Event::GetInfoResponse(info) => {
                for bd_addr in &info.verified_buttons {
                    let conn_id = client.state().next_free_conn_id();
                    client.create_connection_channel(conn_id, *bd_addr)?;
                }
            }
            Event::NewVerifiedButton { bd_addr } => {
                let conn_id = client.state().next_free_conn_id();
                client.create_connection_channel(conn_id, *bd_addr)?;
            }
            Event::ButtonSingleOrDoubleClickOrHold(press) => {
                let addr = ev
                    .context
                    .bd_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "?".to_string());
                println!("{addr} {}", press.click_type);
            }
            Event::ConnectionStatusChanged {
                connection_status, ..
            } => {
                eprintln!("{} {connection_status}", ev.context.bd_addr().unwrap_or_default());
            }
            _ => {}
        }
    }
}
