//! Prints every record the daemon sends, using the tokio codec.
//!
//! Run with:
//!   cargo run --example async-monitor --features async -- [host] [port]

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use fliclink::frame::FlicCodec;
use fliclink::protocol::{Command, Event, ScanId};
use fliclink::transport::DEFAULT_PORT;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "localhost".to_string());
    let port = match args.next() {
        Some(port) => port.parse()?,
        None => DEFAULT_PORT,
    };

    let stream = TcpStream::connect((host.as_str(), port)).await?;
    let mut framed = Framed::new(stream, FlicCodec::new());

    framed.send(Command::GetInfo.to_bytes()).await?;
    framed
        .send(Command::CreateScanner { scan_id: ScanId(0) }.to_bytes())
        .await?;

    while let Some(frame) = framed.next().await {
        let frame = frame?;
        match Event::decode(&frame.record) {
            Ok(event) => println!("{event:?}"),
            Err(err) => eprintln!("Skipping record: {err}"),
        }
    }
    Ok(())
}
