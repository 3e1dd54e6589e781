use fliclink_frame::{FrameReader, FrameWriter};
use fliclink_transport::{FlicStream, TcpTransport};
use tracing::debug;

use crate::client::FlicClient;
use crate::config::ClientConfig;
use crate::error::Result;

/// A client over a TCP connection to the daemon.
pub type TcpClient = FlicClient<FlicStream, FlicStream>;

/// Connect to a daemon with default configuration.
pub fn connect(host: &str, port: u16) -> Result<TcpClient> {
    connect_with_config(host, port, &ClientConfig::default())
}

/// Connect with explicit configuration.
///
/// When `request_info_on_connect` is set, a `GetInfo` command is sent before
/// the client is returned; its response is the first event the caller reads.
pub fn connect_with_config(host: &str, port: u16, config: &ClientConfig) -> Result<TcpClient> {
    let stream = TcpTransport::connect_with_timeout(host, port, config.connect_timeout)?;
    let reader_stream = stream.try_clone()?;

    let reader = FrameReader::with_config_stream(reader_stream, config.frame.clone())?;
    let writer = FrameWriter::with_config_stream(stream, config.frame.clone())?;
    let mut client = FlicClient::from_parts(reader, writer, config.clone());

    if config.request_info_on_connect {
        debug!("requesting server info");
        client.get_info()?;
    }
    Ok(client)
}
