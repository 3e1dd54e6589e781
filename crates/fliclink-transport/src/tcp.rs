use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::FlicStream;

/// Port the daemon listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 5551;

/// TCP transport to a Flic daemon.
///
/// Resolution and connect are the only blocking steps here; once a
/// [`FlicStream`] is returned the caller owns all further I/O.
pub struct TcpTransport;

impl TcpTransport {
    /// Resolve `host` and connect to the first address that accepts (blocking).
    pub fn connect(host: &str, port: u16) -> Result<FlicStream> {
        Self::connect_with_timeout(host, port, None)
    }

    /// Resolve `host` and connect, bounding each attempt by `timeout`.
    pub fn connect_with_timeout(
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<FlicStream> {
        let addrs = resolve(host, port)?;

        let mut last_err = None;
        for addr in addrs {
            let attempt = match timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    info!(%addr, "connected to flic daemon");
                    let stream = FlicStream::from_tcp(stream);
                    stream.set_nodelay(true)?;
                    return Ok(stream);
                }
                Err(source) => {
                    debug!(%addr, error = %source, "connect attempt failed");
                    last_err = Some(TransportError::Connect { addr, source });
                }
            }
        }

        Err(last_err.unwrap_or_else(|| TransportError::NoAddress {
            host: host.to_string(),
        }))
    }
}

fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            host: host.to_string(),
            source,
        })?
        .collect();

    if addrs.is_empty() {
        return Err(TransportError::NoAddress {
            host: host.to_string(),
        });
    }
    debug!(host, port, count = addrs.len(), "resolved daemon address");
    Ok(addrs)
}
