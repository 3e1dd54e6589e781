use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, Subcommand, ValueEnum};
use fliclink_frame::FrameConfig;
use fliclink_protocol::{BdAddr, LatencyMode};
use fliclink_session::{
    connect_with_config, ClientConfig, SessionEvent, TcpClient,
    DEFAULT_AUTO_DISCONNECT_TIME,
};
use fliclink_transport::DEFAULT_PORT;
use tracing::warn;

use crate::exit::{protocol_error, session_error, CliError, CliResult, INTERNAL, TIMEOUT, USAGE};
use crate::output::OutputFormat;

pub mod battery;
pub mod button_info;
pub mod delete;
pub mod force_disconnect;
pub mod info;
pub mod listen;
pub mod pair;
pub mod ping;
pub mod scan;
pub mod version;

/// How long a blocking read waits before the command loop re-checks
/// deadlines and the Ctrl-C flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print daemon and controller state and the verified buttons.
    Info,
    /// Open connection channels and print button events.
    Listen(ListenArgs),
    /// Run a raw scanner and print advertisements.
    Scan(ScanArgs),
    /// Pair a new button with the scan wizard.
    Pair,
    /// Print stored metadata for a verified button.
    ButtonInfo(AddrArgs),
    /// Delete a verified button from the daemon.
    Delete(AddrArgs),
    /// Disconnect a button from every client.
    ForceDisconnect(AddrArgs),
    /// Print the battery level of a button.
    Battery(BatteryArgs),
    /// Measure round-trip time to the daemon.
    Ping(PingArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, conn: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Info => info::run(conn, format),
        Command::Listen(args) => listen::run(args, conn, format),
        Command::Scan(args) => scan::run(args, conn, format),
        Command::Pair => pair::run(conn, format),
        Command::ButtonInfo(args) => button_info::run(args, conn, format),
        Command::Delete(args) => delete::run(args, conn, format),
        Command::ForceDisconnect(args) => force_disconnect::run(args, conn, format),
        Command::Battery(args) => battery::run(args, conn, format),
        Command::Ping(args) => ping::run(args, conn, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where the daemon lives and how long to wait for it.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Daemon host name or address.
    #[arg(long, env = "FLICLINK_HOST", default_value = "localhost", global = true)]
    pub host: String,
    /// Daemon TCP port.
    #[arg(long, env = "FLICLINK_PORT", default_value_t = DEFAULT_PORT, global = true)]
    pub port: u16,
    /// Connect and reply timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", global = true)]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Button addresses (xx:xx:xx:xx:xx:xx).
    #[arg(required = true)]
    pub addresses: Vec<String>,
    /// Exit after N button events.
    #[arg(long)]
    pub count: Option<usize>,
    /// Latency mode for the connection channels.
    #[arg(long, value_enum, default_value = "normal")]
    pub latency: LatencyArg,
    /// Auto-disconnect time passed to the daemon.
    #[arg(long, default_value_t = DEFAULT_AUTO_DISCONNECT_TIME, allow_negative_numbers = true)]
    pub auto_disconnect_time: i16,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Exit after N advertisements.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct AddrArgs {
    /// Button address (xx:xx:xx:xx:xx:xx).
    pub address: String,
}

#[derive(Args, Debug)]
pub struct BatteryArgs {
    /// Button address (xx:xx:xx:xx:xx:xx).
    pub address: String,
    /// Keep printing updates until interrupted.
    #[arg(long)]
    pub follow: bool,
}

#[derive(Args, Debug)]
pub struct PingArgs {
    /// Ping id echoed by the daemon.
    #[arg(long, default_value_t = 1)]
    pub id: u32,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LatencyArg {
    Normal,
    Low,
    High,
}

impl From<LatencyArg> for LatencyMode {
    fn from(arg: LatencyArg) -> Self {
        match arg {
            LatencyArg::Normal => LatencyMode::Normal,
            LatencyArg::Low => LatencyMode::Low,
            LatencyArg::High => LatencyMode::High,
        }
    }
}

pub(crate) fn parse_addr(input: &str) -> CliResult<BdAddr> {
    input
        .parse()
        .map_err(|err| protocol_error("invalid button address", err))
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

/// Connect with a short read timeout so command loops can poll.
pub(crate) fn open(conn: &ConnectArgs, request_info: bool) -> CliResult<TcpClient> {
    let timeout = parse_duration(&conn.timeout)?;
    open_with(conn, request_info, timeout, LatencyMode::Normal, DEFAULT_AUTO_DISCONNECT_TIME)
}

pub(crate) fn open_with(
    conn: &ConnectArgs,
    request_info: bool,
    timeout: Duration,
    latency_mode: LatencyMode,
    auto_disconnect_time: i16,
) -> CliResult<TcpClient> {
    let config = ClientConfig {
        frame: FrameConfig {
            read_timeout: Some(POLL_INTERVAL),
            write_timeout: Some(timeout),
            ..FrameConfig::default()
        },
        connect_timeout: Some(timeout),
        latency_mode,
        auto_disconnect_time,
        request_info_on_connect: request_info,
    };
    connect_with_config(&conn.host, conn.port, &config)
        .map_err(|err| session_error(&format!("connect to {}:{} failed", conn.host, conn.port), err))
}

/// Read one event, or `None` when the poll interval passed or a record had
/// to be skipped.
pub(crate) fn poll_event(client: &mut TcpClient) -> CliResult<Option<SessionEvent>> {
    match client.next_event() {
        Ok(ev) => Ok(Some(ev)),
        Err(err) if err.is_timeout() => Ok(None),
        Err(err) if !err.is_fatal() => {
            warn!(error = %err, "skipping record");
            Ok(None)
        }
        Err(err) => Err(session_error("receive failed", err)),
    }
}

/// Read events until `pick` accepts one or `timeout` passes.
pub(crate) fn wait_for<T>(
    client: &mut TcpClient,
    timeout: Duration,
    what: &str,
    mut pick: impl FnMut(&SessionEvent) -> Option<T>,
) -> CliResult<T> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(ev) = poll_event(client)? {
            if let Some(found) = pick(&ev) {
                return Ok(found);
            }
        }
        if Instant::now() >= deadline {
            return Err(CliError::new(
                TIMEOUT,
                format!("no {what} within {timeout:?}"),
            ));
        }
    }
}

pub(crate) fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn parse_duration_millis() {
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
    }

    #[test]
    fn parse_duration_invalid() {
        assert_eq!(parse_duration("0s").unwrap_err().code, USAGE);
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn parse_addr_reports_usage() {
        assert!(parse_addr("80:e4:da:71:2b:0c").is_ok());
        assert_eq!(parse_addr("80:e4:da").unwrap_err().code, USAGE);
    }
}
