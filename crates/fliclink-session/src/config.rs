use std::time::Duration;

use fliclink_frame::FrameConfig;
use fliclink_protocol::LatencyMode;

/// Auto-disconnect time sent with new connection channels unless overridden.
pub const DEFAULT_AUTO_DISCONNECT_TIME: i16 = 0x1ff;

/// Client-side settings for a daemon session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Framing limits and stream timeouts.
    pub frame: FrameConfig,
    /// Bound on each TCP connect attempt. `None` uses the OS default.
    pub connect_timeout: Option<Duration>,
    /// Latency mode for connection channels opened via the typed helpers.
    pub latency_mode: LatencyMode,
    /// Auto-disconnect time for connection channels opened via the typed
    /// helpers. Passed to the daemon as-is.
    pub auto_disconnect_time: i16,
    /// Send `GetInfo` right after connecting.
    pub request_info_on_connect: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            connect_timeout: Some(Duration::from_secs(5)),
            latency_mode: LatencyMode::Normal,
            auto_disconnect_time: DEFAULT_AUTO_DISCONNECT_TIME,
            request_info_on_connect: true,
        }
    }
}
