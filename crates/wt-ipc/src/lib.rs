//! Cross-context messaging between the background coordinator and page scripts.

use serde::Deserialize;
use serde::Serialize;
use std::sync::mpsc;
use std::time::Duration;
use tracing::warn;
use wt_core::TrackerError;
use wt_core::TrackerResult;

const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024;
const HARD_MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;
const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(5);
const FRAME_PREFIX_BYTES: usize = 4;

/// Placeholder domain reported when the sender tab URL cannot be parsed.
pub const UNKNOWN_DOMAIN: &str = "Unknown";
/// Sentinel surfaced when the channel itself failed.
pub const ERROR_SENTINEL: &str = "Error";
/// Sentinel surfaced when the background never answered.
pub const NO_RESPONSE_SENTINEL: &str = "No response";

/// Execution contexts that exchange messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextRole {
    Background,
    ContentScript,
    WarningPage,
}

impl ContextRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::ContentScript => "content-script",
            Self::WarningPage => "warning-page",
        }
    }
}

/// Requests accepted by the background coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ExtensionRequest {
    #[serde(rename = "getTabUrl")]
    GetTabUrl,
    #[serde(rename = "proceed")]
    Proceed {
        domain: String,
        #[serde(rename = "originalUrl")]
        original_url: String,
    },
}

/// Reply to `getTabUrl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabUrlResponse {
    pub domain: String,
}

impl TabUrlResponse {
    pub fn unknown() -> Self {
        Self {
            domain: UNKNOWN_DOMAIN.to_owned(),
        }
    }
}

/// What a display-only page learned about its own tab.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TabContext {
    pub url: Option<String>,
    pub domain: Option<String>,
}

impl TabContext {
    pub fn error() -> Self {
        Self::sentinel(ERROR_SENTINEL)
    }

    pub fn no_response() -> Self {
        Self::sentinel(NO_RESPONSE_SENTINEL)
    }

    fn sentinel(value: &str) -> Self {
        Self {
            url: Some(value.to_owned()),
            domain: Some(value.to_owned()),
        }
    }

    pub fn url_label(&self) -> &str {
        non_empty(self.url.as_deref()).unwrap_or("Unknown URL")
    }

    pub fn domain_label(&self) -> &str {
        non_empty(self.domain.as_deref()).unwrap_or("Unknown domain")
    }
}

impl From<TabUrlResponse> for TabContext {
    fn from(response: TabUrlResponse) -> Self {
        Self {
            url: None,
            domain: Some(response.domain),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Defines how contexts communicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub role: ContextRole,
    pub max_message_bytes: usize,
    pub recv_timeout: Duration,
}

impl ChannelConfig {
    pub fn hardened(role: ContextRole) -> TrackerResult<Self> {
        let config = Self {
            role,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    pub fn validate(&self) -> TrackerResult<()> {
        if self.max_message_bytes == 0 {
            return Err(TrackerError::new(
                "ipc.max_message_bytes_invalid",
                "channel max_message_bytes must be greater than zero",
            ));
        }

        if self.max_message_bytes > HARD_MAX_MESSAGE_BYTES {
            return Err(TrackerError::new(
                "ipc.max_message_bytes_too_large",
                "channel max_message_bytes exceeds hard limit (16 MiB)",
            ));
        }

        if self.recv_timeout.is_zero() {
            return Err(TrackerError::new(
                "ipc.recv_timeout_invalid",
                "channel recv_timeout must be greater than zero",
            ));
        }

        Ok(())
    }
}

/// In-memory endpoint that applies framing and message-size checks.
pub struct LocalIpcEndpoint {
    tx: mpsc::Sender<Vec<u8>>,
    rx: mpsc::Receiver<Vec<u8>>,
    config: ChannelConfig,
}

impl LocalIpcEndpoint {
    pub fn send_request(&self, request: &ExtensionRequest) -> TrackerResult<()> {
        self.send(&encode_request(request)?)
    }

    pub fn recv_request(&self) -> TrackerResult<ExtensionRequest> {
        decode_request(&self.recv()?)
    }

    pub fn send_response(&self, response: &TabUrlResponse) -> TrackerResult<()> {
        self.send(&encode_response(response)?)
    }

    pub fn recv_response(&self) -> TrackerResult<TabUrlResponse> {
        decode_response(&self.recv()?)
    }

    pub fn send(&self, payload: &[u8]) -> TrackerResult<()> {
        let frame = encode_frame(payload, self.config.max_message_bytes)?;
        self.tx.send(frame).map_err(|error| {
            TrackerError::new(
                "ipc.send_failed",
                format!(
                    "failed to send message from {} endpoint: {error}",
                    self.config.role.as_str()
                ),
            )
        })
    }

    pub fn recv(&self) -> TrackerResult<Vec<u8>> {
        self.recv_timeout(self.config.recv_timeout)
    }

    pub fn recv_timeout(&self, timeout: Duration) -> TrackerResult<Vec<u8>> {
        let frame = self.rx.recv_timeout(timeout).map_err(|error| match error {
            mpsc::RecvTimeoutError::Timeout => TrackerError::new(
                "ipc.recv_timeout",
                format!(
                    "no message for {} endpoint within {timeout:?}",
                    self.config.role.as_str()
                ),
            ),
            mpsc::RecvTimeoutError::Disconnected => TrackerError::new(
                "ipc.recv_failed",
                format!(
                    "failed to receive message for {} endpoint: {error}",
                    self.config.role.as_str()
                ),
            ),
        })?;
        decode_frame(&frame, self.config.max_message_bytes)
    }
}

/// Creates paired in-memory endpoints.
pub fn local_channel_pair(
    left: ChannelConfig,
    right: ChannelConfig,
) -> TrackerResult<(LocalIpcEndpoint, LocalIpcEndpoint)> {
    left.validate()?;
    right.validate()?;

    let (left_to_right_tx, left_to_right_rx) = mpsc::channel();
    let (right_to_left_tx, right_to_left_rx) = mpsc::channel();

    Ok((
        LocalIpcEndpoint {
            tx: left_to_right_tx,
            rx: right_to_left_rx,
            config: left,
        },
        LocalIpcEndpoint {
            tx: right_to_left_tx,
            rx: left_to_right_rx,
            config: right,
        },
    ))
}

/// Encodes a payload as a length-prefixed frame.
pub fn encode_frame(payload: &[u8], max_message_bytes: usize) -> TrackerResult<Vec<u8>> {
    if payload.len() > max_message_bytes {
        return Err(TrackerError::new(
            "ipc.message_too_large",
            format!(
                "payload exceeds max_message_bytes ({} > {})",
                payload.len(),
                max_message_bytes
            ),
        ));
    }

    let len_u32 = u32::try_from(payload.len()).map_err(|_| {
        TrackerError::new(
            "ipc.message_too_large",
            "payload length does not fit in 32-bit frame prefix",
        )
    })?;

    let mut out = Vec::with_capacity(FRAME_PREFIX_BYTES + payload.len());
    out.extend_from_slice(&len_u32.to_be_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Decodes a length-prefixed frame and validates payload size.
pub fn decode_frame(frame: &[u8], max_message_bytes: usize) -> TrackerResult<Vec<u8>> {
    if frame.len() < FRAME_PREFIX_BYTES {
        return Err(TrackerError::new(
            "ipc.frame_too_short",
            "frame is shorter than the 4-byte length prefix",
        ));
    }

    let mut len_bytes = [0_u8; FRAME_PREFIX_BYTES];
    len_bytes.copy_from_slice(&frame[..FRAME_PREFIX_BYTES]);
    let payload_len = u32::from_be_bytes(len_bytes) as usize;
    if payload_len > max_message_bytes {
        return Err(TrackerError::new(
            "ipc.message_too_large",
            format!(
                "decoded payload exceeds max_message_bytes ({} > {})",
                payload_len, max_message_bytes
            ),
        ));
    }

    let expected = FRAME_PREFIX_BYTES + payload_len;
    if frame.len() != expected {
        return Err(TrackerError::new(
            "ipc.frame_length_mismatch",
            format!(
                "frame length mismatch: expected {expected} bytes, got {}",
                frame.len()
            ),
        ));
    }

    Ok(frame[FRAME_PREFIX_BYTES..].to_vec())
}

pub fn encode_request(request: &ExtensionRequest) -> TrackerResult<Vec<u8>> {
    to_json("request", request)
}

pub fn decode_request(payload: &[u8]) -> TrackerResult<ExtensionRequest> {
    from_json("request", payload)
}

fn encode_response(response: &TabUrlResponse) -> TrackerResult<Vec<u8>> {
    to_json("response", response)
}

fn decode_response(payload: &[u8]) -> TrackerResult<TabUrlResponse> {
    from_json("response", payload)
}

fn to_json<T: Serialize>(kind: &str, value: &T) -> TrackerResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|error| {
        TrackerError::new(
            "ipc.message_encode_failed",
            format!("failed to encode {kind}: {error}"),
        )
    })
}

fn from_json<T: for<'de> Deserialize<'de>>(kind: &str, payload: &[u8]) -> TrackerResult<T> {
    if payload.is_empty() {
        return Err(TrackerError::new(
            "ipc.message_empty",
            format!("{kind} payload is empty"),
        ));
    }

    serde_json::from_slice(payload).map_err(|error| {
        TrackerError::new(
            "ipc.message_decode_failed",
            format!("failed to decode {kind}: {error}"),
        )
    })
}

/// Asks the background coordinator which domain the calling tab shows.
///
/// Never fails: channel problems surface as the `Error` sentinel and a
/// missing reply as `No response`.
pub fn request_tab_context(endpoint: &LocalIpcEndpoint) -> TabContext {
    if let Err(error) = endpoint.send_request(&ExtensionRequest::GetTabUrl) {
        warn!(%error, "error getting tab URL");
        return TabContext::error();
    }

    match endpoint.recv_response() {
        Ok(response) => response.into(),
        Err(error) if error.code == "ipc.recv_timeout" => {
            warn!(%error, "no response from background context");
            TabContext::no_response()
        }
        Err(error) => {
            warn!(%error, "error getting tab URL");
            TabContext::error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ChannelConfig;
    use super::ContextRole;
    use super::ExtensionRequest;
    use super::TabContext;
    use super::TabUrlResponse;
    use super::decode_frame;
    use super::decode_request;
    use super::encode_frame;
    use super::encode_request;
    use super::local_channel_pair;
    use super::request_tab_context;
    use std::thread;
    use std::time::Duration;

    fn pair(timeout: Duration) -> (super::LocalIpcEndpoint, super::LocalIpcEndpoint) {
        let background = ChannelConfig::hardened(ContextRole::Background)
            .unwrap_or_else(|_| unreachable!());
        let content = ChannelConfig::hardened(ContextRole::ContentScript)
            .unwrap_or_else(|_| unreachable!())
            .with_recv_timeout(timeout);
        local_channel_pair(background, content).unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn request_wire_shape_matches_message_contract() {
        let encoded = encode_request(&ExtensionRequest::GetTabUrl)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(encoded, br#"{"action":"getTabUrl"}"#.to_vec());

        let proceed = decode_request(
            br#"{"action":"proceed","domain":"example.xyz","originalUrl":"http://example.xyz/"}"#,
        );
        assert_eq!(
            proceed,
            Ok(ExtensionRequest::Proceed {
                domain: "example.xyz".to_owned(),
                original_url: "http://example.xyz/".to_owned(),
            })
        );
    }

    #[test]
    fn unknown_action_is_rejected() {
        let decoded = decode_request(br#"{"action":"selfDestruct"}"#);
        assert!(decoded.is_err());
        if let Err(error) = decoded {
            assert_eq!(error.code, "ipc.message_decode_failed");
        }
    }

    #[test]
    fn frame_rejects_oversized_payload() {
        assert!(encode_frame(&[0_u8; 65], 64).is_err());

        let frame = encode_frame(b"hello", 64).unwrap_or_else(|_| unreachable!());
        assert_eq!(decode_frame(&frame, 64), Ok(b"hello".to_vec()));
        assert!(decode_frame(&frame[..6], 64).is_err());
    }

    #[test]
    fn zero_timeout_is_invalid() {
        let config = ChannelConfig::hardened(ContextRole::WarningPage)
            .unwrap_or_else(|_| unreachable!())
            .with_recv_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn tab_context_roundtrip_through_channel() {
        let (background, content) = pair(Duration::from_secs(2));

        let responder = thread::spawn(move || {
            assert_eq!(background.recv_request(), Ok(ExtensionRequest::GetTabUrl));
            let reply = TabUrlResponse {
                domain: "example.com".to_owned(),
            };
            assert!(background.send_response(&reply).is_ok());
        });

        let context = request_tab_context(&content);
        assert!(responder.join().is_ok());
        assert_eq!(context.domain_label(), "example.com");
        assert_eq!(context.url_label(), "Unknown URL");
    }

    #[test]
    fn silent_background_yields_no_response() {
        let (_background, content) = pair(Duration::from_millis(20));
        let context = request_tab_context(&content);
        assert_eq!(context, TabContext::no_response());
    }

    #[test]
    fn dropped_background_yields_error() {
        let (background, content) = pair(Duration::from_secs(1));
        drop(background);
        assert_eq!(request_tab_context(&content), TabContext::error());
    }

    #[test]
    fn garbage_reply_yields_error() {
        let (background, content) = pair(Duration::from_secs(2));
        let responder = thread::spawn(move || {
            let _ = background.recv();
            assert!(background.send(b"not json").is_ok());
        });

        assert_eq!(request_tab_context(&content), TabContext::error());
        assert!(responder.join().is_ok());
    }
}
