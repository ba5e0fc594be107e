//! Single-shot JSON-RPC client for the Klipper API socket.
//!
//! Klipper's API server speaks JSON over a unix-domain socket, framing
//! each message with a single `0x03` control byte instead of a newline.
//! Every query here is one-shot: open the socket, send one request, read
//! one framed reply, close. Nothing is shared with the UPS session, and
//! the simple framing never involves the line/block reader.
//!
//! An empty reply payload is a valid "no data" outcome, not an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;
use tracing::debug;

/// Control byte terminating every Klipper API message.
pub const FRAME_TERMINATOR: u8 = 0x03;

/// Default Klipper API socket path on the printer.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/unix_uds1";

/// Default deadline for one request/response exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const RECV_CHUNK: usize = 4096;

/// Error type for Klipper socket operations.
#[derive(Debug, thiserror::Error)]
pub enum KlippyError {
    /// Socket-level failure.
    #[error("Klipper socket error: {0}")]
    Io(#[from] std::io::Error),

    /// The exchange exceeded its deadline.
    #[error("Klipper request timed out after {0:?}")]
    Timeout(Duration),

    /// The reply was not valid JSON.
    #[error("invalid JSON from Klipper: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for Klipper socket operations.
pub type KlippyResult<T> = std::result::Result<T, KlippyError>;

/// One-shot JSON-RPC client for the Klipper API socket.
///
/// # Example
///
/// ```no_run
/// use nutmon_core::klippy::KlippyClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = KlippyClient::default();
/// for id in client.filament_hub_ids().await? {
///     if let Some(status) = client.dryer_status(id).await? {
///         println!("hub {id}: {}", status.status);
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct KlippyClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl Default for KlippyClient {
    fn default() -> Self {
        Self::new(DEFAULT_SOCKET_PATH)
    }
}

impl KlippyClient {
    /// Create a client for the given socket path.
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the exchange deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send one request and read one framed reply.
    ///
    /// Returns `Ok(None)` when the reply payload is empty, which is a
    /// valid "no data" outcome.
    pub async fn request(&self, method: &str, params: Value) -> KlippyResult<Option<Value>> {
        let id: u16 = rand::rng().random_range(0..32768);
        let payload = json!({ "method": method, "params": params, "id": id });
        let mut message = serde_json::to_vec(&payload)?;
        message.push(FRAME_TERMINATOR);

        debug!(socket = %self.socket_path.display(), %method, id, "Klipper request");
        let mut stream = timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .map_err(|_| KlippyError::Timeout(self.timeout))??;
        stream.write_all(&message).await?;
        stream.shutdown().await?;

        let mut data = Vec::new();
        let mut chunk = [0u8; RECV_CHUNK];
        loop {
            let n = timeout(self.timeout, stream.read(&mut chunk))
                .await
                .map_err(|_| KlippyError::Timeout(self.timeout))??;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);
            if chunk[..n].contains(&FRAME_TERMINATOR) {
                break;
            }
        }

        if let Some(pos) = data.iter().position(|&b| b == FRAME_TERMINATOR) {
            data.truncate(pos);
        }
        if data.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&data)?))
    }

    /// Query the ids of the connected filament hubs (ACE Pro units).
    pub async fn filament_hub_ids(&self) -> KlippyResult<Vec<i64>> {
        let response = self.query_filament_hubs().await?;
        Ok(response
            .map(|r| extract_hubs(&r))
            .unwrap_or_default()
            .into_iter()
            .map(|hub| hub.id)
            .collect())
    }

    /// Query the dryer status of one filament hub.
    ///
    /// Returns `Ok(None)` when the hub is unknown or reports no dryer.
    pub async fn dryer_status(&self, hub_id: i64) -> KlippyResult<Option<DryerStatus>> {
        let response = self.query_filament_hubs().await?;
        Ok(response
            .map(|r| extract_hubs(&r))
            .unwrap_or_default()
            .into_iter()
            .find(|hub| hub.id == hub_id)
            .and_then(|hub| hub.dryer_status))
    }

    async fn query_filament_hubs(&self) -> KlippyResult<Option<Value>> {
        self.request("objects/query", json!({ "objects": { "filament_hub": null } }))
            .await
    }
}

/// Dryer status of one filament hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DryerStatus {
    /// Dryer state, e.g. `drying` or `stop`.
    #[serde(default)]
    pub status: String,
    /// Target temperature in degrees Celsius.
    #[serde(default)]
    pub target_temp: f64,
    /// Configured drying duration in minutes.
    #[serde(default)]
    pub duration: i64,
    /// Remaining drying time in seconds.
    #[serde(default)]
    pub remain_time: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct FilamentHub {
    id: i64,
    #[serde(default)]
    dryer_status: Option<DryerStatus>,
}

/// Pull the filament hub list out of an `objects/query` reply.
///
/// Missing or unexpected structure yields an empty list rather than an
/// error; an absent hub object just means none are connected.
fn extract_hubs(response: &Value) -> Vec<FilamentHub> {
    response
        .get("result")
        .and_then(|r| r.get("status"))
        .and_then(|s| s.get("filament_hub"))
        .and_then(|h| h.get("filament_hubs"))
        .and_then(|hubs| serde_json::from_value(hubs.clone()).ok())
        .unwrap_or_default()
}
