//! NUT daemon session: connect, handshake, discovery, and variable queries.
//!
//! One session owns one TCP connection for the whole process lifetime:
//! handshake runs once after connect, discovery runs once if no UPS was
//! pre-selected, and the variable queries run on every poll tick. The
//! connection is never shared or pooled, so no locking is needed.
//!
//! Every blocking socket wait is wrapped in an explicit deadline; a stalled
//! daemon surfaces as [`Error::Timeout`] instead of a hang. No operation
//! retries internally; retry policy belongs to the poll loop.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;
use tracing::{debug, info};

use nutmon_types::{Sample, UpsEntry, VariableSet, proto};

use crate::config::NutConfig;
use crate::error::{Error, Result};
use crate::reader::LineReader;
use crate::traits::StatusSource;

/// An authenticated session with a NUT daemon.
///
/// # Note on Clone
///
/// This struct intentionally does not implement `Clone`: a session is an
/// exclusive owner of its TCP connection and of the read buffer's position
/// within the reply stream. Sharing one would make the framing ambiguous.
pub struct UpsSession {
    reader: LineReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    config: NutConfig,
    endpoint: String,
    /// UPS identifier once selected; immutable for the session lifetime.
    selected: Option<String>,
}

impl std::fmt::Debug for UpsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpsSession")
            .field("endpoint", &self.endpoint)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

impl UpsSession {
    /// Open a TCP connection to the daemon described by `config`.
    ///
    /// Applies the configured connect deadline. The handshake is a separate
    /// step; call [`authenticate`](Self::authenticate) next.
    pub async fn connect(config: NutConfig) -> Result<Self> {
        config.validate()?;
        let endpoint = config.endpoint();
        debug!(%endpoint, "connecting to NUT daemon");
        let stream = timeout(config.connect_timeout, TcpStream::connect(&endpoint))
            .await
            .map_err(|_| Error::timeout("connect", config.connect_timeout))??;
        info!(%endpoint, "connected to NUT daemon");
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: LineReader::new(read_half),
            writer: write_half,
            config,
            endpoint,
            selected: None,
        })
    }

    /// The `host:port` endpoint this session is connected to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The selected UPS identifier, if selection has happened.
    #[must_use]
    pub fn selected_ups(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    async fn send_command(&mut self, command: &str) -> Result<()> {
        self.writer.write_all(command.as_bytes()).await?;
        Ok(())
    }

    /// Read one reply line under the configured deadline.
    ///
    /// An empty degraded result from a closed connection becomes
    /// [`Error::ConnectionClosed`] tagged with the operation.
    async fn read_reply_line(&mut self, operation: &'static str) -> Result<String> {
        read_line_deadline(&mut self.reader, operation, self.config.read_timeout).await
    }

    /// Perform the optional username/password handshake.
    ///
    /// Credentials that are not configured are simply not sent; with no
    /// credentials configured this trivially succeeds. Any reply other
    /// than the literal `OK` is a rejection carrying the raw server text.
    pub async fn authenticate(&mut self) -> Result<()> {
        if let Some(user) = self.config.username.clone() {
            self.send_command(&proto::username_command(&user)).await?;
            let reply = self.read_reply_line("USERNAME").await?;
            if reply != proto::OK_REPLY {
                return Err(Error::username_rejected(reply));
            }
            debug!(%user, "username accepted");
        }
        if let Some(password) = self.config.password.clone() {
            self.send_command(&proto::password_command(&password)).await?;
            let reply = self.read_reply_line("PASSWORD").await?;
            if reply != proto::OK_REPLY {
                return Err(Error::password_rejected(reply));
            }
            debug!("password accepted");
        }
        Ok(())
    }

    /// Enumerate the UPSes the daemon serves.
    pub async fn list_ups(&mut self) -> Result<Vec<UpsEntry>> {
        self.send_command(proto::list_ups_command()).await?;
        read_ups_block(&mut self.reader, self.config.read_timeout).await
    }

    /// Select a UPS for this session.
    ///
    /// A pre-selected name from the configuration wins; otherwise the
    /// daemon is asked via `LIST UPS` and the first enumerated UPS is
    /// taken. The selection is made once and then reused.
    pub async fn select_ups(&mut self) -> Result<String> {
        if let Some(name) = &self.selected {
            return Ok(name.clone());
        }
        let name = match self.config.ups_name.clone() {
            Some(name) => name,
            None => {
                let entry = self.discover().await?;
                info!(ups = %entry.name, description = %entry.description, "auto-selected UPS");
                entry.name
            }
        };
        self.selected = Some(name.clone());
        Ok(name)
    }

    /// Discover the first UPS the daemon enumerates.
    ///
    /// First-found policy: deterministic only insofar as the daemon's
    /// enumeration order is.
    pub async fn discover(&mut self) -> Result<UpsEntry> {
        let mut entries = self.list_ups().await?;
        if entries.is_empty() {
            return Err(Error::NoUpsFound);
        }
        Ok(entries.swap_remove(0))
    }

    /// Query a single variable, returning its unquoted value.
    pub async fn get_var(&mut self, ups: &str, name: &str) -> Result<String> {
        self.send_command(&proto::get_var_command(ups, name)).await?;
        let line = self.read_reply_line("GET VAR").await?;
        proto::parse_get_var_reply(&line, ups, name).map_err(|e| Error::protocol("GET VAR", e))
    }

    /// Fetch a full variable snapshot for one UPS.
    ///
    /// The returned set replaces any previous snapshot wholesale.
    pub async fn list_vars(&mut self, ups: &str) -> Result<VariableSet> {
        self.send_command(&proto::list_var_command(ups)).await?;
        read_var_block(&mut self.reader, ups, self.config.read_timeout).await
    }
}

/// Read one line under a deadline.
///
/// A line returned after EOF is a degraded result, whether it is empty or a
/// partial line cut off mid-stream, so both report [`Error::ConnectionClosed`]
/// rather than being handed to the parser.
async fn read_line_deadline<R: AsyncRead + Unpin>(
    reader: &mut LineReader<R>,
    operation: &'static str,
    deadline: Duration,
) -> Result<String> {
    let line = timeout(deadline, reader.read_line())
        .await
        .map_err(|_| Error::timeout(operation, deadline))??;
    if reader.is_closed() {
        return Err(Error::connection_closed(operation));
    }
    Ok(String::from_utf8_lossy(&line).trim().to_string())
}

/// Consume a `LIST UPS` reply block from the reader.
///
/// Locates the BEGIN marker, then reads lines until the terminator. Lines
/// that are not `UPS …` entries are ignored, not fatal. The whole block is
/// always drained so the stream stays aligned for the next operation.
pub(crate) async fn read_ups_block<R: AsyncRead + Unpin>(
    reader: &mut LineReader<R>,
    deadline: Duration,
) -> Result<Vec<UpsEntry>> {
    const OPERATION: &str = "LIST UPS";
    timeout(deadline, reader.consume_through(proto::BEGIN_LIST_UPS))
        .await
        .map_err(|_| Error::timeout(OPERATION, deadline))?
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::connection_closed(OPERATION),
            _ => Error::Io(e),
        })?;

    let mut entries = Vec::new();
    loop {
        let line = read_line_deadline(reader, OPERATION, deadline).await?;
        if line == proto::END_LIST_UPS {
            return Ok(entries);
        }
        if let Some(entry) = proto::parse_ups_line(&line) {
            entries.push(entry);
        }
    }
}

/// Consume a `LIST VAR` reply block from the reader into a fresh snapshot.
///
/// Duplicate names keep the last occurrence; non-matching lines are
/// skipped. A connection closed mid-block is an error, never a partial
/// snapshot.
pub(crate) async fn read_var_block<R: AsyncRead + Unpin>(
    reader: &mut LineReader<R>,
    ups: &str,
    deadline: Duration,
) -> Result<VariableSet> {
    const OPERATION: &str = "LIST VAR";
    let marker = proto::begin_list_var_marker(ups);
    timeout(deadline, reader.consume_through(&marker))
        .await
        .map_err(|_| Error::timeout(OPERATION, deadline))?
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::connection_closed(OPERATION),
            _ => Error::Io(e),
        })?;

    let terminator = proto::end_list_var(ups);
    let mut vars = VariableSet::new();
    loop {
        let line = read_line_deadline(reader, OPERATION, deadline).await?;
        if line == terminator {
            return Ok(vars);
        }
        if let Some((name, value)) = proto::parse_var_line(&line, ups) {
            vars.insert(name, value);
        }
    }
}

#[async_trait]
impl StatusSource for UpsSession {
    async fn sample(&mut self) -> Result<Sample> {
        let ups = self.select_ups().await?;
        let status = self.get_var(&ups, "ups.status").await?;
        let charge = self.get_var(&ups, "battery.charge").await?;
        Ok(Sample::from_raw(status, charge))
    }

    async fn refresh_vars(&mut self) -> Result<VariableSet> {
        let ups = self.select_ups().await?;
        self.list_vars(&ups).await
    }

    async fn reconnect(&mut self) -> Result<()> {
        let mut fresh = UpsSession::connect(self.config.clone()).await?;
        fresh.authenticate().await?;
        // The UPS identifier is immutable once selected; carry it over.
        fresh.selected = self.selected.clone();
        *self = fresh;
        Ok(())
    }
}
