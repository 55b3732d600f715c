// Message channel: one TCP connection per peer, each with its own reader and writer task.

use crate::domain::ports::PeerLink;
use crate::domain::{Peer, PeerMessage};
use crate::interface_adapters::net::framing::{Frame, LineBuffer};
use crate::interface_adapters::protocol::{self, ProtocolError};
use crate::interface_adapters::utils::rng::rand_id;
use crate::use_cases::{ConnDirection, SessionEvent, StatusEvent};

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

const READ_CHUNK_BYTES: usize = 4096;
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);
const LOG_THROTTLE: Duration = Duration::from_secs(2);

#[derive(Debug)]
enum NetError {
    Io(std::io::Error),
    SessionClosed,
}

impl From<std::io::Error> for NetError {
    fn from(e: std::io::Error) -> Self {
        NetError::Io(e)
    }
}

#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// Lines queued per connection before broadcasts to it are dropped.
    pub write_queue_capacity: usize,
    /// Upper bound for establishing an outbound connection.
    pub dial_timeout: Duration,
}

/// Result of one broadcast: how many connections accepted the line and how many did not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
}

struct ConnHandle {
    addr: SocketAddr,
    write_tx: mpsc::Sender<Arc<str>>,
    // Dropped with the handle; the reader stops once its connection leaves the set.
    _close_tx: watch::Sender<bool>,
}

struct Inner {
    settings: ChannelSettings,
    // Held only for short, non-async sections; publish is called synchronously.
    connections: RwLock<HashMap<u64, ConnHandle>>,
    dialed: Mutex<HashSet<String>>,
    events_tx: mpsc::Sender<SessionEvent>,
    status_tx: broadcast::Sender<StatusEvent>,
    shutdown_tx: watch::Sender<bool>,
}

/// Full-mesh transport. Cloning shares the same connection set.
#[derive(Clone)]
pub struct MessageChannel {
    inner: Arc<Inner>,
}

impl MessageChannel {
    pub fn new(
        settings: ChannelSettings,
        events_tx: mpsc::Sender<SessionEvent>,
        status_tx: broadcast::Sender<StatusEvent>,
    ) -> Self {
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                settings,
                connections: RwLock::new(HashMap::new()),
                dialed: Mutex::new(HashSet::new()),
                events_tx,
                status_tx,
                shutdown_tx,
            }),
        }
    }

    /// Accepts inbound peers until shutdown.
    pub fn spawn_listener(&self, listener: TcpListener) -> JoinHandle<()> {
        let channel = self.clone();
        let mut shutdown_rx = self.inner.shutdown_tx.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stopped(&mut shutdown_rx) => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, _addr)) => channel.register(stream, ConnDirection::Inbound),
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                        }
                    }
                }
            }
            debug!("listener stopped");
        })
    }

    /// Dials `peer` unless this address was dialed before. Failures are reported, never retried.
    pub fn dial(&self, peer: &Peer) {
        let address = peer.address();
        {
            let mut dialed = self
                .inner
                .dialed
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !dialed.insert(address.clone()) {
                debug!(%address, "already dialed");
                return;
            }
        }

        let channel = self.clone();
        let dial_timeout = self.inner.settings.dial_timeout;
        tokio::spawn(async move {
            let error = match tokio::time::timeout(dial_timeout, TcpStream::connect(&address)).await
            {
                Ok(Ok(stream)) => {
                    channel.register(stream, ConnDirection::Outbound);
                    return;
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("timed out after {} ms", dial_timeout.as_millis()),
            };
            warn!(%address, %error, "dial failed");
            channel.status(StatusEvent::DialFailed { address, error });
        });
    }

    /// Queues `line` on every open connection without waiting on any of them.
    pub fn broadcast(&self, line: &str) -> BroadcastReport {
        let payload: Arc<str> = Arc::from(line);
        let mut report = BroadcastReport::default();
        let mut closed = Vec::new();

        {
            let connections = self
                .inner
                .connections
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            for (&conn_id, conn) in connections.iter() {
                match conn.write_tx.try_send(payload.clone()) {
                    Ok(()) => report.delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(conn_id, addr = %conn.addr, "write queue full; dropping message");
                        report.dropped += 1;
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        report.dropped += 1;
                        closed.push(conn_id);
                    }
                }
            }
        }

        for conn_id in closed {
            self.remove(conn_id);
        }
        report
    }

    pub fn connection_count(&self) -> usize {
        self.inner
            .connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Stops the listener and every connection task. Queued lines are flushed best-effort.
    pub fn shutdown(&self) {
        let _ = self.inner.shutdown_tx.send(true);
        let drained: Vec<(u64, ConnHandle)> = self
            .inner
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        for (conn_id, conn) in drained {
            debug!(conn_id, addr = %conn.addr, "closing connection");
        }
    }

    fn register(&self, stream: TcpStream, direction: ConnDirection) {
        if *self.inner.shutdown_tx.borrow() {
            return;
        }

        let addr = match stream.peer_addr() {
            Ok(addr) => addr,
            Err(e) => {
                warn!(error = %e, "connection without peer address; dropping");
                return;
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!(%addr, error = %e, "failed to set TCP_NODELAY");
        }

        let conn_id = rand_id();
        let (read_half, write_half) = stream.into_split();
        let (write_tx, write_rx) = mpsc::channel(self.inner.settings.write_queue_capacity);
        let (close_tx, close_rx) = watch::channel(false);
        self.inner
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                conn_id,
                ConnHandle {
                    addr,
                    write_tx,
                    _close_tx: close_tx,
                },
            );

        let span = info_span!("conn", conn_id, %addr);
        span.in_scope(|| info!(?direction, "peer connected"));
        self.status(StatusEvent::Connected {
            conn_id,
            addr,
            direction,
        });

        let channel = self.clone();
        tokio::spawn(
            async move {
                match write_loop(write_half, write_rx).await {
                    Ok(stats) => debug!(msgs_out = stats.msgs, bytes_out = stats.bytes, "writer done"),
                    Err(e) => {
                        warn!(error = %e, "write failed");
                        channel.remove(conn_id);
                    }
                }
            }
            .instrument(span.clone()),
        );

        let channel = self.clone();
        let shutdown_rx = self.inner.shutdown_tx.subscribe();
        tokio::spawn(
            async move {
                match read_loop(
                    conn_id,
                    read_half,
                    channel.inner.events_tx.clone(),
                    shutdown_rx,
                    close_rx,
                )
                .await
                {
                    Ok(stats) => debug!(
                        msgs_in = stats.msgs,
                        bytes_in = stats.bytes,
                        invalid = stats.invalid,
                        "reader done"
                    ),
                    Err(NetError::Io(e)) => debug!(error = %e, "read failed"),
                    Err(NetError::SessionClosed) => debug!("session closed; reader exiting"),
                }
                channel.remove(conn_id);
            }
            .instrument(span),
        );
    }

    // Removes a connection once; only the first caller reports the disconnect.
    fn remove(&self, conn_id: u64) {
        let removed = self
            .inner
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&conn_id);
        if let Some(conn) = removed {
            info!(conn_id, addr = %conn.addr, "peer disconnected");
            self.status(StatusEvent::Disconnected {
                conn_id,
                addr: conn.addr,
            });
        }
    }

    fn status(&self, event: StatusEvent) {
        let _ = self.inner.status_tx.send(event);
    }
}

impl PeerLink for MessageChannel {
    fn publish(&self, message: PeerMessage) {
        let line = match protocol::encode_line(&message) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "dropping unencodable message");
                return;
            }
        };
        let report = self.broadcast(&line);
        debug!(
            delivered = report.delivered,
            dropped = report.dropped,
            "message broadcast"
        );
    }

    fn connect(&self, peer: &Peer) {
        self.dial(peer);
    }
}

async fn stopped(shutdown_rx: &mut watch::Receiver<bool>) {
    // A dropped sender also counts as shutdown.
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

#[derive(Debug, Default)]
struct ConnStats {
    msgs: u64,
    bytes: u64,
    invalid: u64,
}

async fn read_loop(
    conn_id: u64,
    mut reader: OwnedReadHalf,
    events_tx: mpsc::Sender<SessionEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
    mut close_rx: watch::Receiver<bool>,
) -> Result<ConnStats, NetError> {
    let mut buffer = LineBuffer::new();
    let mut chunk = [0u8; READ_CHUNK_BYTES];
    let mut stats = ConnStats::default();
    let mut last_invalid_log = Instant::now() - LOG_THROTTLE;

    loop {
        let read = tokio::select! {
            biased;
            _ = stopped(&mut shutdown_rx) => return Ok(stats),
            _ = stopped(&mut close_rx) => return Ok(stats),
            read = reader.read(&mut chunk) => read?,
        };
        if read == 0 {
            return Ok(stats);
        }
        stats.bytes += read as u64;

        for frame in buffer.push(&chunk[..read]) {
            let line = match frame {
                Frame::Line(line) => line,
                Frame::Oversized => {
                    stats.invalid += 1;
                    if should_log(&mut last_invalid_log) {
                        warn!("line too long; discarding");
                    }
                    continue;
                }
            };

            match protocol::decode_line(&line) {
                Ok(message) => {
                    stats.msgs += 1;
                    events_tx
                        .send(SessionEvent::MessageReceived { conn_id, message })
                        .await
                        .map_err(|_| NetError::SessionClosed)?;
                }
                Err(ProtocolError::Malformed(e)) | Err(ProtocolError::Encode(e)) => {
                    // Bad lines are dropped; the connection stays open.
                    stats.invalid += 1;
                    if should_log(&mut last_invalid_log) {
                        warn!(bytes = line.len(), error = %e, "failed to parse peer message");
                    }
                }
            }
        }
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut write_rx: mpsc::Receiver<Arc<str>>,
) -> Result<ConnStats, std::io::Error> {
    let mut stats = ConnStats::default();
    while let Some(line) = write_rx.recv().await {
        writer.write_all(line.as_bytes()).await?;
        stats.msgs += 1;
        stats.bytes += line.len() as u64;
    }
    // Queue closed: the connection was removed or the channel shut down.
    let _ = writer.shutdown().await;
    Ok(stats)
}
