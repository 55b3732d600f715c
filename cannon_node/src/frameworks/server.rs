// Framework bootstrap for a cannon node: runtime setup and task wiring.

use crate::domain::ports::{Overlay, PeerLink};
use crate::domain::tuning::CannonTuning;
use crate::domain::{Direction, InstanceId, PixelPoint, ProjectileColor, ScreenFrame};
use crate::frameworks::config;
use crate::interface_adapters::discovery::{Discovery, DiscoverySettings};
use crate::interface_adapters::net::{ChannelSettings, MessageChannel};
use crate::interface_adapters::utils::rng::PcgShotRng;
use crate::use_cases::{
    ServiceRecord, Session, SessionEvent, StatusEvent, TrajectorySynchronizer, session_task,
};

use std::net::{Ipv4Addr, SocketAddr};
use std::{fmt, io::Result, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tokio::sync::{Notify, broadcast, mpsc};
use tokio::task::JoinHandle;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Everything a node needs besides its listener and overlay.
#[derive(Debug, Clone)]
pub struct NodeSettings {
    pub frame: ScreenFrame,
    pub direction: Direction,
    pub color: ProjectileColor,
    pub tuning: CannonTuning,
    /// mDNS service type to advertise and browse; `None` disables discovery.
    pub service_type: Option<String>,
    pub dial_timeout: Duration,
    pub tick_interval: Duration,
    pub max_active_shots: usize,
    /// Fixed seed for reproducible launches; seeded from the clock when unset.
    pub rng_seed: Option<u64>,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            frame: ScreenFrame::sized(1920.0, 1080.0),
            direction: Direction::LeftToRight,
            color: ProjectileColor::default(),
            tuning: CannonTuning::default(),
            service_type: Some(config::DEFAULT_SERVICE_TYPE.to_string()),
            dial_timeout: Duration::from_millis(2000),
            tick_interval: config::TICK_INTERVAL,
            max_active_shots: config::MAX_ACTIVE_SHOTS,
            rng_seed: None,
        }
    }
}

impl NodeSettings {
    pub fn from_env() -> std::result::Result<Self, config::ConfigError> {
        Ok(Self {
            frame: config::screen_frame(),
            direction: config::launch_direction(),
            color: config::projectile_color(),
            tuning: config::load_tuning()?,
            service_type: config::discovery_enabled().then(config::service_type),
            dial_timeout: config::dial_timeout(),
            ..Self::default()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeError {
    /// The session task has stopped; the node no longer accepts commands.
    SessionClosed,
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::SessionClosed => f.write_str("session task has stopped"),
        }
    }
}

impl std::error::Error for NodeError {}

/// Host-facing handle to a running node.
pub struct NodeHandle {
    instance_id: InstanceId,
    local_addr: SocketAddr,
    events_tx: mpsc::Sender<SessionEvent>,
    status_tx: broadcast::Sender<StatusEvent>,
    channel: MessageChannel,
    discovery: Option<Discovery>,
    session_shutdown: Arc<Notify>,
    session: JoinHandle<()>,
    listener: JoinHandle<()>,
}

impl NodeHandle {
    pub fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn connection_count(&self) -> usize {
        self.channel.connection_count()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusEvent> {
        self.status_tx.subscribe()
    }

    /// Launches a shot in the configured direction.
    pub async fn launch(&self, origin: PixelPoint) -> std::result::Result<(), NodeError> {
        self.send(SessionEvent::Launch {
            origin,
            direction: None,
        })
        .await
    }

    pub async fn launch_towards(
        &self,
        origin: PixelPoint,
        direction: Direction,
    ) -> std::result::Result<(), NodeError> {
        self.send(SessionEvent::Launch {
            origin,
            direction: Some(direction),
        })
        .await
    }

    pub async fn set_direction(&self, direction: Direction) -> std::result::Result<(), NodeError> {
        self.send(SessionEvent::DirectionChanged(direction)).await
    }

    /// Sends a legacy point effect to every connected peer.
    pub async fn send_point_impact(&self, at: PixelPoint) -> std::result::Result<(), NodeError> {
        self.send(SessionEvent::SendPointImpact(at)).await
    }

    /// Adds a peer without discovery. Goes through the same dedupe as discovered peers.
    pub async fn add_peer(
        &self,
        host: impl Into<String>,
        port: u16,
    ) -> std::result::Result<(), NodeError> {
        let host = host.into();
        self.send(SessionEvent::ServiceResolved(ServiceRecord {
            name: format!("manual {host}:{port}"),
            instance_id: None,
            host,
            port,
        }))
        .await
    }

    /// Stops discovery, closes every connection and waits for the session to finish.
    pub async fn shutdown(self) {
        if let Some(discovery) = self.discovery {
            discovery.shutdown();
        }
        self.channel.shutdown();
        self.session_shutdown.notify_one();

        if let Err(e) = self.session.await {
            tracing::warn!(error = %e, "session task ended abnormally");
        }
        if let Err(e) = self.listener.await {
            tracing::warn!(error = %e, "listener task ended abnormally");
        }
        tracing::info!(instance_id = %self.instance_id, "node stopped");
    }

    async fn send(&self, event: SessionEvent) -> std::result::Result<(), NodeError> {
        self.events_tx
            .send(event)
            .await
            .map_err(|_| NodeError::SessionClosed)
    }
}

/// Starts a node on an already bound listener.
pub async fn start(
    listener: TcpListener,
    settings: NodeSettings,
    overlay: Box<dyn Overlay>,
) -> Result<NodeHandle> {
    let local_addr = listener.local_addr()?;
    let instance_id = InstanceId::generate();

    // events_tx/rx: everything the session reacts to, from the network and the host.
    let (events_tx, events_rx) = mpsc::channel::<SessionEvent>(config::EVENT_CHANNEL_CAPACITY);
    // status_tx: best-effort notifications for the host.
    let (status_tx, _status_rx) =
        broadcast::channel::<StatusEvent>(config::STATUS_BROADCAST_CAPACITY);

    let channel = MessageChannel::new(
        ChannelSettings {
            write_queue_capacity: config::WRITE_QUEUE_CAPACITY,
            dial_timeout: settings.dial_timeout,
        },
        events_tx.clone(),
        status_tx.clone(),
    );
    let listener = channel.spawn_listener(listener);
    tracing::info!(%local_addr, %instance_id, "listening");
    let _ = status_tx.send(StatusEvent::Listening { addr: local_addr });

    let rng = settings
        .rng_seed
        .map(PcgShotRng::seeded)
        .unwrap_or_else(PcgShotRng::from_clock);
    let synchronizer = TrajectorySynchronizer::new(
        settings.tuning,
        settings.frame,
        settings.direction,
        settings.color,
        rng,
    );
    let link: Arc<dyn PeerLink> = Arc::new(channel.clone());
    let session = Session::new(
        instance_id.clone(),
        synchronizer,
        settings.max_active_shots,
        link,
        overlay,
        status_tx.clone(),
    );

    // Spawn the session task; it owns all shot and peer state from here on.
    let session_shutdown = Arc::new(Notify::new());
    let session = tokio::spawn(session_task(
        session,
        events_rx,
        settings.tick_interval,
        session_shutdown.clone(),
    ));

    let discovery = match settings.service_type {
        Some(service_type) => {
            let discovery_settings = DiscoverySettings {
                service_type,
                port: local_addr.port(),
                host_ip: advertised_ip(local_addr),
            };
            match Discovery::start(&discovery_settings, &instance_id, events_tx.clone()) {
                Ok(discovery) => {
                    let _ = status_tx.send(StatusEvent::Advertising {
                        name: discovery.fullname().to_string(),
                    });
                    Some(discovery)
                }
                Err(e) => {
                    // Discovery is optional; peers can still be added by hand.
                    tracing::warn!(error = %e, "discovery unavailable");
                    let _ = status_tx.send(StatusEvent::DiscoveryFailed {
                        error: e.to_string(),
                    });
                    None
                }
            }
        }
        None => {
            tracing::info!("discovery disabled");
            None
        }
    };

    Ok(NodeHandle {
        instance_id,
        local_addr,
        events_tx,
        status_tx,
        channel,
        discovery,
        session_shutdown,
        session,
        listener,
    })
}

// A listener bound to one specific IPv4 interface advertises that interface.
fn advertised_ip(local_addr: SocketAddr) -> Option<Ipv4Addr> {
    match local_addr {
        SocketAddr::V4(v4) if !v4.ip().is_unspecified() && !v4.ip().is_loopback() => {
            Some(*v4.ip())
        }
        _ => None,
    }
}

pub async fn run_with_config(overlay: Box<dyn Overlay>) -> Result<NodeHandle> {
    init_runtime();

    let settings = NodeSettings::from_env().map_err(|e| {
        tracing::error!(error = %e, "invalid configuration");
        std::io::Error::other(e.to_string())
    })?;
    let address = SocketAddr::new(config::listen_host(), config::listen_port());

    // Bind TCP listener with error handling
    let listener = TcpListener::bind(address).await.inspect_err(|e| {
        tracing::error!(%address, error = %e, "failed to bind");
    })?;

    start(listener, settings, overlay).await
}
