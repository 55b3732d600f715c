// LAN service discovery over mDNS: advertise this node, browse for others.

use crate::domain::InstanceId;
use crate::use_cases::{ServiceRecord, SessionEvent};
use mdns_sd::{Receiver, ServiceDaemon, ServiceEvent, ServiceInfo};
use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// TXT property carrying the advertiser's instance id.
pub const INSTANCE_ID_KEY: &str = "instance_id";

#[derive(Debug)]
pub enum DiscoveryError {
    Daemon(mdns_sd::Error),
    Advertise(mdns_sd::Error),
    Browse(mdns_sd::Error),
    /// A resolved record had no IPv4 address to dial.
    NoIpv4 { name: String },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::Daemon(e) => write!(f, "failed to start mDNS daemon: {e}"),
            DiscoveryError::Advertise(e) => write!(f, "failed to advertise service: {e}"),
            DiscoveryError::Browse(e) => write!(f, "failed to browse services: {e}"),
            DiscoveryError::NoIpv4 { name } => write!(f, "record {name} has no IPv4 address"),
        }
    }
}

impl std::error::Error for DiscoveryError {}

#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub service_type: String,
    /// Port peers should dial.
    pub port: u16,
    /// Advertised address; the LAN-facing interface when unset.
    pub host_ip: Option<Ipv4Addr>,
}

/// Running advertisement plus browser. Dropping it without `shutdown` leaves the daemon up.
pub struct Discovery {
    daemon: ServiceDaemon,
    fullname: String,
    service_type: String,
}

impl Discovery {
    /// Registers this node and forwards every resolved record to the session.
    ///
    /// Browse events are read on a blocking worker so the daemon's channel never waits on the
    /// session.
    pub fn start(
        settings: &DiscoverySettings,
        instance_id: &InstanceId,
        events_tx: mpsc::Sender<SessionEvent>,
    ) -> Result<Self, DiscoveryError> {
        let daemon = ServiceDaemon::new().map_err(DiscoveryError::Daemon)?;

        let host_ip = settings.host_ip.unwrap_or_else(lan_ipv4).to_string();
        let instance_name = format!("CatClick-{instance_id}");
        let host_name = format!("catclick-{instance_id}.local.");
        let properties = HashMap::from([(INSTANCE_ID_KEY.to_string(), instance_id.to_string())]);

        let info = ServiceInfo::new(
            &settings.service_type,
            &instance_name,
            &host_name,
            host_ip.as_str(),
            settings.port,
            properties,
        )
        .map_err(DiscoveryError::Advertise)?;
        let fullname = info.get_fullname().to_string();
        daemon.register(info).map_err(DiscoveryError::Advertise)?;
        info!(name = %fullname, %host_ip, port = settings.port, "advertising");

        let receiver = daemon
            .browse(&settings.service_type)
            .map_err(DiscoveryError::Browse)?;
        tokio::task::spawn_blocking(move || browse_loop(receiver, events_tx));

        Ok(Self {
            daemon,
            fullname,
            service_type: settings.service_type.clone(),
        })
    }

    pub fn fullname(&self) -> &str {
        &self.fullname
    }

    /// Withdraws the advertisement and stops the daemon. Failures are logged and ignored.
    pub fn shutdown(self) {
        if let Err(e) = self.daemon.unregister(&self.fullname) {
            debug!(error = %e, "unregister failed");
        }
        if let Err(e) = self.daemon.stop_browse(&self.service_type) {
            debug!(error = %e, "stop browse failed");
        }
        if let Err(e) = self.daemon.shutdown() {
            debug!(error = %e, "daemon shutdown failed");
        }
        info!(name = %self.fullname, "discovery stopped");
    }
}

fn browse_loop(receiver: Receiver<ServiceEvent>, events_tx: mpsc::Sender<SessionEvent>) {
    while let Ok(event) = receiver.recv() {
        match event {
            ServiceEvent::ServiceResolved(info) => match record_from_info(&info) {
                Ok(record) => {
                    if events_tx
                        .blocking_send(SessionEvent::ServiceResolved(record))
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "dropping service record"),
            },
            ServiceEvent::SearchStopped(service_type) => {
                debug!(%service_type, "browse stopped");
                break;
            }
            other => debug!(event = ?other, "discovery event"),
        }
    }
}

/// Extracts what the directory needs from a resolved record. Only IPv4 addresses are dialed.
pub fn record_from_info(info: &ServiceInfo) -> Result<ServiceRecord, DiscoveryError> {
    let mut ipv4: Vec<Ipv4Addr> = info
        .get_addresses()
        .iter()
        .filter_map(|addr| match addr {
            IpAddr::V4(v4) => Some(*v4),
            IpAddr::V6(_) => None,
        })
        .collect();
    // Address sets are unordered; pick deterministically.
    ipv4.sort();
    let host = ipv4
        .first()
        .ok_or_else(|| DiscoveryError::NoIpv4 {
            name: info.get_fullname().to_string(),
        })?
        .to_string();

    Ok(ServiceRecord {
        name: info.get_fullname().to_string(),
        instance_id: info
            .get_property_val_str(INSTANCE_ID_KEY)
            .map(str::to_string),
        host,
        port: info.get_port(),
    })
}

/// Address of the interface the OS would route LAN traffic through. No packet is sent.
pub fn lan_ipv4() -> Ipv4Addr {
    let probe = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
        Ok(socket.local_addr()?.ip())
    };
    match probe() {
        Ok(IpAddr::V4(ip)) if !ip.is_unspecified() => ip,
        _ => Ipv4Addr::LOCALHOST,
    }
}
