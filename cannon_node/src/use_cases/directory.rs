// Peer directory: self-filtering and once-per-address deduplication of discovery records.

use crate::domain::{InstanceId, Peer};
use crate::use_cases::types::ServiceRecord;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// The record advertises this process.
    SelfAnnouncement,
    /// A peer at this host/port was already reported.
    AlreadyKnown,
    NewPeer(Peer),
}

/// Add-only set of reachable peers. Disconnects are a channel concern, not a directory one.
#[derive(Debug)]
pub struct PeerDirectory {
    local_id: InstanceId,
    known: HashSet<(String, u16)>,
    peers: Vec<Peer>,
}

impl PeerDirectory {
    pub fn new(local_id: InstanceId) -> Self {
        Self {
            local_id,
            known: HashSet::new(),
            peers: Vec::new(),
        }
    }

    pub fn local_id(&self) -> &InstanceId {
        &self.local_id
    }

    pub fn observe(&mut self, record: &ServiceRecord) -> Observation {
        if record.instance_id.as_deref() == Some(self.local_id.as_str()) {
            return Observation::SelfAnnouncement;
        }

        if !self.known.insert((record.host.clone(), record.port)) {
            return Observation::AlreadyKnown;
        }

        let peer = Peer {
            instance_id: InstanceId::from(record.instance_id.clone().unwrap_or_default()),
            host: record.host.clone(),
            port: record.port,
        };
        self.peers.push(peer.clone());
        Observation::NewPeer(peer)
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }
}
