// Shared helpers for node integration tests: loopback nodes with discovery off.
#![allow(dead_code)]

use cannon_node::domain::tuning::{CannonTuning, Range};
use cannon_node::domain::{PixelPoint, ProjectileKind, ShotId, ShotOutcome};
use cannon_node::use_cases::StatusEvent;
use cannon_node::{NodeHandle, NodeSettings, Overlay};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::broadcast;

// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
pub struct OverlayLog {
    pub renders: Vec<(ShotId, PixelPoint)>,
    pub impacts: Vec<(PixelPoint, ProjectileKind)>,
    pub finished: Vec<(ShotId, ShotOutcome)>,
}

// Overlay whose log stays readable after the node takes ownership of it.
#[derive(Clone, Default)]
pub struct SharedOverlay {
    log: Arc<Mutex<OverlayLog>>,
}

impl SharedOverlay {
    pub fn with_log<T>(&self, f: impl FnOnce(&OverlayLog) -> T) -> T {
        let log = self.log.lock().expect("overlay log poisoned");
        f(&*log)
    }
}

impl Overlay for SharedOverlay {
    fn render(&mut self, shot_id: ShotId, at: PixelPoint) {
        self.log.lock().expect("overlay log poisoned").renders.push((shot_id, at));
    }

    fn impact(&mut self, at: PixelPoint, kind: ProjectileKind) {
        self.log.lock().expect("overlay log poisoned").impacts.push((at, kind));
    }

    fn shot_finished(&mut self, shot_id: ShotId, outcome: ShotOutcome) {
        self.log
            .lock()
            .expect("overlay log poisoned")
            .finished
            .push((shot_id, outcome));
    }
}

// Fixed physics so a launch from the screen centre always lands on the neighbour.
pub fn test_settings() -> NodeSettings {
    NodeSettings {
        tuning: CannonTuning {
            gravity: Range::new(2.0, 2.0),
            peak_height: Range::new(0.5, 0.5),
            speed: Range::new(1.0, 1.0),
            landing_min: 0.6,
            landing_max: 0.6,
            kinds_enabled: false,
            ..CannonTuning::default()
        },
        service_type: None,
        dial_timeout: Duration::from_millis(500),
        rng_seed: Some(1),
        ..NodeSettings::default()
    }
}

pub async fn start_node() -> (NodeHandle, SharedOverlay) {
    // Bind to an ephemeral port to avoid collisions with local services.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let overlay = SharedOverlay::default();
    let node = cannon_node::start(listener, test_settings(), Box::new(overlay.clone()))
        .await
        .expect("node starts");
    (node, overlay)
}

pub async fn wait_for_status(
    status_rx: &mut broadcast::Receiver<StatusEvent>,
    mut matches: impl FnMut(&StatusEvent) -> bool,
) -> StatusEvent {
    tokio::time::timeout(WAIT, async {
        loop {
            match status_rx.recv().await {
                Ok(event) if matches(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("status channel closed"),
            }
        }
    })
    .await
    .expect("status event before timeout")
}

// Polls `condition` until it holds or the wait bound passes.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("condition before timeout")
}

pub async fn read_json_line(reader: &mut BufReader<OwnedReadHalf>) -> serde_json::Value {
    let mut line = String::new();
    let read = tokio::time::timeout(WAIT, reader.read_line(&mut line))
        .await
        .expect("line before timeout")
        .expect("read line");
    assert!(read > 0, "connection closed before a line arrived");
    serde_json::from_str(line.trim_end()).expect("peer sent valid json")
}

// Raw TCP peer, connected to `node` and registered on its side.
pub async fn connect_raw(
    node: &NodeHandle,
    status_rx: &mut broadcast::Receiver<StatusEvent>,
) -> TcpStream {
    let stream = TcpStream::connect(node.local_addr())
        .await
        .expect("connect to node");
    wait_for_status(status_rx, |event| matches!(event, StatusEvent::Connected { .. })).await;
    stream
}
