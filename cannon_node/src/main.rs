// Headless host: drives a node from stdin and logs what an overlay would draw.

use cannon_node::domain::{Direction, PixelPoint, ProjectileKind, ShotId, ShotOutcome};
use cannon_node::{NodeHandle, NodeError, Overlay};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, trace, warn};

struct LogOverlay;

impl Overlay for LogOverlay {
    fn render(&mut self, shot_id: ShotId, at: PixelPoint) {
        trace!(shot_id, x = at.x, y = at.y, "render");
    }

    fn impact(&mut self, at: PixelPoint, kind: ProjectileKind) {
        info!(x = at.x, y = at.y, %kind, "impact");
    }

    fn shot_finished(&mut self, shot_id: ShotId, outcome: ShotOutcome) {
        debug!(shot_id, ?outcome, "shot finished");
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Launch {
        origin: PixelPoint,
        direction: Option<Direction>,
    },
    Direction(Direction),
    Fire(PixelPoint),
    Peer {
        host: String,
        port: u16,
    },
    Quit,
}

fn parse_point(x: Option<&str>, y: Option<&str>) -> Result<PixelPoint, String> {
    let coord = |value: Option<&str>, name: &str| -> Result<f64, String> {
        let value = value.ok_or_else(|| format!("missing {name}"))?;
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid {name} {value:?}"))
    };
    Ok(PixelPoint::new(coord(x, "x")?, coord(y, "y")?))
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let verb = parts.next().ok_or_else(|| "empty command".to_string())?;

    let command = match verb.to_ascii_lowercase().as_str() {
        "launch" => {
            let origin = parse_point(parts.next(), parts.next())?;
            let direction = parts.next().map(str::parse::<Direction>).transpose()?;
            Command::Launch { origin, direction }
        }
        "direction" => {
            let value = parts.next().ok_or_else(|| "missing direction".to_string())?;
            Command::Direction(value.parse()?)
        }
        "fire" => Command::Fire(parse_point(parts.next(), parts.next())?),
        "peer" => {
            let host = parts.next().ok_or_else(|| "missing host".to_string())?;
            let port = parts
                .next()
                .and_then(|p| p.parse::<u16>().ok())
                .ok_or_else(|| "missing or invalid port".to_string())?;
            Command::Peer {
                host: host.to_string(),
                port,
            }
        }
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command {other:?}")),
    };

    if parts.next().is_some() {
        return Err("unexpected trailing arguments".to_string());
    }
    Ok(command)
}

async fn execute(node: &NodeHandle, command: Command) -> Result<(), NodeError> {
    match command {
        Command::Launch {
            origin,
            direction: Some(direction),
        } => node.launch_towards(origin, direction).await,
        Command::Launch {
            origin,
            direction: None,
        } => node.launch(origin).await,
        Command::Direction(direction) => node.set_direction(direction).await,
        Command::Fire(at) => node.send_point_impact(at).await,
        Command::Peer { host, port } => node.add_peer(host, port).await,
        Command::Quit => Ok(()),
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let node = cannon_node::run_with_config(Box::new(LogOverlay)).await?;

    let mut status_rx = node.subscribe_status();
    tokio::spawn(async move {
        while let Ok(event) = status_rx.recv().await {
            debug!(?event, "status");
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if let Err(e) = execute(&node, command).await {
                            warn!(error = %e, "command failed");
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, line = %line, "ignoring command"),
                },
                // Keep serving peers without a terminal until interrupted.
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    stdin_open = false;
                }
            },
        }
    }

    node.shutdown().await;
    Ok(())
}
