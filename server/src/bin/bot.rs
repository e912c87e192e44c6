//! Headless client that joins a running server, walks up to breakables and
//! swings at them. Useful for smoke-testing a server without a browser.

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use rand::Rng;
use shared::{
    bearing, distance, AttackInput, Breakable, ClientEvent, InitPayload, MoveInput, ServerEvent,
};
use std::time::Duration;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Websocket URL of the server
    #[clap(short, long, default_value = "ws://127.0.0.1:3000")]
    url: String,
    /// Catalog key of the weapon to swing; defaults to the first catalog entry
    #[clap(short, long)]
    weapon: Option<String>,
    /// Number of attacks before disconnecting
    #[clap(short, long, default_value = "10")]
    attacks: u32,
    /// Delay between attacks in milliseconds
    #[clap(short, long, default_value = "500")]
    interval_ms: u64,
}

/// Orders breakables nearest-first as seen from `from`.
fn by_distance(mut breakables: Vec<Breakable>, from: (f64, f64)) -> Vec<Breakable> {
    breakables.sort_by(|a, b| {
        let da = distance(from, (a.x, a.y));
        let db = distance(from, (b.x, b.y));
        da.total_cmp(&db)
    });
    breakables
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let (ws_stream, _) = connect_async(args.url.as_str()).await?;
    info!("Connected to {}", args.url);
    let (mut sink, mut stream) = ws_stream.split();

    let init: InitPayload = loop {
        let Some(frame) = stream.next().await else {
            return Err("server closed the connection before init".into());
        };
        if let Message::Text(text) = frame? {
            if let Ok(ServerEvent::Init(init)) = ServerEvent::from_json(text.as_str()) {
                break init;
            }
        }
    };

    let weapon = match args.weapon.or_else(|| init.weapons.keys().next().cloned()) {
        Some(weapon) => weapon,
        None => return Err("server catalog has no weapons".into()),
    };
    info!(
        "Joined as player {} with {} breakables in view, swinging {}",
        init.id,
        init.breakables.len(),
        weapon
    );

    let mut position = init
        .players
        .get(&init.id)
        .map(|player| player.position())
        .unwrap_or_default();
    let targets = by_distance(init.breakables, position);
    let mut rng = rand::thread_rng();

    // Log everything the server pushes while we play
    let reader = tokio::spawn(async move {
        while let Some(Ok(frame)) = stream.next().await {
            if let Message::Text(text) = frame {
                match ServerEvent::from_json(text.as_str()) {
                    Ok(event) => info!("<- {}: {}", event.name(), text.as_str()),
                    Err(e) => warn!("Undecodable frame: {}", e),
                }
            }
        }
    });

    for round in 0..args.attacks as usize {
        let target = if targets.is_empty() {
            None
        } else {
            targets.get(round % targets.len())
        };
        let angle = match target {
            Some(target) => {
                // Step next to the target, slightly off-axis
                let (tx, ty) = (target.x, target.y);
                position = (tx - 20.0, ty + rng.gen_range(-5.0f64..5.0));
                let moved = ClientEvent::Move(MoveInput {
                    x: position.0,
                    y: position.1,
                    vx: None,
                    vy: None,
                });
                sink.send(Message::text(moved.to_json()?)).await?;
                bearing(position, (tx, ty))
            }
            None => rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI),
        };

        let attack = ClientEvent::WeaponAttack(AttackInput {
            weapon: weapon.clone(),
            angle,
            x: Some(position.0),
            y: Some(position.1),
        });
        sink.send(Message::text(attack.to_json()?)).await?;

        sleep(Duration::from_millis(args.interval_ms)).await;
    }

    sink.send(Message::text(ClientEvent::Disconnect.to_json()?)).await?;
    let _ = sink.close().await;
    let _ = reader.await;

    info!("Bot finished");
    Ok(())
}
