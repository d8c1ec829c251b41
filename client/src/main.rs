use clap::Parser;
use client::game::MirrorWorld;
use client::input::{self, InputTracker};
use client::network::Connection;
use client::rendering::Renderer;
use log::{info, warn};
use macroquad::prelude::*;
use shared::{Packet, WORLD_HEIGHT, WORLD_WIDTH};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Arena".to_string(),
        window_width: WORLD_WIDTH as i32,
        window_height: WORLD_HEIGHT as i32,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();
    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    info!("Connecting to: {}", args.server);
    info!("Controls: A/D to move, Space to jump, J to attack");

    let mut connection = match Connection::connect(&args.server) {
        Ok(connection) => connection,
        Err(e) => {
            eprintln!("Failed to connect to {}: {}", args.server, e);
            return;
        }
    };

    let mut world = MirrorWorld::new();
    let mut tracker = InputTracker::new();
    let mut renderer = Renderer::new();

    loop {
        let now = get_time();

        for packet in connection.poll() {
            match packet {
                Packet::Connected { entity_id, .. } => {
                    world.local_entity = Some(entity_id);
                    renderer.set_local_entity(Some(entity_id));
                }
                Packet::GameState {
                    tick,
                    timestamp,
                    entities,
                    ..
                } => {
                    world.ping_ms = input::now_millis().saturating_sub(timestamp);
                    world.apply_game_state(now, tick, entities);
                }
                Packet::Event { event } => {
                    world.apply_event(event);
                }
                Packet::Disconnected { reason } => {
                    warn!("Server closed the session: {}", reason);
                    return;
                }
                _ => {}
            }
        }

        if connection.is_connected() {
            let input = tracker.sample();
            if connection.send(&input::to_packet(&input)).is_err() {
                warn!("Failed to send input frame");
            }
        }

        world.update(get_frame_time());
        let states = world.render_states(now);
        renderer.render(&world, &states, connection.is_connected());

        if is_key_pressed(KeyCode::Escape) {
            connection.disconnect();
            return;
        }

        next_frame().await;
    }
}
