use clap::Parser;
use client::game::ClientWorld;
use client::input::KeyboardInput;
use client::network::{NetworkClock, NetworkHandle};
use client::rendering::{Renderer, UiConfig};
use log::{error, info};
use macroquad::prelude::{next_frame, Conf};
use shared::config::SimulationConfig;
use shared::physics::Arena;
use shared::{Packet, PROTOCOL_VERSION};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Name shown to other players
    #[arg(short = 'n', long, default_value = "Bunny")]
    name: String,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Window width
    #[arg(short = 'w', long, default_value = "800")]
    width: usize,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "600")]
    height: usize,
}

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: "Stomp".to_owned(),
        window_width: args.width as i32,
        window_height: args.height as i32,
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

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }
    info!("Controls: A/D to move, W/Space to jump, Tab for scores");

    let mut network = match NetworkHandle::connect(&args.server, args.fake_ping) {
        Ok(network) => network,
        Err(e) => {
            error!("Failed to start networking: {}", e);
            return;
        }
    };

    let mut clock = NetworkClock::new();
    let mut world = ClientWorld::new(SimulationConfig::default(), Arena::standard());
    let mut input = KeyboardInput::new();
    let mut renderer = Renderer::new(args.width, args.height);

    network.send(Packet::Connect {
        client_version: PROTOCOL_VERSION,
        name: args.name.clone(),
    });

    loop {
        if input.quit_requested() {
            break;
        }

        for packet in network.poll() {
            match &packet {
                Packet::Connected { server_time, .. } => {
                    clock.on_connected(*server_time, clock.local_time());
                }
                Packet::Pong {
                    client_time,
                    server_time,
                } => clock.on_pong(*client_time, *server_time, clock.local_time()),
                _ => {}
            }
            world.handle_packet(packet, clock.now());
        }

        if world.is_connected() {
            if let Some(client_time) = clock.ping_due(clock.local_time()) {
                network.send(Packet::Ping { client_time });
            }
        }

        // Inputs are stamped with network time, so nothing runs before the
        // handshake has seeded the clock.
        if clock.is_synchronized() {
            world.update(&mut input, clock.now());
            network.send_outbox(world.drain_outbox());
        }

        if input.scoreboard_toggled() {
            renderer.toggle_scoreboard();
        }

        renderer.render(
            &world,
            UiConfig {
                client_id: world.client_id(),
                ping_ms: clock.rtt_ms(),
                fake_ping_ms: args.fake_ping,
                corrections: world.corrections(),
                player_count: world.remote_count() + usize::from(world.local().is_some()),
            },
        );

        next_frame().await;
    }

    if world.is_connected() {
        network.send(Packet::Disconnect);
    }
}
