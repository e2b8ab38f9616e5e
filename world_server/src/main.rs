use std::time::Duration;

use netgate::{InputRx, OutputTx, QueueSink};
use simulation::{Clock, SystemClock};
use tokio::net::TcpListener;

use world_server::config::{parse_cli_args, ServerConfig};
use world_server::game::Game;
use world_server::shutdown::{self, shutdown_channel, ShutdownRx};
use world_server::wire::{self, WorldPacket};

#[tokio::main]
async fn main() {
    observability::init_logging();

    let config = parse_cli_args();
    tracing::info!("world server starting");

    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    let server_future = run_world_server(config, shutdown_rx);

    tokio::select! {
        _ = shutdown::wait_for_signal() => {
            tracing::info!("shutdown signal received, stopping server");
            shutdown_tx.trigger();
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        _ = server_future => {}
    }

    tracing::info!("server stopped");
}

async fn run_world_server(config: ServerConfig, shutdown_rx: ShutdownRx) {
    let (input_tx, input_rx) = tokio::sync::mpsc::unbounded_channel();
    let (output_tx, output_rx) = tokio::sync::mpsc::unbounded_channel();
    let (register_tx, register_rx) = tokio::sync::mpsc::unbounded_channel();
    let (unregister_tx, unregister_rx) = tokio::sync::mpsc::unbounded_channel();

    tokio::spawn(netgate::run_output_router(
        output_rx,
        register_rx,
        unregister_rx,
    ));

    let listener = match TcpListener::bind(&config.net.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %config.net.listen_addr, error = %e, "failed to bind");
            return;
        }
    };
    tracing::info!(addr = %config.net.listen_addr, "listening");

    let max_frame_len = config.net.max_frame_len;
    tokio::spawn(netgate::run_listener(
        listener,
        input_tx,
        register_tx,
        unregister_tx,
        max_frame_len,
    ));

    let frame_handle = std::thread::spawn(move || {
        run_frame_thread(input_rx, output_tx, config, shutdown_rx);
    });

    let _ = tokio::task::spawn_blocking(move || frame_handle.join()).await;
}

fn run_frame_thread(
    mut input_rx: InputRx,
    output_tx: OutputTx,
    config: ServerConfig,
    shutdown_rx: ShutdownRx,
) {
    let mut game = match Game::new(&config) {
        Ok(game) => game,
        Err(e) => {
            tracing::error!(error = %e, "world construction failed");
            std::process::exit(1);
        }
    };
    let mut sink = QueueSink::new(output_tx);
    let clock = SystemClock::new();
    let frame_interval = Duration::from_millis(1_000 / config.frame.fps.max(1) as u64);

    tracing::info!(
        characters = game.arena.len(),
        fps = config.frame.fps,
        "frame loop running"
    );

    loop {
        if shutdown_rx.is_shutdown() {
            tracing::info!("frame loop: shutdown signal received");
            let goodbye = wire::encode(&WorldPacket::Error {
                message: "server is shutting down".to_string(),
            });
            for id in game.connections.bound_characters() {
                if let Some(connection) = game.connections.connection_for(id) {
                    sink.send_final(connection, goodbye.clone());
                }
            }
            break;
        }

        let frame_start = std::time::Instant::now();

        while let Ok(msg) = input_rx.try_recv() {
            game.handle_net(msg, clock.now_ms(), &mut sink);
        }

        let metrics = game.run_frame(&clock, &mut sink);
        metrics.log();

        if let Some(rest) = frame_interval.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }
}
