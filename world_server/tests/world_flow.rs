/// End-to-end exercises of the frame-thread surface: clients join over the
/// channel plumbing, walk across sector boundaries, drop and claim items,
/// and the per-connection packet streams are checked in order.
use entities::ConnectionId;
use netgate::{NetToSim, Outbound, QueueSink};
use simulation::{Clock, ManualClock};
use tokio::sync::mpsc;
use world_server::config::{MonsterSpec, RegionSpec, ServerConfig};
use world_server::game::Game;
use world_server::wire::{self, ClientPacket, WorldPacket};

use spatial::{RegionTemplate, SafetyClass};

struct Harness {
    game: Game,
    sink: QueueSink,
    output_rx: mpsc::UnboundedReceiver<Outbound>,
    clock: ManualClock,
}

impl Harness {
    fn new(config: &ServerConfig) -> Self {
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        Self {
            game: Game::new(config).expect("world should build"),
            sink: QueueSink::new(output_tx),
            output_rx,
            clock: ManualClock::at(1),
        }
    }

    fn connect_and_join(&mut self, raw: u64, name: &str) -> ConnectionId {
        let connection = ConnectionId(raw);
        self.game.handle_net(
            NetToSim::Connected { connection },
            self.clock.now_ms(),
            &mut self.sink,
        );
        self.send_packet(connection, &ClientPacket::Join { name: name.into() });
        connection
    }

    fn send_packet(&mut self, connection: ConnectionId, packet: &ClientPacket) {
        self.game.handle_net(
            NetToSim::Packet {
                connection,
                payload: wire::encode_client(packet),
            },
            self.clock.now_ms(),
            &mut self.sink,
        );
    }

    /// Drain everything queued so far, decoded and grouped per connection.
    fn drain(&mut self) -> Vec<(ConnectionId, WorldPacket)> {
        let mut out = Vec::new();
        while let Ok(outbound) = self.output_rx.try_recv() {
            let packet = bincode::deserialize(&outbound.packet).expect("decodable packet");
            out.push((outbound.connection, packet));
        }
        out
    }

    fn drain_for(&mut self, connection: ConnectionId) -> Vec<WorldPacket> {
        self.drain()
            .into_iter()
            .filter(|(c, _)| *c == connection)
            .map(|(_, p)| p)
            .collect()
    }
}

fn small_world() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.world.sector_count_x = 8;
    config.world.sector_count_z = 8;
    config.world.sector_width = 100.0;
    config.world.origin_x = 0.0;
    config.world.origin_z = 0.0;
    config.world.spawn_x = 450.0;
    config.world.spawn_z = 450.0;
    config
}

#[test]
fn two_players_meet_by_walking() {
    let mut h = Harness::new(&small_world());
    let a = h.connect_and_join(1, "alice");
    let bob_conn = h.connect_and_join(2, "bob");
    let bob = h.game.connections.character_for(bob_conn).unwrap();
    h.drain();

    // Bob teleports far away, then walks back one sector at a time.
    h.send_packet(bob_conn, &ClientPacket::Move { x: 750.0, y: 0.0, z: 450.0 });
    let alice_packets = h.drain_for(a);
    assert!(
        matches!(alice_packets[0], WorldPacket::CharacterRemove { id } if id == bob.to_u64())
    );

    h.send_packet(bob_conn, &ClientPacket::Move { x: 550.0, y: 0.0, z: 450.0 });
    let alice_packets = h.drain_for(a);
    assert!(
        matches!(&alice_packets[0], WorldPacket::CharacterView { id, name, .. }
            if *id == bob.to_u64() && name == "bob")
    );

    // Another step inside the shared neighborhood is silent.
    h.send_packet(bob_conn, &ClientPacket::Move { x: 540.0, y: 0.0, z: 440.0 });
    assert!(h.drain_for(a).is_empty());
}

#[test]
fn welcome_precedes_neighborhood_views() {
    let mut h = Harness::new(&small_world());
    h.connect_and_join(1, "alice");
    h.drain();
    let conn = h.connect_and_join(2, "bob");

    let packets = h.drain_for(conn);
    assert!(matches!(packets[0], WorldPacket::Welcome { .. }));
    assert!(
        matches!(&packets[1], WorldPacket::CharacterView { name, .. } if name == "alice")
    );
}

#[test]
fn drop_visible_to_late_arrivals_and_swept_on_expiry() {
    let mut config = small_world();
    config.world.drop_lifetime_ms = 2_000;
    let mut h = Harness::new(&config);
    let a = h.connect_and_join(1, "alice");
    h.send_packet(a, &ClientPacket::DropItem { item_id: 9, quantity: 2 });
    h.drain();

    // A player joining afterwards sees the drop via the spawn exchange.
    let b = h.connect_and_join(2, "bob");
    let packets = h.drain_for(b);
    assert!(packets
        .iter()
        .any(|p| matches!(p, WorldPacket::DropView { item_id: 9, .. })));

    // Frames run until past the lifetime; both players get the removal.
    h.clock.advance(3_000);
    h.game.run_frame(&h.clock, &mut h.sink);
    let everything = h.drain();
    let removes = everything
        .iter()
        .filter(|(_, p)| matches!(p, WorldPacket::DropRemove { .. }))
        .count();
    assert_eq!(removes, 2);
}

#[test]
fn safe_region_binding_on_entry() {
    let mut config = small_world();
    config.regions = vec![RegionSpec {
        template: RegionTemplate {
            id: 4,
            name: "sanctum".to_string(),
            safety: SafetyClass::Safe,
            level_limit: 0,
        },
        min_x: 0.0,
        min_z: 0.0,
        max_x: 100.0,
        max_z: 100.0,
    }];
    let mut h = Harness::new(&config);
    let conn = h.connect_and_join(1, "alice");
    let alice = h.game.connections.character_for(conn).unwrap();
    assert_eq!(h.game.arena.get(alice).unwrap().bound_region_id, None);

    h.send_packet(conn, &ClientPacket::Move { x: 50.0, y: 0.0, z: 50.0 });
    assert_eq!(h.game.arena.get(alice).unwrap().bound_region_id, Some(4));

    // Leaving the region keeps the binding for respawn.
    h.send_packet(conn, &ClientPacket::Move { x: 450.0, y: 0.0, z: 450.0 });
    assert_eq!(h.game.arena.get(alice).unwrap().bound_region_id, Some(4));
}

#[test]
fn large_monster_population_is_amortized_across_frames() {
    let mut config = small_world();
    config.frame.batch_size = 10;
    config.frame.budget_ms = 0;
    config.monsters = (0..35)
        .map(|i| MonsterSpec {
            name: format!("mob-{i}"),
            x: 150.0 + (i as f32),
            z: 150.0,
        })
        .collect();
    let mut h = Harness::new(&config);
    let clock = ManualClock::at(10);

    // Zero budget: exactly one batch per frame, resuming where it stopped.
    let first = h.game.run_frame(&clock, &mut h.sink);
    assert_eq!(first.processed, 10);
    assert_eq!(first.deferred, 25);

    let mut total = first.processed;
    for _ in 0..3 {
        total += h.game.run_frame(&clock, &mut h.sink).processed;
    }
    assert_eq!(total, 35);
}

#[test]
fn ping_pong() {
    let mut h = Harness::new(&small_world());
    let connection = ConnectionId(5);
    h.game.handle_net(
        NetToSim::Connected { connection },
        h.clock.now_ms(),
        &mut h.sink,
    );
    h.send_packet(connection, &ClientPacket::Ping);
    let packets = h.drain_for(connection);
    assert!(matches!(packets[0], WorldPacket::Pong));
}
