use std::time::Instant;

use entities::{Character, CharacterArena, CharacterId, CharacterKind, ConnectionId, Position};
use netgate::{ConnectionTable, NetToSim};
use observability::FrameMetrics;
use simulation::{Clock, TickScheduler};
use spatial::{DropId, ItemDrop, MapError, PacketSink, RegionTable, WorldMap};

use crate::config::ServerConfig;
use crate::wire::{self, ClientPacket, WireEncoder, WorldPacket};

const MONSTER_SPEED: f32 = 40.0;

/// Sink for startup work that happens before any client can be connected.
struct NullSink;

impl PacketSink for NullSink {
    fn send(&mut self, _connection: ConnectionId, _packet: &[u8]) {}
}

/// The whole simulation state, owned by the frame thread. Everything here
/// is single-threaded; the async side only talks to it through channels.
pub struct Game {
    pub arena: CharacterArena,
    pub world: WorldMap,
    pub scheduler: TickScheduler,
    pub connections: ConnectionTable,
    encoder: WireEncoder,
    spawn_point: Position,
    drop_lifetime_ms: u64,
    frame_budget_ms: u64,
    frame_number: u64,
}

impl Game {
    /// Build the world from config: region overlay painted, static npcs
    /// registered, monsters placed. Fails when the world data is
    /// inconsistent, e.g. an npc standing on unregioned ground.
    pub fn new(config: &ServerConfig) -> Result<Self, MapError> {
        let templates = config.regions.iter().map(|r| r.template.clone()).collect();
        let regions = RegionTable::load(templates)?;
        let mut world = WorldMap::new(config.to_bounds(), regions)?;
        world.ownership_window_ms = config.world.ownership_window_ms;

        for spec in &config.regions {
            world.set_region_rect(
                &Position::new(spec.min_x, 0.0, spec.min_z),
                &Position::new(spec.max_x, 0.0, spec.max_z),
                spatial::RegionId(spec.template.id),
            );
        }

        let mut arena = CharacterArena::new();
        let encoder = WireEncoder;
        let mut sink = NullSink;
        for spec in &config.npcs {
            let id = arena.spawn(Character::new(
                spec.name.clone(),
                CharacterKind::Npc,
                Position::new(spec.x, 0.0, spec.z),
            ));
            world.add_character(&mut arena, id, &encoder, &mut sink)?;
            let region = world.register_static_npc(&arena, id, &encoder)?;
            tracing::info!(npc = %spec.name, %region, "static npc registered");
        }
        for spec in &config.monsters {
            let id = arena.spawn(Character::new(
                spec.name.clone(),
                CharacterKind::Monster,
                Position::new(spec.x, 0.0, spec.z),
            ));
            world.add_character(&mut arena, id, &encoder, &mut sink)?;
        }

        Ok(Self {
            arena,
            world,
            scheduler: TickScheduler::new(config.to_scheduler_config()),
            connections: ConnectionTable::new(),
            encoder,
            spawn_point: Position::new(config.world.spawn_x, 0.0, config.world.spawn_z),
            drop_lifetime_ms: config.world.drop_lifetime_ms,
            frame_budget_ms: config.frame.budget_ms,
            frame_number: 0,
        })
    }

    pub fn handle_net(&mut self, msg: NetToSim, now_ms: u64, sink: &mut impl PacketSink) {
        match msg {
            NetToSim::Connected { connection } => {
                self.connections.open(connection);
                tracing::info!(%connection, "client connected");
            }
            NetToSim::Packet {
                connection,
                payload,
            } => match wire::decode(&payload) {
                Ok(packet) => self.handle_packet(connection, packet, now_ms, sink),
                Err(e) => {
                    tracing::warn!(%connection, error = %e, "malformed packet");
                    self.send(
                        sink,
                        connection,
                        &WorldPacket::Error {
                            message: "malformed packet".to_string(),
                        },
                    );
                }
            },
            NetToSim::Disconnected { connection } => {
                if let Some(id) = self.connections.close(connection) {
                    if let Err(e) =
                        self.world
                            .remove_character(&mut self.arena, id, &self.encoder, sink)
                    {
                        tracing::warn!(character = %id, error = %e, "removal on disconnect failed");
                    }
                    self.arena.despawn(id);
                }
                tracing::info!(%connection, "client disconnected");
            }
        }
    }

    fn handle_packet(
        &mut self,
        connection: ConnectionId,
        packet: ClientPacket,
        now_ms: u64,
        sink: &mut impl PacketSink,
    ) {
        match packet {
            ClientPacket::Join { name } => self.handle_join(connection, name, sink),
            ClientPacket::Move { x, y, z } => {
                let Some(id) = self.require_character(connection, sink) else {
                    return;
                };
                let target = Position::new(x, y, z);
                if self.world.tile_at(&target).blocks_ground() {
                    self.send_error(sink, connection, "that way is blocked");
                    return;
                }
                if let Err(e) =
                    self.world
                        .move_character(&mut self.arena, id, target, &self.encoder, sink)
                {
                    tracing::warn!(character = %id, error = %e, "move failed");
                }
            }
            ClientPacket::Say { text } => {
                let Some(id) = self.require_character(connection, sink) else {
                    return;
                };
                let Some(name) = self.arena.get(id).map(|c| c.name.clone()) else {
                    return;
                };
                let chat = wire::encode(&WorldPacket::Chat {
                    from: id.to_u64(),
                    name,
                    text,
                });
                if let Err(e) = self.world.broadcast(&self.arena, id, &chat, sink) {
                    tracing::warn!(character = %id, error = %e, "chat broadcast failed");
                }
            }
            ClientPacket::DropItem { item_id, quantity } => {
                let Some(id) = self.require_character(connection, sink) else {
                    return;
                };
                if quantity == 0 {
                    self.send_error(sink, connection, "nothing to drop");
                    return;
                }
                let Some(pos) = self.arena.get(id).map(|c| c.pos) else {
                    return;
                };
                self.world.add_drop(
                    ItemDrop {
                        item_id,
                        quantity,
                        pos,
                        owner: Some(id),
                        ownership_expires_at: 0,
                        expires_at: now_ms + self.drop_lifetime_ms,
                    },
                    now_ms,
                    &self.arena,
                    &self.encoder,
                    sink,
                );
            }
            ClientPacket::Pickup { drop_id } => {
                let Some(id) = self.require_character(connection, sink) else {
                    return;
                };
                match self.world.claim_drop(
                    DropId(drop_id),
                    id,
                    now_ms,
                    &self.arena,
                    &self.encoder,
                    sink,
                ) {
                    Some(item) => self.send(
                        sink,
                        connection,
                        &WorldPacket::PickupResult {
                            drop_id,
                            item_id: item.item_id,
                            quantity: item.quantity,
                        },
                    ),
                    None => self.send_error(sink, connection, "cannot pick that up"),
                }
            }
            ClientPacket::Ping => self.send(sink, connection, &WorldPacket::Pong),
        }
    }

    fn handle_join(
        &mut self,
        connection: ConnectionId,
        name: String,
        sink: &mut impl PacketSink,
    ) {
        if !self.connections.is_open(connection) {
            return;
        }
        if self.connections.character_for(connection).is_some() {
            self.send_error(sink, connection, "already joined");
            return;
        }
        let name = name.trim().to_string();
        if name.is_empty() {
            self.send_error(sink, connection, "a name is required");
            return;
        }
        let id = self.arena.spawn(Character::new(
            name,
            CharacterKind::Player { connection },
            self.spawn_point,
        ));
        // Welcome first so the client knows its own id before the
        // neighborhood views start arriving.
        self.send(
            sink,
            connection,
            &WorldPacket::Welcome {
                character_id: id.to_u64(),
            },
        );
        if let Err(e) = self
            .world
            .add_character(&mut self.arena, id, &self.encoder, sink)
        {
            tracing::warn!(character = %id, error = %e, "join placement failed");
            self.arena.despawn(id);
            return;
        }
        self.connections.bind(connection, id);
        tracing::info!(%connection, character = %id, "player joined");
    }

    /// One simulation frame: step the scheduler, expire drops, drain
    /// transition events.
    pub fn run_frame(&mut self, clock: &impl Clock, sink: &mut impl PacketSink) -> FrameMetrics {
        let started = Instant::now();
        self.frame_number += 1;
        let frame_number = self.frame_number;
        let encoder = self.encoder;

        let Self {
            arena,
            world,
            scheduler,
            ..
        } = self;
        let report = scheduler.run_frame(arena, clock, |arena, id, dt| {
            if dt <= 0.0 {
                return;
            }
            let Some(character) = arena.get(id) else {
                return;
            };
            if !matches!(character.kind, CharacterKind::Monster) {
                return;
            }
            let next = patrol_step(id, &character.pos, dt);
            if world.tile_at(&next).blocks_ground() {
                return;
            }
            if let Err(e) = world.move_character(arena, id, next, &encoder, sink) {
                tracing::warn!(character = %id, error = %e, "patrol move failed");
            }
        });

        self.world
            .sweep_expired_drops(clock.now_ms(), &self.arena, &self.encoder, sink);
        for event in self.world.take_events() {
            tracing::trace!(?event, "sector transition");
        }

        FrameMetrics {
            frame_number,
            duration_us: started.elapsed().as_micros(),
            budget_us: self.frame_budget_ms as u128 * 1_000,
            processed: report.processed,
            deferred: report.remaining,
            character_count: self.arena.len(),
            drop_count: self.world.drop_count(),
            connection_count: self.connections.active_count(),
        }
    }

    fn require_character(
        &mut self,
        connection: ConnectionId,
        sink: &mut impl PacketSink,
    ) -> Option<CharacterId> {
        let id = self.connections.character_for(connection);
        if id.is_none() {
            self.send_error(sink, connection, "join first");
        }
        id
    }

    fn send(&self, sink: &mut impl PacketSink, connection: ConnectionId, packet: &WorldPacket) {
        sink.send(connection, &wire::encode(packet));
    }

    fn send_error(&self, sink: &mut impl PacketSink, connection: ConnectionId, message: &str) {
        self.send(
            sink,
            connection,
            &WorldPacket::Error {
                message: message.to_string(),
            },
        );
    }
}

/// Deterministic drift for monsters: each walks a fixed heading derived
/// from its id. Enough to exercise sector transitions without an AI layer.
fn patrol_step(id: CharacterId, pos: &Position, dt: f32) -> Position {
    let heading = (id.to_u64() % 8) as f32 * (std::f32::consts::TAU / 8.0);
    let step = MONSTER_SPEED * dt;
    Position::new(
        pos.x + heading.cos() * step,
        pos.y,
        pos.z + heading.sin() * step,
    )
}
