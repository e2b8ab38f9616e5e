use entities::{Character, CharacterId};
use serde::{Deserialize, Serialize};
use spatial::{DropId, ItemDrop, ViewEncoder};

/// Client-to-server message, bincode inside a length-prefixed frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientPacket {
    /// Enter the world under a name.
    Join { name: String },
    /// Absolute move to a position.
    Move { x: f32, y: f32, z: f32 },
    /// Local chat, relayed to the sender's neighborhood.
    Say { text: String },
    /// Place an item from the inventory on the ground.
    DropItem { item_id: u32, quantity: u16 },
    /// Pick up a drop by id.
    Pickup { drop_id: u32 },
    Ping,
}

/// Server-to-client message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorldPacket {
    Welcome {
        character_id: u64,
    },
    CharacterView {
        id: u64,
        name: String,
        x: f32,
        y: f32,
        z: f32,
    },
    CharacterRemove {
        id: u64,
    },
    DropView {
        id: u32,
        item_id: u32,
        quantity: u16,
        x: f32,
        y: f32,
        z: f32,
    },
    DropRemove {
        id: u32,
    },
    PickupResult {
        drop_id: u32,
        item_id: u32,
        quantity: u16,
    },
    Chat {
        from: u64,
        name: String,
        text: String,
    },
    Error {
        message: String,
    },
    Pong,
}

/// Serialize a server packet. Encoding these enums cannot fail short of a
/// serializer bug; if it somehow does, an empty payload is sent and the
/// error is logged rather than taking the simulation thread down.
pub fn encode(packet: &WorldPacket) -> Vec<u8> {
    match bincode::serialize(packet) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode server packet");
            Vec::new()
        }
    }
}

pub fn decode(payload: &[u8]) -> Result<ClientPacket, bincode::Error> {
    bincode::deserialize(payload)
}

/// Client-side counterpart of [`encode`], used by test harnesses and the
/// reference client.
pub fn encode_client(packet: &ClientPacket) -> Vec<u8> {
    match bincode::serialize(packet) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode client packet");
            Vec::new()
        }
    }
}

/// The production encoder for visibility traffic.
#[derive(Debug, Default, Clone, Copy)]
pub struct WireEncoder;

impl ViewEncoder for WireEncoder {
    fn character_view(&self, id: CharacterId, character: &Character) -> Vec<u8> {
        encode(&WorldPacket::CharacterView {
            id: id.to_u64(),
            name: character.name.clone(),
            x: character.pos.x,
            y: character.pos.y,
            z: character.pos.z,
        })
    }

    fn character_remove(&self, id: CharacterId) -> Vec<u8> {
        encode(&WorldPacket::CharacterRemove { id: id.to_u64() })
    }

    fn drop_view(&self, id: DropId, drop: &ItemDrop) -> Vec<u8> {
        encode(&WorldPacket::DropView {
            id: id.0,
            item_id: drop.item_id,
            quantity: drop.quantity,
            x: drop.pos.x,
            y: drop.pos.y,
            z: drop.pos.z,
        })
    }

    fn drop_remove(&self, id: DropId, _drop: &ItemDrop) -> Vec<u8> {
        encode(&WorldPacket::DropRemove { id: id.0 })
    }
}
