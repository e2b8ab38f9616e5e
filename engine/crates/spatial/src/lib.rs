mod drops;
mod error;
mod query;
mod region;
mod sector;
mod tile;
mod visibility;
mod world;

#[cfg(test)]
pub(crate) mod testutil;

pub use drops::{DropId, ItemDrop, DEFAULT_OWNERSHIP_WINDOW_MS};
pub use error::MapError;
pub use region::{RegionId, RegionTable, RegionTemplate, SafetyClass, MAX_REGION_COUNT};
pub use sector::{SectorIndex, WorldBounds};
pub use tile::{geometry_block, TileInfo, SECTOR_TILE_DEPTH};
pub use world::{MapEvent, WorldMap};

use entities::{Character, CharacterId, ConnectionId};

/// Outbound seam to the connection layer. Implementations must be
/// non-blocking enqueues; a connection that no longer exists is a no-op
/// send target, never an error.
pub trait PacketSink {
    fn send(&mut self, connection: ConnectionId, packet: &[u8]);
}

/// Collaborator that encodes the opaque payloads attached to visibility
/// transitions. The core never inspects the produced bytes.
pub trait ViewEncoder {
    fn character_view(&self, id: CharacterId, character: &Character) -> Vec<u8>;
    fn character_remove(&self, id: CharacterId) -> Vec<u8>;
    fn drop_view(&self, id: DropId, drop: &ItemDrop) -> Vec<u8>;
    fn drop_remove(&self, id: DropId, drop: &ItemDrop) -> Vec<u8>;
}
