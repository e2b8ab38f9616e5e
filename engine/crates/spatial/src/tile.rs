use serde::{Deserialize, Serialize};

use crate::region::RegionId;

/// Tiles per sector edge; every sector is a 16x16 grid of segments.
pub const SECTOR_TILE_DEPTH: u32 = 16;

/// Geometry blocking bits carried by a tile.
pub mod geometry_block {
    pub const NONE: u8 = 0;
    pub const GROUND: u8 = 1 << 0;
    pub const SKY: u8 = 1 << 1;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileInfo {
    pub tile_type: u8,
    pub geometry_block: u8,
    pub is_edge_turn: bool,
    pub has_no_layer: bool,
}

impl TileInfo {
    pub fn blocks_ground(&self) -> bool {
        self.geometry_block & geometry_block::GROUND != 0
    }

    /// Tile used for every segment of the void sector.
    pub fn fully_blocking() -> Self {
        Self {
            geometry_block: geometry_block::GROUND | geometry_block::SKY,
            ..Self::default()
        }
    }
}

/// One tile of a sector: terrain info plus the region overlay id, which is
/// segment-granular and independent of sector boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Segment {
    pub tile: TileInfo,
    pub region_id: Option<RegionId>,
}
