use std::collections::BTreeMap;

use entities::{CharacterId, Position};

use crate::drops::{DropArena, DEFAULT_OWNERSHIP_WINDOW_MS};
use crate::error::MapError;
use crate::region::{RegionId, RegionTable};
use crate::sector::{Sector, SectorIndex, WorldBounds};
use crate::tile::{Segment, TileInfo, SECTOR_TILE_DEPTH};

/// Index into the sector vec. The slot one past the grid is the void sector.
pub(crate) type SectorSlot = usize;

/// Transition notifications for external subsystems (terrain streaming,
/// spawn control). Drained by the caller after each batch of moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapEvent {
    EnteredSector {
        character: CharacterId,
        sector: SectorIndex,
    },
    LeftSector {
        character: CharacterId,
        sector: SectorIndex,
    },
    /// The sector entered the character's 3x3 view.
    SectorViewGained {
        character: CharacterId,
        sector: SectorIndex,
    },
    /// The sector left the character's 3x3 view.
    SectorViewLost {
        character: CharacterId,
        sector: SectorIndex,
    },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Placement {
    pub sector: SectorSlot,
    /// Index into the sector's character list, kept valid across swap-removes.
    pub slot: usize,
}

/// The authoritative spatial state of one world: sector grid, occupancy,
/// region overlay and item-drop ledger. Owned by the single simulation
/// thread; all mutation goes through the operations defined on it.
pub struct WorldMap {
    pub(crate) bounds: WorldBounds,
    pub(crate) sectors: Vec<Sector>,
    pub(crate) void_slot: SectorSlot,
    pub(crate) placements: BTreeMap<CharacterId, Placement>,
    pub(crate) char_regions: BTreeMap<CharacterId, RegionId>,
    pub(crate) regions: RegionTable,
    pub(crate) drops: DropArena,
    pub(crate) events: Vec<MapEvent>,
    /// Window after a drop spawns during which only its owner may claim it.
    pub ownership_window_ms: u64,
}

impl WorldMap {
    pub fn new(bounds: WorldBounds, regions: RegionTable) -> Result<Self, MapError> {
        bounds.validate()?;
        let count = (bounds.sector_count_x * bounds.sector_count_z) as usize;
        let mut sectors = Vec::with_capacity(count + 1);
        for x in 0..bounds.sector_count_x {
            for z in 0..bounds.sector_count_z {
                let index = SectorIndex::new(x, z);
                let (bx, bz) = bounds.sector_begin(index);
                sectors.push(Sector::new(index, bx, bz));
            }
        }
        let void_slot = sectors.len();
        sectors.push(Sector::void());
        Ok(Self {
            bounds,
            sectors,
            void_slot,
            placements: BTreeMap::new(),
            char_regions: BTreeMap::new(),
            regions,
            drops: DropArena::new(),
            events: Vec::new(),
            ownership_window_ms: DEFAULT_OWNERSHIP_WINDOW_MS,
        })
    }

    pub fn bounds(&self) -> &WorldBounds {
        &self.bounds
    }

    /// The sector a character is currently linked into, None if not in the
    /// world (or linked into the void sector).
    pub fn sector_of(&self, id: CharacterId) -> Option<SectorIndex> {
        let placement = self.placements.get(&id)?;
        self.sectors[placement.sector].index
    }

    pub fn is_placed(&self, id: CharacterId) -> bool {
        self.placements.contains_key(&id)
    }

    pub fn characters_in_sector(&self, index: SectorIndex) -> &[CharacterId] {
        match self.grid_slot(index) {
            Some(slot) => &self.sectors[slot].characters,
            None => &[],
        }
    }

    /// Drain transition events accumulated since the last call.
    pub fn take_events(&mut self) -> Vec<MapEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn grid_slot(&self, index: SectorIndex) -> Option<SectorSlot> {
        if index.x >= self.bounds.sector_count_x || index.z >= self.bounds.sector_count_z {
            return None;
        }
        Some((index.x * self.bounds.sector_count_z + index.z) as usize)
    }

    /// Sector slot owning a position; the void slot for out-of-world input.
    pub(crate) fn slot_at(&self, pos: &Position) -> SectorSlot {
        match self.bounds.sector_index_at(pos) {
            Some(index) => (index.x * self.bounds.sector_count_z + index.z) as usize,
            None => self.void_slot,
        }
    }

    /// The 3x3 block of in-bounds sectors centered on a sector, self
    /// included. This is the visibility radius: one sector width in every
    /// direction. The void sector's neighborhood is empty.
    pub(crate) fn neighborhood(&self, slot: SectorSlot) -> Vec<SectorSlot> {
        let Some(center) = self.sectors[slot].index else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(9);
        for dx in -1i64..=1 {
            for dz in -1i64..=1 {
                let x = center.x as i64 + dx;
                let z = center.z as i64 + dz;
                if x < 0 || z < 0 {
                    continue;
                }
                if let Some(s) = self.grid_slot(SectorIndex::new(x as u32, z as u32)) {
                    out.push(s);
                }
            }
        }
        out
    }

    pub(crate) fn link(&mut self, id: CharacterId, slot: SectorSlot) {
        if self.placements.contains_key(&id) {
            debug_assert!(false, "character {id} linked twice");
            tracing::warn!(character = %id, "link ignored: already in a sector list");
            return;
        }
        let sector = &mut self.sectors[slot];
        let list_slot = sector.characters.len();
        sector.characters.push(id);
        self.placements.insert(
            id,
            Placement {
                sector: slot,
                slot: list_slot,
            },
        );
    }

    /// O(1) removal via swap-remove; the displaced tail entry's recorded
    /// slot is patched. Unlinking an absent character is tolerated.
    pub(crate) fn unlink(&mut self, id: CharacterId) -> Option<SectorSlot> {
        let Some(placement) = self.placements.remove(&id) else {
            debug_assert!(false, "character {id} unlinked while not placed");
            tracing::warn!(character = %id, "unlink ignored: not in any sector list");
            return None;
        };
        let sector = &mut self.sectors[placement.sector];
        debug_assert_eq!(sector.characters.get(placement.slot), Some(&id));
        sector.characters.swap_remove(placement.slot);
        if let Some(&moved) = sector.characters.get(placement.slot) {
            if let Some(moved_placement) = self.placements.get_mut(&moved) {
                moved_placement.slot = placement.slot;
            }
        }
        Some(placement.sector)
    }

    pub(crate) fn segment_at(&self, pos: &Position) -> &Segment {
        let slot = self.slot_at(pos);
        let sector = &self.sectors[slot];
        if sector.index.is_none() {
            return &sector.segments[0];
        }
        let step = self.bounds.tile_step();
        // Clamp for float rounding on the sector edge.
        let sx = (((pos.x - sector.begin_x) / step) as u32).min(SECTOR_TILE_DEPTH - 1);
        let sz = (((pos.z - sector.begin_z) / step) as u32).min(SECTOR_TILE_DEPTH - 1);
        &sector.segments[(sx * SECTOR_TILE_DEPTH + sz) as usize]
    }

    fn segment_at_mut(&mut self, pos: &Position) -> Option<&mut Segment> {
        let slot = self.slot_at(pos);
        if slot == self.void_slot {
            return None;
        }
        let step = self.bounds.tile_step();
        let sector = &mut self.sectors[slot];
        let sx = (((pos.x - sector.begin_x) / step) as u32).min(SECTOR_TILE_DEPTH - 1);
        let sz = (((pos.z - sector.begin_z) / step) as u32).min(SECTOR_TILE_DEPTH - 1);
        Some(&mut sector.segments[(sx * SECTOR_TILE_DEPTH + sz) as usize])
    }

    /// Set terrain info for the tile containing a position (world load).
    pub fn set_tile_at(&mut self, pos: &Position, tile: TileInfo) {
        if let Some(segment) = self.segment_at_mut(pos) {
            segment.tile = tile;
        }
    }

    /// Assign a region to the tile containing a position (world load).
    pub fn set_segment_region(&mut self, pos: &Position, region: RegionId) {
        if let Some(segment) = self.segment_at_mut(pos) {
            segment.region_id = Some(region);
        }
    }

    /// Paint every tile whose center falls inside the rectangle. Region
    /// definitions ship as world-space rects; the overlay itself stays
    /// tile-granular.
    pub fn set_region_rect(&mut self, min: &Position, max: &Position, region: RegionId) {
        let step = self.bounds.tile_step();
        let mut x = min.x + step * 0.5;
        while x < max.x {
            let mut z = min.z + step * 0.5;
            while z < max.z {
                self.set_segment_region(&Position::new(x, 0.0, z), region);
                z += step;
            }
            x += step;
        }
    }
}
