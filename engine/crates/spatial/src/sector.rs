use entities::{CharacterId, Position};
use serde::{Deserialize, Serialize};

use crate::drops::DropId;
use crate::error::MapError;
use crate::tile::{Segment, TileInfo, SECTOR_TILE_DEPTH};

/// Grid coordinates of a real sector. The void sector has no index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectorIndex {
    pub x: u32,
    pub z: u32,
}

impl SectorIndex {
    pub fn new(x: u32, z: u32) -> Self {
        Self { x, z }
    }
}

/// World extents and sector granularity, loaded once at startup and
/// read-only for the remainder of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldBounds {
    pub sector_count_x: u32,
    pub sector_count_z: u32,
    /// World-space coordinate of the west edge of sector (0, 0).
    pub origin_x: f32,
    /// World-space coordinate of the north edge of sector (0, 0).
    pub origin_z: f32,
    pub sector_width: f32,
}

impl Default for WorldBounds {
    fn default() -> Self {
        let count = 64u32;
        let width = 6400.0f32;
        Self {
            sector_count_x: count,
            sector_count_z: count,
            origin_x: -(count as f32 / 2.0) * width,
            origin_z: -(count as f32 / 2.0) * width,
            sector_width: width,
        }
    }
}

impl WorldBounds {
    pub fn validate(&self) -> Result<(), MapError> {
        if self.sector_count_x == 0 || self.sector_count_z == 0 || self.sector_width <= 0.0 {
            return Err(MapError::InvalidBounds {
                count_x: self.sector_count_x,
                count_z: self.sector_count_z,
                width: self.sector_width,
            });
        }
        Ok(())
    }

    /// Pure coordinate transform; None for positions outside the world.
    /// Non-finite coordinates count as outside, so a NaN from the wire
    /// lands in the void sector rather than sector (0, 0).
    pub fn sector_index_at(&self, pos: &Position) -> Option<SectorIndex> {
        let fx = (pos.x - self.origin_x) / self.sector_width;
        let fz = (pos.z - self.origin_z) / self.sector_width;
        if !fx.is_finite() || !fz.is_finite() || fx < 0.0 || fz < 0.0 {
            return None;
        }
        let x = fx as u32;
        let z = fz as u32;
        if x >= self.sector_count_x || z >= self.sector_count_z {
            return None;
        }
        Some(SectorIndex::new(x, z))
    }

    /// West/north corner of a sector in world space.
    pub fn sector_begin(&self, index: SectorIndex) -> (f32, f32) {
        (
            self.origin_x + index.x as f32 * self.sector_width,
            self.origin_z + index.z as f32 * self.sector_width,
        )
    }

    pub fn tile_step(&self) -> f32 {
        self.sector_width / SECTOR_TILE_DEPTH as f32
    }
}

/// One grid cell of the world. Occupancy lists hold arena ids; the matching
/// list slots are tracked per entity so removal is O(1) via swap-remove.
#[derive(Debug)]
pub(crate) struct Sector {
    /// None for the void sector.
    pub index: Option<SectorIndex>,
    pub begin_x: f32,
    pub begin_z: f32,
    pub segments: Vec<Segment>,
    pub characters: Vec<CharacterId>,
    pub drops: Vec<DropId>,
}

impl Sector {
    pub(crate) fn new(index: SectorIndex, begin_x: f32, begin_z: f32) -> Self {
        Self {
            index: Some(index),
            begin_x,
            begin_z,
            segments: vec![Segment::default(); (SECTOR_TILE_DEPTH * SECTOR_TILE_DEPTH) as usize],
            characters: Vec::new(),
            drops: Vec::new(),
        }
    }

    /// The void sector: fully blocking tiles, no neighbors, no region.
    pub(crate) fn void() -> Self {
        let segment = Segment {
            tile: TileInfo::fully_blocking(),
            region_id: None,
        };
        Self {
            index: None,
            begin_x: 0.0,
            begin_z: 0.0,
            segments: vec![segment; (SECTOR_TILE_DEPTH * SECTOR_TILE_DEPTH) as usize],
            characters: Vec::new(),
            drops: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> WorldBounds {
        WorldBounds {
            sector_count_x: 10,
            sector_count_z: 10,
            origin_x: 0.0,
            origin_z: 0.0,
            sector_width: 100.0,
        }
    }

    #[test]
    fn index_at_basic() {
        let b = bounds();
        assert_eq!(
            b.sector_index_at(&Position::new(0.0, 0.0, 0.0)),
            Some(SectorIndex::new(0, 0))
        );
        assert_eq!(
            b.sector_index_at(&Position::new(150.0, 0.0, 350.0)),
            Some(SectorIndex::new(1, 3))
        );
        assert_eq!(
            b.sector_index_at(&Position::new(999.9, 0.0, 999.9)),
            Some(SectorIndex::new(9, 9))
        );
    }

    #[test]
    fn index_at_out_of_bounds() {
        let b = bounds();
        assert_eq!(b.sector_index_at(&Position::new(-0.1, 0.0, 0.0)), None);
        assert_eq!(b.sector_index_at(&Position::new(0.0, 0.0, 1000.0)), None);
        assert_eq!(b.sector_index_at(&Position::new(5000.0, 0.0, 5000.0)), None);
    }

    #[test]
    fn index_at_rejects_non_finite_coordinates() {
        let b = bounds();
        assert_eq!(b.sector_index_at(&Position::new(f32::NAN, 0.0, 50.0)), None);
        assert_eq!(b.sector_index_at(&Position::new(50.0, 0.0, f32::NAN)), None);
        assert_eq!(
            b.sector_index_at(&Position::new(f32::INFINITY, 0.0, 50.0)),
            None
        );
        assert_eq!(
            b.sector_index_at(&Position::new(f32::NEG_INFINITY, 0.0, 50.0)),
            None
        );
    }

    #[test]
    fn index_at_negative_origin() {
        let b = WorldBounds {
            sector_count_x: 4,
            sector_count_z: 4,
            origin_x: -200.0,
            origin_z: -200.0,
            sector_width: 100.0,
        };
        assert_eq!(
            b.sector_index_at(&Position::new(-200.0, 0.0, -200.0)),
            Some(SectorIndex::new(0, 0))
        );
        assert_eq!(
            b.sector_index_at(&Position::new(-1.0, 0.0, -1.0)),
            Some(SectorIndex::new(1, 1))
        );
        assert_eq!(b.sector_index_at(&Position::new(-201.0, 0.0, 0.0)), None);
    }

    #[test]
    fn validate_rejects_degenerate_bounds() {
        let mut b = bounds();
        b.sector_count_x = 0;
        assert!(b.validate().is_err());

        let mut b = bounds();
        b.sector_width = 0.0;
        assert!(b.validate().is_err());

        assert!(bounds().validate().is_ok());
    }

    #[test]
    fn sector_begin_matches_index() {
        let b = bounds();
        assert_eq!(b.sector_begin(SectorIndex::new(2, 3)), (200.0, 300.0));
    }

    #[test]
    fn void_sector_blocks() {
        let void = Sector::void();
        assert!(void.index.is_none());
        assert!(void.segments.iter().all(|s| s.tile.blocks_ground()));
    }
}
