use std::collections::BTreeSet;

use entities::{Character, CharacterArena, CharacterId, Position};

use crate::tile::TileInfo;
use crate::world::WorldMap;

impl WorldMap {
    /// Terrain info for the tile containing a position. Out-of-world
    /// positions resolve to the void sector's blocking tile.
    pub fn tile_at(&self, pos: &Position) -> TileInfo {
        self.segment_at(pos).tile
    }

    /// Every character in the sector neighborhood around a position, with
    /// no distance cut. The cheap pre-filter for aggro and spawn scans.
    pub fn characters_near(
        &self,
        arena: &CharacterArena,
        center: &Position,
        mut filter: impl FnMut(CharacterId, &Character) -> bool,
    ) -> Vec<CharacterId> {
        let mut out = Vec::new();
        let slot = self.slot_at(center);
        for neighbor in self.neighborhood(slot) {
            for &id in &self.sectors[neighbor].characters {
                let Some(character) = arena.get(id) else {
                    continue;
                };
                if filter(id, character) {
                    out.push(id);
                }
            }
        }
        out
    }

    /// Whether two placed characters sit within each other's 3x3 sector
    /// view. False when either is absent or in the void sector.
    pub fn in_field_of_vision(&self, a: CharacterId, b: CharacterId) -> bool {
        let (Some(sa), Some(sb)) = (self.sector_of(a), self.sector_of(b)) else {
            return false;
        };
        sa.x.abs_diff(sb.x) <= 1 && sa.z.abs_diff(sb.z) <= 1
    }

    /// Characters within `radius` of `center`, restricted to the sector
    /// neighborhood around the center. Candidates farther than one sector
    /// width outside the neighborhood are never considered, so callers keep
    /// radii at or below the sector width.
    pub fn characters_in_radius(
        &self,
        arena: &CharacterArena,
        center: &Position,
        radius: f32,
        mut filter: impl FnMut(CharacterId, &Character) -> bool,
    ) -> Vec<CharacterId> {
        let mut out = Vec::new();
        let slot = self.slot_at(center);
        for neighbor in self.neighborhood(slot) {
            for &id in &self.sectors[neighbor].characters {
                let Some(character) = arena.get(id) else {
                    continue;
                };
                if character.pos.distance_2d(center) <= radius && filter(id, character) {
                    out.push(id);
                }
            }
        }
        out
    }

    /// Characters inside the oriented rectangle on the x/z plane that
    /// extends `length` from `origin` along `direction` and spans `width`
    /// across it. Projectile and beam skills. The search space is the
    /// union of the sector neighborhoods around both ends; a degenerate
    /// direction or non-positive extent hits nothing.
    pub fn characters_in_line(
        &self,
        arena: &CharacterArena,
        origin: &Position,
        direction: &Position,
        width: f32,
        length: f32,
        mut filter: impl FnMut(CharacterId, &Character) -> bool,
    ) -> Vec<CharacterId> {
        let dir_len = (direction.x * direction.x + direction.z * direction.z).sqrt();
        if dir_len <= f32::EPSILON || length <= 0.0 || width <= 0.0 {
            return Vec::new();
        }
        let ux = direction.x / dir_len;
        let uz = direction.z / dir_len;
        let end = Position::new(origin.x + ux * length, origin.y, origin.z + uz * length);
        let half_width = width * 0.5;

        let mut slots: BTreeSet<usize> = BTreeSet::new();
        slots.extend(self.neighborhood(self.slot_at(origin)));
        slots.extend(self.neighborhood(self.slot_at(&end)));
        let mut out = Vec::new();
        for slot in slots {
            for &id in &self.sectors[slot].characters {
                let Some(character) = arena.get(id) else {
                    continue;
                };
                let dx = character.pos.x - origin.x;
                let dz = character.pos.z - origin.z;
                let along = dx * ux + dz * uz;
                let across = dz * ux - dx * uz;
                if (0.0..=length).contains(&along)
                    && across.abs() <= half_width
                    && filter(id, character)
                {
                    out.push(id);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entities::CharacterKind;

    use crate::region::RegionTable;
    use crate::sector::WorldBounds;
    use crate::tile::geometry_block;

    fn world() -> WorldMap {
        let bounds = WorldBounds {
            sector_count_x: 16,
            sector_count_z: 16,
            origin_x: 0.0,
            origin_z: 0.0,
            sector_width: 100.0,
        };
        WorldMap::new(bounds, RegionTable::empty()).unwrap()
    }

    fn place(world: &mut WorldMap, arena: &mut CharacterArena, x: f32, z: f32) -> CharacterId {
        let id = arena.spawn(Character::new(
            "mob",
            CharacterKind::Monster,
            Position::new(x, 0.0, z),
        ));
        let encoder = crate::testutil::TagEncoder;
        let mut sink = crate::testutil::RecordingSink::default();
        world.add_character(arena, id, &encoder, &mut sink).unwrap();
        id
    }

    #[test]
    fn near_query_collects_the_whole_neighborhood() {
        let mut w = world();
        let mut arena = CharacterArena::new();
        let same = place(&mut w, &mut arena, 510.0, 500.0);
        let adjacent = place(&mut w, &mut arena, 650.0, 500.0);
        let distant = place(&mut w, &mut arena, 850.0, 500.0);

        let center = Position::new(500.0, 0.0, 500.0);
        let hits = w.characters_near(&arena, &center, |_, _| true);
        assert!(hits.contains(&same) && hits.contains(&adjacent));
        assert!(!hits.contains(&distant));
    }

    #[test]
    fn field_of_vision_is_one_sector_wide() {
        let mut w = world();
        let mut arena = CharacterArena::new();
        let a = place(&mut w, &mut arena, 550.0, 550.0);
        let b = place(&mut w, &mut arena, 650.0, 650.0);
        let c = place(&mut w, &mut arena, 850.0, 550.0);

        assert!(w.in_field_of_vision(a, b));
        assert!(w.in_field_of_vision(b, a));
        assert!(!w.in_field_of_vision(a, c));

        // A character in the void sector sees nothing and is seen by nothing.
        w.move_character(
            &mut arena,
            b,
            Position::new(-10.0, 0.0, 550.0),
            &crate::testutil::TagEncoder,
            &mut crate::testutil::RecordingSink::default(),
        )
        .unwrap();
        assert!(!w.in_field_of_vision(a, b));
    }

    #[test]
    fn radius_query_includes_and_excludes() {
        let mut w = world();
        let mut arena = CharacterArena::new();
        let near = place(&mut w, &mut arena, 510.0, 500.0);
        let far = place(&mut w, &mut arena, 560.0, 500.0);

        let center = Position::new(500.0, 0.0, 500.0);
        let hits = w.characters_in_radius(&arena, &center, 20.0, |_, _| true);
        assert_eq!(hits, vec![near]);

        let hits = w.characters_in_radius(&arena, &center, 100.0, |_, _| true);
        assert!(hits.contains(&near) && hits.contains(&far));
    }

    #[test]
    fn radius_query_honors_filter() {
        let mut w = world();
        let mut arena = CharacterArena::new();
        let a = place(&mut w, &mut arena, 510.0, 500.0);
        let b = place(&mut w, &mut arena, 515.0, 500.0);

        let center = Position::new(500.0, 0.0, 500.0);
        let hits = w.characters_in_radius(&arena, &center, 50.0, |id, _| id != a);
        assert_eq!(hits, vec![b]);
    }

    #[test]
    fn line_query_hits_inside_the_rectangle() {
        let mut w = world();
        let mut arena = CharacterArena::new();
        let on_path = place(&mut w, &mut arena, 550.0, 503.0);
        let too_wide = place(&mut w, &mut arena, 550.0, 540.0);
        let behind = place(&mut w, &mut arena, 480.0, 500.0);
        let beyond = place(&mut w, &mut arena, 620.0, 500.0);

        let origin = Position::new(500.0, 0.0, 500.0);
        let east = Position::new(1.0, 0.0, 0.0);
        let hits = w.characters_in_line(&arena, &origin, &east, 10.0, 100.0, |_, _| true);
        assert_eq!(hits, vec![on_path]);
        let _ = (too_wide, behind, beyond);
    }

    #[test]
    fn line_query_direction_need_not_be_normalized() {
        let mut w = world();
        let mut arena = CharacterArena::new();
        let target = place(&mut w, &mut arena, 550.0, 548.0);

        let origin = Position::new(500.0, 0.0, 500.0);
        // Diagonal, deliberately unnormalized.
        let diagonal = Position::new(3.0, 0.0, 3.0);
        let hits = w.characters_in_line(&arena, &origin, &diagonal, 10.0, 100.0, |_, _| true);
        assert_eq!(hits, vec![target]);

        let degenerate = Position::new(0.0, 0.0, 0.0);
        assert!(w
            .characters_in_line(&arena, &origin, &degenerate, 10.0, 100.0, |_, _| true)
            .is_empty());
    }

    #[test]
    fn line_query_spans_sector_boundaries() {
        let mut w = world();
        let mut arena = CharacterArena::new();
        // Target two sectors east of the shooter.
        let target = place(&mut w, &mut arena, 780.0, 500.0);

        let origin = Position::new(550.0, 0.0, 500.0);
        let east = Position::new(1.0, 0.0, 0.0);
        let hits = w.characters_in_line(&arena, &origin, &east, 10.0, 240.0, |_, _| true);
        assert_eq!(hits, vec![target]);
    }

    #[test]
    fn tile_at_reflects_world_edits() {
        let mut w = world();
        let pos = Position::new(123.0, 0.0, 456.0);
        assert!(!w.tile_at(&pos).blocks_ground());

        w.set_tile_at(
            &pos,
            TileInfo {
                geometry_block: geometry_block::GROUND,
                ..TileInfo::default()
            },
        );
        assert!(w.tile_at(&pos).blocks_ground());
        // Neighboring tile is untouched.
        assert!(!w.tile_at(&Position::new(123.0, 0.0, 470.0)).blocks_ground());
    }

    #[test]
    fn tile_at_out_of_world_blocks() {
        let w = world();
        assert!(w.tile_at(&Position::new(-5.0, 0.0, 0.0)).blocks_ground());
    }
}
