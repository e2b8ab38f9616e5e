use entities::{CharacterArena, CharacterId, Position};
use serde::{Deserialize, Serialize};

use crate::error::MapError;
use crate::world::WorldMap;
use crate::{PacketSink, ViewEncoder};

pub const MAX_REGION_COUNT: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub u16);

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyClass {
    /// Open ground, combat allowed.
    #[default]
    Free,
    /// Combat-free zone. Players entering one bind it as their return point.
    Safe,
    /// Hostile ground. No return-point binding on entry.
    Danger,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionTemplate {
    pub id: u16,
    pub name: String,
    #[serde(default)]
    pub safety: SafetyClass,
    /// Minimum character level to enter; 0 means unrestricted.
    #[serde(default)]
    pub level_limit: u32,
}

/// A static npc anchored to a region, with its presence packets encoded
/// once at registration so region transitions never touch the encoder.
#[derive(Debug)]
struct RegionNpc {
    id: CharacterId,
    view_packet: Vec<u8>,
    remove_packet: Vec<u8>,
}

#[derive(Debug)]
struct Region {
    template: RegionTemplate,
    npcs: Vec<RegionNpc>,
}

/// Region definitions keyed by id, loaded once from world data.
#[derive(Debug)]
pub struct RegionTable {
    slots: Vec<Option<Region>>,
}

impl RegionTable {
    pub fn empty() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn load(templates: Vec<RegionTemplate>) -> Result<Self, MapError> {
        let mut slots: Vec<Option<Region>> = Vec::new();
        for template in templates {
            let index = template.id as usize;
            if index >= MAX_REGION_COUNT {
                return Err(MapError::RegionIdOutOfRange(template.id));
            }
            if slots.len() <= index {
                slots.resize_with(index + 1, || None);
            }
            if slots[index].is_some() {
                return Err(MapError::DuplicateRegionId(template.id));
            }
            slots[index] = Some(Region {
                template,
                npcs: Vec::new(),
            });
        }
        Ok(Self { slots })
    }

    pub fn template(&self, id: RegionId) -> Option<&RegionTemplate> {
        self.get(id).map(|r| &r.template)
    }

    fn get(&self, id: RegionId) -> Option<&Region> {
        self.slots.get(id.0 as usize)?.as_ref()
    }

    fn get_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.slots.get_mut(id.0 as usize)?.as_mut()
    }
}

impl WorldMap {
    /// The region overlay at a position, if any.
    pub fn region_at(&self, pos: &Position) -> Option<RegionId> {
        self.segment_at(pos).region_id
    }

    pub fn region_of(&self, id: CharacterId) -> Option<RegionId> {
        self.char_regions.get(&id).copied()
    }

    /// Anchor a static npc to the region under its feet and cache its
    /// presence packets. Fails if the npc stands on unregioned ground.
    pub fn register_static_npc(
        &mut self,
        arena: &CharacterArena,
        id: CharacterId,
        encoder: &impl ViewEncoder,
    ) -> Result<RegionId, MapError> {
        let character = arena.get(id).ok_or(MapError::NotPlaced(id))?;
        let region_id = self
            .region_at(&character.pos)
            .ok_or_else(|| MapError::NoRegionAtNpcPosition {
                name: character.name.clone(),
            })?;
        let npc = RegionNpc {
            id,
            view_packet: encoder.character_view(id, character),
            remove_packet: encoder.character_remove(id),
        };
        match self.regions.get_mut(region_id) {
            Some(region) => region.npcs.push(npc),
            None => return Err(MapError::RegionIdOutOfRange(region_id.0)),
        }
        Ok(region_id)
    }

    /// Region transition for one character. Only players receive the cached
    /// npc packets; removes for the region left are flushed before views for
    /// the region entered. Entering a safe region rebinds the character's
    /// return region.
    pub(crate) fn on_change_region(
        &mut self,
        arena: &mut CharacterArena,
        id: CharacterId,
        prev: Option<RegionId>,
        next: Option<RegionId>,
        sink: &mut impl PacketSink,
    ) {
        if prev == next {
            return;
        }
        match next {
            Some(region) => self.char_regions.insert(id, region),
            None => self.char_regions.remove(&id),
        };
        let Some(character) = arena.get_mut(id) else {
            return;
        };
        let Some(connection) = character.connection() else {
            return;
        };
        if let Some(region) = prev.and_then(|r| self.regions.get(r)) {
            for npc in &region.npcs {
                if npc.id != id {
                    sink.send(connection, &npc.remove_packet);
                }
            }
        }
        if let Some(region) = next.and_then(|r| self.regions.get(r)) {
            for npc in &region.npcs {
                if npc.id != id {
                    sink.send(connection, &npc.view_packet);
                }
            }
            if region.template.safety == SafetyClass::Safe {
                character.bound_region_id = Some(region.template.id);
            }
        }
        tracing::debug!(character = %id, ?prev, ?next, "region change");
    }

    /// Resend one player's complete current view: every visible character
    /// and drop in its neighborhood plus its region's npc presences. Used
    /// when a client re-attaches to a character that never left the world.
    pub fn replay_views(
        &self,
        arena: &CharacterArena,
        viewer: CharacterId,
        encoder: &impl ViewEncoder,
        sink: &mut impl PacketSink,
    ) -> Result<(), MapError> {
        let placement = self
            .placements
            .get(&viewer)
            .ok_or(MapError::NotPlaced(viewer))?;
        let viewer_ch = arena.get(viewer).ok_or(MapError::NotPlaced(viewer))?;
        let Some(connection) = viewer_ch.connection() else {
            return Ok(());
        };
        for slot in self.neighborhood(placement.sector) {
            for &other in &self.sectors[slot].characters {
                if other == viewer {
                    continue;
                }
                let Some(other_ch) = arena.get(other) else {
                    continue;
                };
                if other_ch.instance_id != viewer_ch.instance_id || other_ch.stealthed {
                    continue;
                }
                sink.send(connection, &encoder.character_view(other, other_ch));
            }
            for &drop_id in &self.sectors[slot].drops {
                if let Some(item) = self.get_drop(drop_id) {
                    sink.send(connection, &encoder.drop_view(drop_id, item));
                }
            }
        }
        if let Some(region) = self.region_of(viewer).and_then(|r| self.regions.get(r)) {
            for npc in &region.npcs {
                if npc.id != viewer {
                    sink.send(connection, &npc.view_packet);
                }
            }
        }
        Ok(())
    }

    /// Push one packet to every player whose sector neighborhood covers the
    /// given position. Used for localized announcements that are not tied
    /// to any one character's visibility.
    pub fn inform_nearby(
        &self,
        arena: &CharacterArena,
        center: &Position,
        packet: &[u8],
        sink: &mut impl PacketSink,
    ) {
        let slot = self.slot_at(center);
        for neighbor in self.neighborhood(slot) {
            for &id in &self.sectors[neighbor].characters {
                let Some(character) = arena.get(id) else {
                    continue;
                };
                if let Some(connection) = character.connection() {
                    sink.send(connection, packet);
                }
            }
        }
    }
}
