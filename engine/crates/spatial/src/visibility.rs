use std::collections::BTreeSet;

use entities::{CharacterArena, CharacterId, Position};

use crate::error::MapError;
use crate::world::{MapEvent, SectorSlot, WorldMap};
use crate::{PacketSink, ViewEncoder};

impl WorldMap {
    /// Place a character into the world at its current position and run the
    /// visibility exchange against everything in its new 3x3 neighborhood.
    pub fn add_character(
        &mut self,
        arena: &mut CharacterArena,
        id: CharacterId,
        encoder: &impl ViewEncoder,
        sink: &mut impl PacketSink,
    ) -> Result<(), MapError> {
        let pos = arena.get(id).ok_or(MapError::NotPlaced(id))?.pos;
        let slot = self.slot_at(&pos);
        self.link(id, slot);
        self.on_change_sector(arena, id, None, Some(slot), encoder, sink);
        let next = self.region_at(&pos);
        self.on_change_region(arena, id, None, next, sink);
        Ok(())
    }

    /// Move a placed character. Sector transitions produce the minimal
    /// visibility diff; region transitions are checked on every move since
    /// the region overlay is tile-granular.
    pub fn move_character(
        &mut self,
        arena: &mut CharacterArena,
        id: CharacterId,
        new_pos: Position,
        encoder: &impl ViewEncoder,
        sink: &mut impl PacketSink,
    ) -> Result<(), MapError> {
        let placement = self.placements.get(&id).ok_or(MapError::NotPlaced(id))?;
        let old_slot = placement.sector;
        arena.get_mut(id).ok_or(MapError::NotPlaced(id))?.pos = new_pos;
        let new_slot = self.slot_at(&new_pos);
        if new_slot != old_slot {
            self.unlink(id);
            self.link(id, new_slot);
            self.on_change_sector(arena, id, Some(old_slot), Some(new_slot), encoder, sink);
        }
        let prev = self.region_of(id);
        let next = self.region_at(&new_pos);
        self.on_change_region(arena, id, prev, next, sink);
        Ok(())
    }

    /// Take a character out of the world: removes flow both ways across its
    /// whole neighborhood, and any region presence is torn down.
    pub fn remove_character(
        &mut self,
        arena: &mut CharacterArena,
        id: CharacterId,
        encoder: &impl ViewEncoder,
        sink: &mut impl PacketSink,
    ) -> Result<(), MapError> {
        let old_slot = self.unlink(id).ok_or(MapError::NotPlaced(id))?;
        self.on_change_sector(arena, id, Some(old_slot), None, encoder, sink);
        let prev = self.region_of(id);
        self.on_change_region(arena, id, prev, None, sink);
        Ok(())
    }

    /// Toggle stealth in place. Turning it on erases the character from
    /// nearby clients; turning it off announces it. No-op for npcs' own
    /// traffic, but their visibility to players still changes.
    pub fn set_stealthed(
        &mut self,
        arena: &mut CharacterArena,
        id: CharacterId,
        stealthed: bool,
        encoder: &impl ViewEncoder,
        sink: &mut impl PacketSink,
    ) -> Result<(), MapError> {
        let placement = self.placements.get(&id).ok_or(MapError::NotPlaced(id))?;
        let slot = placement.sector;
        {
            let character = arena.get_mut(id).ok_or(MapError::NotPlaced(id))?;
            if character.stealthed == stealthed {
                return Ok(());
            }
            character.stealthed = stealthed;
        }
        let subject = arena.get(id).ok_or(MapError::NotPlaced(id))?;
        let packet = if stealthed {
            encoder.character_remove(id)
        } else {
            encoder.character_view(id, subject)
        };
        for neighbor in self.neighborhood(slot) {
            for &other in &self.sectors[neighbor].characters {
                if other == id {
                    continue;
                }
                let Some(other_ch) = arena.get(other) else {
                    continue;
                };
                if other_ch.instance_id != subject.instance_id {
                    continue;
                }
                if let Some(connection) = other_ch.connection() {
                    sink.send(connection, &packet);
                }
            }
        }
        Ok(())
    }

    /// The sector-neighborhood diff. Every sector leaving the mover's view
    /// produces removes in both directions before any sector entering the
    /// view produces adds; a client that processes packets in order never
    /// holds two copies of the same entity. Removes ignore stealth so a
    /// previously visible entity is always torn down; adds are suppressed
    /// for whichever side is stealthed.
    fn on_change_sector(
        &mut self,
        arena: &CharacterArena,
        mover: CharacterId,
        old: Option<SectorSlot>,
        new: Option<SectorSlot>,
        encoder: &impl ViewEncoder,
        sink: &mut impl PacketSink,
    ) {
        let Some(mover_ch) = arena.get(mover) else {
            return;
        };
        let mover_conn = mover_ch.connection();
        let old_view: BTreeSet<SectorSlot> = old
            .map(|s| self.neighborhood(s))
            .unwrap_or_default()
            .into_iter()
            .collect();
        let new_view: BTreeSet<SectorSlot> = new
            .map(|s| self.neighborhood(s))
            .unwrap_or_default()
            .into_iter()
            .collect();

        for &slot in old_view.difference(&new_view) {
            for &other in &self.sectors[slot].characters {
                if other == mover {
                    continue;
                }
                let Some(other_ch) = arena.get(other) else {
                    continue;
                };
                if other_ch.instance_id != mover_ch.instance_id {
                    continue;
                }
                if let Some(connection) = mover_conn {
                    sink.send(connection, &encoder.character_remove(other));
                }
                if let Some(connection) = other_ch.connection() {
                    sink.send(connection, &encoder.character_remove(mover));
                }
            }
            if let Some(connection) = mover_conn {
                for &drop_id in &self.sectors[slot].drops {
                    if let Some(item) = self.get_drop(drop_id) {
                        sink.send(connection, &encoder.drop_remove(drop_id, item));
                    }
                }
            }
        }

        for &slot in new_view.difference(&old_view) {
            for &other in &self.sectors[slot].characters {
                if other == mover {
                    continue;
                }
                let Some(other_ch) = arena.get(other) else {
                    continue;
                };
                if other_ch.instance_id != mover_ch.instance_id {
                    continue;
                }
                if let Some(connection) = mover_conn {
                    if !other_ch.stealthed {
                        sink.send(connection, &encoder.character_view(other, other_ch));
                    }
                }
                if let Some(connection) = other_ch.connection() {
                    if !mover_ch.stealthed {
                        sink.send(connection, &encoder.character_view(mover, mover_ch));
                    }
                }
            }
            if let Some(connection) = mover_conn {
                for &drop_id in &self.sectors[slot].drops {
                    if let Some(item) = self.get_drop(drop_id) {
                        sink.send(connection, &encoder.drop_view(drop_id, item));
                    }
                }
            }
        }

        if mover_ch.is_player() {
            if let Some(index) = old.and_then(|s| self.sectors[s].index) {
                self.events.push(MapEvent::LeftSector {
                    character: mover,
                    sector: index,
                });
            }
            if let Some(index) = new.and_then(|s| self.sectors[s].index) {
                self.events.push(MapEvent::EnteredSector {
                    character: mover,
                    sector: index,
                });
            }
            for &slot in old_view.difference(&new_view) {
                if let Some(index) = self.sectors[slot].index {
                    self.events.push(MapEvent::SectorViewLost {
                        character: mover,
                        sector: index,
                    });
                }
            }
            for &slot in new_view.difference(&old_view) {
                if let Some(index) = self.sectors[slot].index {
                    self.events.push(MapEvent::SectorViewGained {
                        character: mover,
                        sector: index,
                    });
                }
            }
        }
    }

    /// Characters currently visible to a viewer: same instance, not
    /// stealthed, within the viewer's 3x3 neighborhood.
    pub fn visible_characters(
        &self,
        arena: &CharacterArena,
        viewer: CharacterId,
    ) -> Result<Vec<CharacterId>, MapError> {
        let placement = self
            .placements
            .get(&viewer)
            .ok_or(MapError::NotPlaced(viewer))?;
        let viewer_ch = arena.get(viewer).ok_or(MapError::NotPlaced(viewer))?;
        let mut out = Vec::new();
        for slot in self.neighborhood(placement.sector) {
            for &other in &self.sectors[slot].characters {
                if other == viewer {
                    continue;
                }
                let Some(other_ch) = arena.get(other) else {
                    continue;
                };
                if other_ch.instance_id == viewer_ch.instance_id && !other_ch.stealthed {
                    out.push(other);
                }
            }
        }
        Ok(out)
    }

    /// Drops within a viewer's neighborhood. Drops carry no instance.
    pub fn visible_drops(&self, viewer: CharacterId) -> Result<Vec<crate::DropId>, MapError> {
        let placement = self
            .placements
            .get(&viewer)
            .ok_or(MapError::NotPlaced(viewer))?;
        let mut out = Vec::new();
        for slot in self.neighborhood(placement.sector) {
            out.extend_from_slice(&self.sectors[slot].drops);
        }
        Ok(out)
    }

    /// Send one packet to every player in the source's neighborhood sharing
    /// its instance, the source included. The usual path for chat, emotes
    /// and combat results.
    pub fn broadcast(
        &self,
        arena: &CharacterArena,
        from: CharacterId,
        packet: &[u8],
        sink: &mut impl PacketSink,
    ) -> Result<(), MapError> {
        let placement = self.placements.get(&from).ok_or(MapError::NotPlaced(from))?;
        let from_ch = arena.get(from).ok_or(MapError::NotPlaced(from))?;
        for slot in self.neighborhood(placement.sector) {
            for &id in &self.sectors[slot].characters {
                let Some(character) = arena.get(id) else {
                    continue;
                };
                if character.instance_id != from_ch.instance_id {
                    continue;
                }
                if let Some(connection) = character.connection() {
                    sink.send(connection, packet);
                }
            }
        }
        Ok(())
    }
}
