use entities::{CharacterArena, CharacterId, Position};
use serde::{Deserialize, Serialize};

use crate::sector::SectorIndex;
use crate::world::{SectorSlot, WorldMap};
use crate::{PacketSink, ViewEncoder};

/// How long a drop stays reserved for its owner before anyone may take it.
pub const DEFAULT_OWNERSHIP_WINDOW_MS: u64 = 30_000;

/// Ledger index of a live drop. Slots are recycled without a generation
/// tag; a stale id can at worst resolve to a different live drop, and the
/// pickup path re-validates position and ownership anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DropId(pub u32);

impl std::fmt::Display for DropId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "drop#{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDrop {
    pub item_id: u32,
    pub quantity: u16,
    pub pos: Position,
    /// Killer or original holder; None for world spawns, free for all.
    pub owner: Option<CharacterId>,
    /// Set when the drop enters the world.
    pub ownership_expires_at: u64,
    /// Despawn deadline in world time.
    pub expires_at: u64,
}

impl ItemDrop {
    pub fn claimable_by(&self, who: CharacterId, now_ms: u64) -> bool {
        match self.owner {
            None => true,
            Some(owner) => owner == who || now_ms >= self.ownership_expires_at,
        }
    }
}

#[derive(Debug)]
struct StoredDrop {
    item: ItemDrop,
    sector: SectorSlot,
    /// Index into the sector's drop list, kept valid across swap-removes.
    list_slot: usize,
}

#[derive(Debug, Default)]
pub(crate) struct DropArena {
    slots: Vec<Option<StoredDrop>>,
    free: Vec<u32>,
    live: Vec<DropId>,
}

impl DropArena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, stored: StoredDrop) -> DropId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(stored);
                let id = DropId(index);
                self.live.push(id);
                id
            }
            None => {
                let id = DropId(self.slots.len() as u32);
                self.slots.push(Some(stored));
                self.live.push(id);
                id
            }
        }
    }

    fn remove(&mut self, id: DropId) -> Option<StoredDrop> {
        let stored = self.slots.get_mut(id.0 as usize)?.take()?;
        self.free.push(id.0);
        if let Some(pos) = self.live.iter().position(|&d| d == id) {
            self.live.swap_remove(pos);
        }
        Some(stored)
    }

    fn get(&self, id: DropId) -> Option<&StoredDrop> {
        self.slots.get(id.0 as usize)?.as_ref()
    }

    fn get_mut(&mut self, id: DropId) -> Option<&mut StoredDrop> {
        self.slots.get_mut(id.0 as usize)?.as_mut()
    }

    pub(crate) fn len(&self) -> usize {
        self.live.len()
    }
}

impl WorldMap {
    /// Place a drop into the world and announce it to every player whose
    /// view covers its sector. Ownership reservation starts now.
    pub fn add_drop(
        &mut self,
        mut drop: ItemDrop,
        now_ms: u64,
        arena: &CharacterArena,
        encoder: &impl ViewEncoder,
        sink: &mut impl PacketSink,
    ) -> DropId {
        drop.ownership_expires_at = now_ms + self.ownership_window_ms;
        let sector = self.slot_at(&drop.pos);
        let pos = drop.pos;
        let list_slot = self.sectors[sector].drops.len();
        let id = self.drops.insert(StoredDrop {
            item: drop,
            sector,
            list_slot,
        });
        self.sectors[sector].drops.push(id);
        // Announce after insertion so the encoder sees the final state.
        if let Some(item) = self.get_drop(id) {
            let packet = encoder.drop_view(id, item);
            self.inform_nearby(arena, &pos, &packet, sink);
        }
        id
    }

    pub fn get_drop(&self, id: DropId) -> Option<&ItemDrop> {
        self.drops.get(id).map(|stored| &stored.item)
    }

    /// First drop of the given item within the neighborhood of a position.
    pub fn find_drop(&self, center: &Position, item_id: u32) -> Option<DropId> {
        let slot = self.slot_at(center);
        for neighbor in self.neighborhood(slot) {
            for &id in &self.sectors[neighbor].drops {
                if self.get_drop(id).is_some_and(|item| item.item_id == item_id) {
                    return Some(id);
                }
            }
        }
        None
    }

    pub fn drop_count(&self) -> usize {
        self.drops.len()
    }

    pub fn drops_in_sector(&self, index: SectorIndex) -> &[DropId] {
        match self.grid_slot(index) {
            Some(slot) => &self.sectors[slot].drops,
            None => &[],
        }
    }

    /// Pickup path. Fails (returning None, sending nothing) when the drop
    /// is gone or still reserved for someone else.
    pub fn claim_drop(
        &mut self,
        id: DropId,
        who: CharacterId,
        now_ms: u64,
        arena: &CharacterArena,
        encoder: &impl ViewEncoder,
        sink: &mut impl PacketSink,
    ) -> Option<ItemDrop> {
        if !self.get_drop(id)?.claimable_by(who, now_ms) {
            return None;
        }
        self.remove_drop(id, arena, encoder, sink)
    }

    /// Unlink a drop and announce its removal to nearby players.
    pub fn remove_drop(
        &mut self,
        id: DropId,
        arena: &CharacterArena,
        encoder: &impl ViewEncoder,
        sink: &mut impl PacketSink,
    ) -> Option<ItemDrop> {
        let stored = self.drops.remove(id)?;
        let sector = &mut self.sectors[stored.sector];
        debug_assert_eq!(sector.drops.get(stored.list_slot), Some(&id));
        sector.drops.swap_remove(stored.list_slot);
        if let Some(&moved) = sector.drops.get(stored.list_slot) {
            if let Some(moved_stored) = self.drops.get_mut(moved) {
                moved_stored.list_slot = stored.list_slot;
            }
        }
        let packet = encoder.drop_remove(id, &stored.item);
        self.inform_nearby(arena, &stored.item.pos, &packet, sink);
        Some(stored.item)
    }

    /// Despawn every drop past its deadline. Called once per frame.
    pub fn sweep_expired_drops(
        &mut self,
        now_ms: u64,
        arena: &CharacterArena,
        encoder: &impl ViewEncoder,
        sink: &mut impl PacketSink,
    ) -> usize {
        let expired: Vec<DropId> = self
            .drops
            .live
            .iter()
            .copied()
            .filter(|&id| {
                self.drops
                    .get(id)
                    .is_some_and(|stored| now_ms >= stored.item.expires_at)
            })
            .collect();
        for &id in &expired {
            self.remove_drop(id, arena, encoder, sink);
        }
        if !expired.is_empty() {
            tracing::debug!(count = expired.len(), "swept expired drops");
        }
        expired.len()
    }
}
