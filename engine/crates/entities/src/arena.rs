use crate::character::Character;
use crate::types::CharacterId;

#[derive(Debug)]
struct Slot {
    generation: u32,
    character: Option<Character>,
}

/// Generational slot arena holding every character known to the simulation.
///
/// Sectors and schedulers hold `CharacterId`s, never references; a despawn
/// bumps the slot generation so every outstanding id goes stale at once.
#[derive(Debug, Default)]
pub struct CharacterArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl CharacterArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, character: Character) -> CharacterId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation += 1;
            slot.character = Some(character);
            CharacterId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                character: Some(character),
            });
            CharacterId::new(index, 0)
        }
    }

    /// Remove a character, returning it. A stale or unknown id yields None.
    pub fn despawn(&mut self, id: CharacterId) -> Option<Character> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation || slot.character.is_none() {
            return None;
        }
        let character = slot.character.take();
        self.free.push(id.index);
        character
    }

    pub fn get(&self, id: CharacterId) -> Option<&Character> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.character.as_ref()
    }

    pub fn get_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.character.as_mut()
    }

    pub fn contains(&self, id: CharacterId) -> bool {
        self.get(id).is_some()
    }

    /// Ids of all live characters, in slot order.
    pub fn live_ids(&self) -> Vec<CharacterId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CharacterId, &Character)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.character
                .as_ref()
                .map(|c| (CharacterId::new(i as u32, slot.generation), c))
        })
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.character.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{CharacterKind, Position};

    fn npc(name: &str) -> Character {
        Character::new(name, CharacterKind::Npc, Position::default())
    }

    #[test]
    fn spawn_returns_increasing_indices() {
        let mut arena = CharacterArena::new();
        let a = arena.spawn(npc("a"));
        let b = arena.spawn(npc("b"));
        assert_eq!(a, CharacterId::new(0, 0));
        assert_eq!(b, CharacterId::new(1, 0));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn despawn_and_reuse_bumps_generation() {
        let mut arena = CharacterArena::new();
        let a = arena.spawn(npc("a"));
        assert!(arena.despawn(a).is_some());
        assert!(!arena.contains(a));

        let b = arena.spawn(npc("b"));
        assert_eq!(b.index, a.index);
        assert_eq!(b.generation, a.generation + 1);
        assert!(arena.contains(b));
        // The stale id must not resolve to the new occupant.
        assert!(arena.get(a).is_none());
    }

    #[test]
    fn double_despawn_returns_none() {
        let mut arena = CharacterArena::new();
        let a = arena.spawn(npc("a"));
        assert!(arena.despawn(a).is_some());
        assert!(arena.despawn(a).is_none());
    }

    #[test]
    fn live_ids_skips_freed_slots() {
        let mut arena = CharacterArena::new();
        let a = arena.spawn(npc("a"));
        let b = arena.spawn(npc("b"));
        let c = arena.spawn(npc("c"));
        arena.despawn(b);

        let live = arena.live_ids();
        assert_eq!(live, vec![a, c]);
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut arena = CharacterArena::new();
        let a = arena.spawn(npc("a"));
        arena.get_mut(a).unwrap().pos = Position::new(1.0, 2.0, 3.0);
        assert_eq!(arena.get(a).unwrap().pos, Position::new(1.0, 2.0, 3.0));
    }
}
