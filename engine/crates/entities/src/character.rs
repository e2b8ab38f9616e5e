use serde::{Deserialize, Serialize};

use crate::types::ConnectionId;

/// World-space position. The grid is indexed on the x/z plane; y is carried
/// through for collaborators but never affects sector resolution.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Distance on the x/z plane, ignoring height.
    pub fn distance_2d(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterKind {
    /// Remote client; visibility packets are routed to its connection.
    Player { connection: ConnectionId },
    /// Static NPC bound to a region at registration.
    Npc,
    Monster,
}

#[derive(Debug, Clone)]
pub struct Character {
    pub name: String,
    pub kind: CharacterKind,
    pub pos: Position,
    /// A stealthed character's existence is never pushed to other clients,
    /// while it keeps receiving view updates about non-stealthed others.
    pub stealthed: bool,
    /// 0 means the shared world; any other value isolates visibility to
    /// characters carrying the same id (instanced dungeons).
    pub instance_id: u32,
    /// Respawn binding, updated when entering a safe region.
    pub bound_region_id: Option<u16>,
    /// Tick at which the scheduler last advanced this character.
    pub last_process_tick: u64,
}

impl Character {
    pub fn new(name: impl Into<String>, kind: CharacterKind, pos: Position) -> Self {
        Self {
            name: name.into(),
            kind,
            pos,
            stealthed: false,
            instance_id: 0,
            bound_region_id: None,
            last_process_tick: 0,
        }
    }

    pub fn connection(&self) -> Option<ConnectionId> {
        match self.kind {
            CharacterKind::Player { connection } => Some(connection),
            _ => None,
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, CharacterKind::Player { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_ignores_height() {
        let a = Position::new(0.0, 100.0, 0.0);
        let b = Position::new(3.0, -50.0, 4.0);
        assert!((a.distance_2d(&b) - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn connection_only_for_players() {
        let conn = ConnectionId(7);
        let player = Character::new(
            "p",
            CharacterKind::Player { connection: conn },
            Position::default(),
        );
        let npc = Character::new("n", CharacterKind::Npc, Position::default());
        assert_eq!(player.connection(), Some(conn));
        assert_eq!(npc.connection(), None);
        assert!(player.is_player());
        assert!(!npc.is_player());
    }
}
