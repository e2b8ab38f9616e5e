mod arena;
mod character;
mod types;

pub use arena::CharacterArena;
pub use character::{Character, CharacterKind, Position};
pub use types::{CharacterId, ConnectionId};
