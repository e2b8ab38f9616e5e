use std::collections::BTreeMap;

use entities::{CharacterId, ConnectionId};

#[derive(Debug, Clone)]
struct Connection {
    character: Option<CharacterId>,
}

/// Connection bookkeeping on the simulation thread: which connections are
/// alive and which character each one is driving.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    connections: BTreeMap<ConnectionId, Connection>,
    character_to_connection: BTreeMap<CharacterId, ConnectionId>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a connection the network layer accepted.
    pub fn open(&mut self, connection: ConnectionId) {
        self.connections
            .insert(connection, Connection { character: None });
    }

    pub fn is_open(&self, connection: ConnectionId) -> bool {
        self.connections.contains_key(&connection)
    }

    /// Bind a spawned character to its connection (on join).
    pub fn bind(&mut self, connection: ConnectionId, character: CharacterId) {
        if let Some(entry) = self.connections.get_mut(&connection) {
            entry.character = Some(character);
            self.character_to_connection.insert(character, connection);
        }
    }

    pub fn character_for(&self, connection: ConnectionId) -> Option<CharacterId> {
        self.connections.get(&connection)?.character
    }

    pub fn connection_for(&self, character: CharacterId) -> Option<ConnectionId> {
        self.character_to_connection.get(&character).copied()
    }

    /// Drop a connection, returning the character it was driving, if any.
    pub fn close(&mut self, connection: ConnectionId) -> Option<CharacterId> {
        let entry = self.connections.remove(&connection)?;
        if let Some(character) = entry.character {
            self.character_to_connection.remove(&character);
        }
        entry.character
    }

    pub fn active_count(&self) -> usize {
        self.connections.len()
    }

    pub fn bound_characters(&self) -> Vec<CharacterId> {
        self.character_to_connection.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_bind_close() {
        let mut table = ConnectionTable::new();
        let conn = ConnectionId(1);
        let character = CharacterId::new(0, 0);

        table.open(conn);
        assert!(table.is_open(conn));
        assert_eq!(table.character_for(conn), None);

        table.bind(conn, character);
        assert_eq!(table.character_for(conn), Some(character));
        assert_eq!(table.connection_for(character), Some(conn));

        assert_eq!(table.close(conn), Some(character));
        assert!(!table.is_open(conn));
        assert_eq!(table.connection_for(character), None);
    }

    #[test]
    fn close_unbound_connection() {
        let mut table = ConnectionTable::new();
        let conn = ConnectionId(7);
        table.open(conn);
        assert_eq!(table.close(conn), None);
        assert_eq!(table.close(conn), None);
    }

    #[test]
    fn bind_without_open_is_ignored() {
        let mut table = ConnectionTable::new();
        let character = CharacterId::new(3, 0);
        table.bind(ConnectionId(9), character);
        assert_eq!(table.connection_for(character), None);
    }

    #[test]
    fn counts_and_listings() {
        let mut table = ConnectionTable::new();
        table.open(ConnectionId(1));
        table.open(ConnectionId(2));
        table.bind(ConnectionId(2), CharacterId::new(5, 0));

        assert_eq!(table.active_count(), 2);
        assert_eq!(table.bound_characters(), vec![CharacterId::new(5, 0)]);
    }
}
