use entities::ConnectionId;
use tokio::sync::mpsc;

/// Messages from the network tasks to the simulation thread.
#[derive(Debug)]
pub enum NetToSim {
    /// A new TCP connection was accepted.
    Connected { connection: ConnectionId },
    /// A complete frame arrived from a client.
    Packet {
        connection: ConnectionId,
        payload: Vec<u8>,
    },
    /// The client went away.
    Disconnected { connection: ConnectionId },
}

/// Sender from network tasks to the simulation thread.
pub type InputTx = mpsc::UnboundedSender<NetToSim>;
/// Receiver in the simulation thread for client events.
pub type InputRx = mpsc::UnboundedReceiver<NetToSim>;

/// A packet leaving the simulation thread, addressed by connection.
#[derive(Debug)]
pub struct Outbound {
    pub connection: ConnectionId,
    pub packet: Vec<u8>,
    /// When true, the output router drops the connection's write channel
    /// after delivering this packet, shutting the TCP stream down.
    pub disconnect: bool,
}

impl Outbound {
    pub fn new(connection: ConnectionId, packet: Vec<u8>) -> Self {
        Self {
            connection,
            packet,
            disconnect: false,
        }
    }

    /// A final packet that closes the connection after delivery.
    pub fn with_disconnect(connection: ConnectionId, packet: Vec<u8>) -> Self {
        Self {
            connection,
            packet,
            disconnect: true,
        }
    }
}

/// Sender from the simulation thread to the output router.
pub type OutputTx = mpsc::UnboundedSender<Outbound>;
/// Receiver in the output router for outbound packets.
pub type OutputRx = mpsc::UnboundedReceiver<Outbound>;

/// Per-connection write channel (simulation -> output router -> socket task).
pub type ConnWriteTx = mpsc::UnboundedSender<Vec<u8>>;
pub type ConnWriteRx = mpsc::UnboundedReceiver<Vec<u8>>;

/// Registration message for the output router.
#[derive(Debug)]
pub struct RegisterConnection {
    pub connection: ConnectionId,
    pub write_tx: ConnWriteTx,
}

pub type RegisterTx = mpsc::UnboundedSender<RegisterConnection>;
pub type RegisterRx = mpsc::UnboundedReceiver<RegisterConnection>;

pub type UnregisterTx = mpsc::UnboundedSender<ConnectionId>;
pub type UnregisterRx = mpsc::UnboundedReceiver<ConnectionId>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn input_channel_roundtrip() {
        let (tx, mut rx) = mpsc::unbounded_channel::<NetToSim>();
        let conn = ConnectionId(1);

        tx.send(NetToSim::Connected { connection: conn }).unwrap();
        tx.send(NetToSim::Packet {
            connection: conn,
            payload: vec![1, 2, 3],
        })
        .unwrap();
        tx.send(NetToSim::Disconnected { connection: conn })
            .unwrap();

        assert!(matches!(
            rx.recv().await.unwrap(),
            NetToSim::Connected { .. }
        ));
        match rx.recv().await.unwrap() {
            NetToSim::Packet { payload, .. } => assert_eq!(payload, vec![1, 2, 3]),
            other => panic!("expected Packet, got {other:?}"),
        }
        assert!(matches!(
            rx.recv().await.unwrap(),
            NetToSim::Disconnected { .. }
        ));
    }

    #[tokio::test]
    async fn output_channel_roundtrip() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
        tx.send(Outbound::new(ConnectionId(42), b"hi".to_vec()))
            .unwrap();

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.connection, ConnectionId(42));
        assert_eq!(msg.packet, b"hi");
        assert!(!msg.disconnect);
    }
}
