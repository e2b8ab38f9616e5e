use entities::ConnectionId;
use spatial::PacketSink;

use crate::channels::{Outbound, OutputTx};

/// PacketSink that enqueues onto the output router's channel. Sends never
/// block; a closed router (shutdown in progress) swallows the packet.
#[derive(Debug, Clone)]
pub struct QueueSink {
    output_tx: OutputTx,
}

impl QueueSink {
    pub fn new(output_tx: OutputTx) -> Self {
        Self { output_tx }
    }

    /// Deliver a final packet and close the connection behind it.
    pub fn send_final(&mut self, connection: ConnectionId, packet: Vec<u8>) {
        let _ = self
            .output_tx
            .send(Outbound::with_disconnect(connection, packet));
    }
}

impl PacketSink for QueueSink {
    fn send(&mut self, connection: ConnectionId, packet: &[u8]) {
        if self
            .output_tx
            .send(Outbound::new(connection, packet.to_vec()))
            .is_err()
        {
            tracing::trace!(%connection, "output channel closed, packet dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn sink_enqueues_outbound_packets() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = QueueSink::new(tx);
        let conn = ConnectionId(3);

        sink.send(conn, b"abc");
        sink.send_final(conn, b"bye".to_vec());

        let first = rx.recv().await.unwrap();
        assert_eq!(first.connection, conn);
        assert_eq!(first.packet, b"abc");
        assert!(!first.disconnect);

        let second = rx.recv().await.unwrap();
        assert!(second.disconnect);
    }

    #[test]
    fn send_after_shutdown_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut sink = QueueSink::new(tx);
        sink.send(ConnectionId(1), b"dropped");
    }
}
