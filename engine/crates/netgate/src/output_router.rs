use std::collections::HashMap;

use entities::ConnectionId;

use crate::channels::{ConnWriteTx, OutputRx, RegisterRx, UnregisterRx};

/// Routes outbound packets to the correct per-connection write channel.
pub async fn run_output_router(
    mut output_rx: OutputRx,
    mut register_rx: RegisterRx,
    mut unregister_rx: UnregisterRx,
) {
    let mut writers: HashMap<ConnectionId, ConnWriteTx> = HashMap::new();

    loop {
        tokio::select! {
            Some(reg) = register_rx.recv() => {
                tracing::debug!(connection = %reg.connection, "output router: connection registered");
                writers.insert(reg.connection, reg.write_tx);
            }
            Some(connection) = unregister_rx.recv() => {
                tracing::debug!(%connection, "output router: connection unregistered");
                writers.remove(&connection);
            }
            Some(out) = output_rx.recv() => {
                if let Some(tx) = writers.get(&out.connection) {
                    if tx.send(out.packet).is_err() {
                        tracing::debug!(connection = %out.connection, "output router: write channel closed");
                        writers.remove(&out.connection);
                    } else if out.disconnect {
                        tracing::debug!(connection = %out.connection, "output router: disconnect requested, dropping writer");
                        writers.remove(&out.connection);
                    }
                }
            }
            else => break,
        }
    }

    tracing::info!("output router shutting down");
}
