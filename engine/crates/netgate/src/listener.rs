use entities::ConnectionId;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::channels::{ConnWriteRx, InputTx, NetToSim, RegisterConnection, RegisterTx, UnregisterTx};
use crate::framing::{read_frame, write_frame};

/// Accept loop. Each connection gets an id, a write channel registered
/// with the output router, and a pair of socket tasks. Runs until the
/// simulation side drops its channel ends.
pub async fn run_listener(
    listener: TcpListener,
    input_tx: InputTx,
    register_tx: RegisterTx,
    unregister_tx: UnregisterTx,
    max_frame_len: u32,
) {
    let mut next_id = 0u64;
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                continue;
            }
        };
        next_id += 1;
        let connection = ConnectionId(next_id);
        tracing::info!(%connection, %peer, "connection accepted");

        let (write_tx, write_rx) = mpsc::unbounded_channel();
        if register_tx
            .send(RegisterConnection {
                connection,
                write_tx,
            })
            .is_err()
        {
            break;
        }
        if input_tx
            .send(NetToSim::Connected { connection })
            .is_err()
        {
            break;
        }

        let (reader, writer) = stream.into_split();
        tokio::spawn(run_connection(
            connection,
            reader,
            writer,
            input_tx.clone(),
            unregister_tx.clone(),
            write_rx,
            max_frame_len,
        ));
    }
    tracing::info!("listener shutting down");
}

async fn run_connection(
    connection: ConnectionId,
    mut reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    input_tx: InputTx,
    unregister_tx: UnregisterTx,
    write_rx: ConnWriteRx,
    max_frame_len: u32,
) {
    let write_task = tokio::spawn(write_loop(writer, write_rx));

    loop {
        match read_frame(&mut reader, max_frame_len).await {
            Ok(Some(payload)) => {
                if input_tx
                    .send(NetToSim::Packet {
                        connection,
                        payload,
                    })
                    .is_err()
                {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(%connection, error = %e, "read error, closing");
                break;
            }
        }
    }

    write_task.abort();
    let _ = unregister_tx.send(connection);
    let _ = input_tx.send(NetToSim::Disconnected { connection });
    tracing::info!(%connection, "connection closed");
}

async fn write_loop(mut writer: OwnedWriteHalf, mut write_rx: ConnWriteRx) {
    while let Some(packet) = write_rx.recv().await {
        if write_frame(&mut writer, &packet).await.is_err() {
            break;
        }
    }
}
