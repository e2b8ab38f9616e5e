mod channels;
mod connections;
mod framing;
mod listener;
mod output_router;
mod sink;

pub use channels::{
    ConnWriteRx, ConnWriteTx, InputRx, InputTx, NetToSim, Outbound, OutputRx, OutputTx,
    RegisterConnection, RegisterRx, RegisterTx, UnregisterRx, UnregisterTx,
};
pub use connections::ConnectionTable;
pub use framing::{read_frame, write_frame, DEFAULT_MAX_FRAME_LEN};
pub use listener::run_listener;
pub use output_router::run_output_router;
pub use sink::QueueSink;
