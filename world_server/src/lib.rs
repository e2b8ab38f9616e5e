pub mod config;
pub mod game;
pub mod shutdown;
pub mod wire;
