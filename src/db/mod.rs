mod connection;
pub mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;
pub use repositories::StateTail;
pub use models::{
    AggregateBucket, InboundPacket, LogEntry, PacketRecord, SensorChannels, SensorSnapshot,
};
