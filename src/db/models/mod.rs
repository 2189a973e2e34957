pub mod log_entry;
pub mod packet;
pub mod sensor;

pub use log_entry::{AggregateBucket, EntryKind, LogEntry};
pub use packet::{InboundPacket, PacketRecord};
pub use sensor::{PadGrid, PadGroup, SensorChannels, SensorSnapshot};
