mod snapshot_log;

pub use snapshot_log::StateTail;
