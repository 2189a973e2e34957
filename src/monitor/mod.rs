mod controller;
mod tasks;

pub use controller::{HealthReport, HistoryPoint, SeatMonitor};
pub use tasks::BackgroundTasks;
