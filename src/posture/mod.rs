pub mod classifier;
pub mod config;
pub mod session;
pub mod types;

pub use classifier::classify;
pub use config::{PostureConfig, SessionConfig};
pub use session::{seat_state, SessionScanner};
pub use types::{PostureLabel, PostureLevel, PostureMetrics, PostureVerdict, SeatState};
