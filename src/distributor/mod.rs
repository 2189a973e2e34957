mod hub;
mod messages;

pub use hub::ObserverHub;
pub use messages::OutboundMessage;
