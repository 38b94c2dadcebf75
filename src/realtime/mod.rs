pub mod hub;

pub use hub::{Channel, EventHub, HubError};
