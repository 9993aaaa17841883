pub mod errors;
pub mod messages;

pub use errors::DecodeError;
pub use messages::{decode, PoseUpdate, TelemetryMessage};
