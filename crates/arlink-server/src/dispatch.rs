use arlink_core::{decode, TelemetryMessage};

use crate::client::ClientId;

/// Decode and log one inbound text frame.
///
/// Returns the decoded message for in-process fan-out, or `None` when the
/// frame could not be decoded. A decode failure is logged and dropped; the
/// caller's read loop keeps running either way.
pub fn handle_message(client_id: &ClientId, text: &str) -> Option<TelemetryMessage> {
    let message = match decode(text) {
        Ok(message) => message,
        Err(err) => {
            tracing::error!(client_id = %client_id, kind = err.error_kind(), "{err}");
            return None;
        }
    };

    match &message {
        TelemetryMessage::Pose(pose) | TelemetryMessage::LegacyPose(pose) => {
            tracing::info!(client_id = %client_id, "{}", pose.log_line());
        }
        TelemetryMessage::Toggle { active } => {
            let state = if *active { "Active" } else { "Inactive" };
            tracing::info!(client_id = %client_id, "Toggle state changed: {state}");
        }
        TelemetryMessage::Button => {
            tracing::info!(client_id = %client_id, "Button pressed");
        }
        TelemetryMessage::Reset => {
            tracing::info!(client_id = %client_id, "Pose reset requested");
        }
        TelemetryMessage::Unknown { kind } => {
            tracing::warn!(client_id = %client_id, "Unknown message type: {kind}");
        }
    }

    Some(message)
}
