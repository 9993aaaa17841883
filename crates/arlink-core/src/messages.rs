use serde::Serialize;
use serde_json::Value;

use crate::errors::DecodeError;

/// One decoded telemetry frame from an AR client.
///
/// The wire format is a standalone JSON object per text frame, routed on a
/// `type` field. Clients predating the typed protocol send pose fields at
/// the top level with no `type` at all, so a missing tag decodes as
/// `LegacyPose`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum TelemetryMessage {
    #[serde(rename = "pose")]
    Pose(PoseUpdate),
    #[serde(rename = "pose_data")]
    LegacyPose(PoseUpdate),
    #[serde(rename = "toggle_state")]
    Toggle { active: bool },
    #[serde(rename = "button_press")]
    Button,
    #[serde(rename = "reset_pose")]
    Reset,
    #[serde(rename = "unknown")]
    Unknown { kind: String },
}

/// Position, rotation and scale of the tracked device.
/// Rotation is in degrees. Missing numeric fields decode as 0.0, a missing
/// scale as 1.0 and a missing toggle flag as false.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PoseUpdate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub scale: f64,
    pub toggle_active: bool,
    /// Client-supplied capture time, milliseconds since the epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<i64>,
}

impl PoseUpdate {
    /// Render the pose as the operator-facing log line. The client timestamp,
    /// when present, is prefixed in local wall-clock time.
    pub fn log_line(&self) -> String {
        let body = format!(
            "Position: X={:.3}, Y={:.3}, Z={:.3} | Rotation: Roll={:.2}°, Pitch={:.2}°, Yaw={:.2}° | Scale: {:.2} | Toggle: {}",
            self.x,
            self.y,
            self.z,
            self.roll,
            self.pitch,
            self.yaw,
            self.scale,
            if self.toggle_active { "Active" } else { "Inactive" },
        );
        match self.capture_time() {
            Some(time) => format!("[{time}] {body}"),
            None => body,
        }
    }

    fn capture_time(&self) -> Option<String> {
        let ms = self.timestamp_ms?;
        let utc = chrono::DateTime::from_timestamp_millis(ms)?;
        Some(utc.with_timezone(&chrono::Local).format("%H:%M:%S%.3f").to_string())
    }
}

/// Decode one text frame into a [`TelemetryMessage`].
///
/// Routing rules:
/// - no `type` field → legacy flat pose
/// - `pose` → nested shape (`position`/`rotation` objects)
/// - `pose_data` → flat shape (telemetry fields at the top level)
/// - `toggle_state`/`toggle`, `button_press`/`button`, `reset_pose`/`reset`
/// - anything else → `Unknown`
///
/// Unknown top-level fields are ignored; wrong-typed fields fall back to the
/// same defaults as missing ones.
pub fn decode(text: &str) -> Result<TelemetryMessage, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(|source| DecodeError::Json {
        raw: text.to_string(),
        source,
    })?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject {
            raw: text.to_string(),
        });
    }

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("pose_data");

    Ok(match kind {
        "pose" => TelemetryMessage::Pose(nested_pose(&value)),
        "pose_data" => TelemetryMessage::LegacyPose(flat_pose(&value)),
        "toggle_state" | "toggle" => TelemetryMessage::Toggle {
            // First present key wins, even if it is not a boolean.
            active: first_of(&value, &["toggle_active", "isActive"])
                .and_then(Value::as_bool)
                .unwrap_or(false),
        },
        "button_press" | "button" => TelemetryMessage::Button,
        "reset_pose" | "reset" => TelemetryMessage::Reset,
        other => TelemetryMessage::Unknown {
            kind: other.to_string(),
        },
    })
}

/// Nested shape: `position.{x,y,z}`, `rotation.{roll,pitch,yaw}`, with
/// `scale` and `isToggleActive` at the top level.
fn nested_pose(value: &Value) -> PoseUpdate {
    let position = value.get("position");
    let rotation = value.get("rotation");
    PoseUpdate {
        x: num_in(position, "x"),
        y: num_in(position, "y"),
        z: num_in(position, "z"),
        roll: num_in(rotation, "roll"),
        pitch: num_in(rotation, "pitch"),
        yaw: num_in(rotation, "yaw"),
        scale: scale_of(value),
        toggle_active: bool_of(value, "isToggleActive"),
        timestamp_ms: timestamp_of(value),
    }
}

/// Flat shape: everything at the top level, toggle under `toggle_active`.
fn flat_pose(value: &Value) -> PoseUpdate {
    PoseUpdate {
        x: num_of(value, "x"),
        y: num_of(value, "y"),
        z: num_of(value, "z"),
        roll: num_of(value, "roll"),
        pitch: num_of(value, "pitch"),
        yaw: num_of(value, "yaw"),
        scale: scale_of(value),
        toggle_active: bool_of(value, "toggle_active"),
        timestamp_ms: timestamp_of(value),
    }
}

fn first_of<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| value.get(*key))
}

fn num_of(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn num_in(container: Option<&Value>, key: &str) -> f64 {
    container
        .and_then(|v| v.get(key))
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

fn bool_of(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn scale_of(value: &Value) -> f64 {
    value.get("scale").and_then(Value::as_f64).unwrap_or(1.0)
}

fn timestamp_of(value: &Value) -> Option<i64> {
    value.get("timestamp").and_then(Value::as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_pose_decodes_all_fields() {
        let msg = decode(
            r#"{"type":"pose","position":{"x":1,"y":2,"z":3},"rotation":{"roll":10,"pitch":20,"yaw":30},"scale":1.5,"isToggleActive":true}"#,
        )
        .unwrap();

        let TelemetryMessage::Pose(pose) = msg else {
            panic!("expected nested pose, got {msg:?}");
        };
        assert_eq!(pose.x, 1.0);
        assert_eq!(pose.y, 2.0);
        assert_eq!(pose.z, 3.0);
        assert_eq!(pose.roll, 10.0);
        assert_eq!(pose.pitch, 20.0);
        assert_eq!(pose.yaw, 30.0);
        assert_eq!(pose.scale, 1.5);
        assert!(pose.toggle_active);
    }

    #[test]
    fn nested_pose_log_line_matches_wire_values() {
        let msg = decode(
            r#"{"type":"pose","position":{"x":1,"y":2,"z":3},"rotation":{"roll":10,"pitch":20,"yaw":30},"scale":1.5,"isToggleActive":true}"#,
        )
        .unwrap();
        let TelemetryMessage::Pose(pose) = msg else {
            panic!("expected pose");
        };
        assert_eq!(
            pose.log_line(),
            "Position: X=1.000, Y=2.000, Z=3.000 | Rotation: Roll=10.00°, Pitch=20.00°, Yaw=30.00° | Scale: 1.50 | Toggle: Active"
        );
    }

    #[test]
    fn missing_type_decodes_as_legacy_flat_pose() {
        let msg = decode(r#"{"x":0.5,"y":-0.25,"z":2,"roll":90,"pitch":45,"yaw":-30}"#).unwrap();
        let TelemetryMessage::LegacyPose(pose) = msg else {
            panic!("expected legacy pose, got {msg:?}");
        };
        assert_eq!(pose.x, 0.5);
        assert_eq!(pose.yaw, -30.0);
        assert_eq!(pose.scale, 1.0);
        assert!(!pose.toggle_active);
    }

    #[test]
    fn flat_pose_reads_toggle_active() {
        let msg = decode(r#"{"type":"pose_data","x":1,"toggle_active":true}"#).unwrap();
        let TelemetryMessage::LegacyPose(pose) = msg else {
            panic!("expected legacy pose");
        };
        assert!(pose.toggle_active);
    }

    #[test]
    fn empty_object_defaults_everything() {
        let msg = decode("{}").unwrap();
        let TelemetryMessage::LegacyPose(pose) = msg else {
            panic!("expected legacy pose");
        };
        assert_eq!(
            pose.log_line(),
            "Position: X=0.000, Y=0.000, Z=0.000 | Rotation: Roll=0.00°, Pitch=0.00°, Yaw=0.00° | Scale: 1.00 | Toggle: Inactive"
        );
    }

    #[test]
    fn toggle_prefers_toggle_active_over_is_active() {
        let msg = decode(r#"{"type":"toggle_state","toggle_active":false,"isActive":true}"#).unwrap();
        assert_eq!(msg, TelemetryMessage::Toggle { active: false });

        let msg = decode(r#"{"type":"toggle","isActive":true}"#).unwrap();
        assert_eq!(msg, TelemetryMessage::Toggle { active: true });
    }

    #[test]
    fn toggle_with_no_flag_defaults_inactive() {
        let msg = decode(r#"{"type":"toggle_state"}"#).unwrap();
        assert_eq!(msg, TelemetryMessage::Toggle { active: false });
    }

    #[test]
    fn button_and_reset_accept_both_spellings() {
        assert_eq!(decode(r#"{"type":"button_press"}"#).unwrap(), TelemetryMessage::Button);
        assert_eq!(decode(r#"{"type":"button"}"#).unwrap(), TelemetryMessage::Button);
        assert_eq!(decode(r#"{"type":"reset_pose"}"#).unwrap(), TelemetryMessage::Reset);
        assert_eq!(decode(r#"{"type":"reset"}"#).unwrap(), TelemetryMessage::Reset);
    }

    #[test]
    fn unrecognized_type_is_reported_by_name() {
        let msg = decode(r#"{"type":"mystery"}"#).unwrap();
        assert_eq!(
            msg,
            TelemetryMessage::Unknown {
                kind: "mystery".into()
            }
        );
    }

    #[test]
    fn wrong_typed_fields_fall_back_to_defaults() {
        let msg = decode(r#"{"type":"pose","position":"not an object","scale":"big"}"#).unwrap();
        let TelemetryMessage::Pose(pose) = msg else {
            panic!("expected pose");
        };
        assert_eq!(pose.x, 0.0);
        assert_eq!(pose.scale, 1.0);
    }

    #[test]
    fn unknown_top_level_fields_are_ignored() {
        let msg = decode(r#"{"type":"pose","position":{"x":7},"battery":0.5,"device":"ios"}"#).unwrap();
        let TelemetryMessage::Pose(pose) = msg else {
            panic!("expected pose");
        };
        assert_eq!(pose.x, 7.0);
    }

    #[test]
    fn invalid_json_reports_raw_text() {
        let err = decode("{{nope").unwrap_err();
        assert!(err.to_string().contains("{{nope"));
    }

    #[test]
    fn client_timestamp_prefixes_log_line() {
        let msg = decode(r#"{"x":1,"timestamp":1735689600000}"#).unwrap();
        let TelemetryMessage::LegacyPose(pose) = msg else {
            panic!("expected legacy pose");
        };
        assert_eq!(pose.timestamp_ms, Some(1735689600000));

        let line = pose.log_line();
        assert!(line.starts_with('['));
        assert!(line.contains("] Position: X=1.000"));
    }

    #[test]
    fn wire_tags_survive_serialization() {
        let json = serde_json::to_string(&TelemetryMessage::Button).unwrap();
        assert!(json.contains("\"type\":\"button_press\""));

        let json = serde_json::to_string(&TelemetryMessage::Toggle { active: true }).unwrap();
        assert!(json.contains("\"type\":\"toggle_state\""));
    }
}
