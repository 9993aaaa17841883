/// Typed errors for telemetry message decoding.
/// Every decode failure is non-fatal to the connection that produced it:
/// the caller logs the error and moves on to the next frame.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to parse message: {raw}")]
    Json {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("message is not a JSON object: {raw}")]
    NotAnObject { raw: String },
}

impl DecodeError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Json { .. } => "invalid_json",
            Self::NotAnObject { .. } => "not_an_object",
        }
    }

    /// The raw frame text that failed to decode.
    pub fn raw(&self) -> &str {
        match self {
            Self::Json { raw, .. } | Self::NotAnObject { raw } => raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_references_raw_text() {
        let err = crate::messages::decode("not json at all").unwrap_err();
        assert_eq!(err.error_kind(), "invalid_json");
        assert!(err.to_string().contains("not json at all"));
        assert_eq!(err.raw(), "not json at all");
    }

    #[test]
    fn non_object_payload_is_classified() {
        let err = crate::messages::decode("[1, 2, 3]").unwrap_err();
        assert_eq!(err.error_kind(), "not_an_object");
        assert!(err.to_string().contains("[1, 2, 3]"));
    }
}
