//! The runtime's line-oriented build protocol. Each streamed line is a
//! JSON document carrying either `stream` (raw progress text) or `error`;
//! download progress arrives as `status`/`id`/`progress` triples. Unknown
//! or future fields are ignored rather than rejected.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildMessage {
    #[serde(default)]
    pub stream: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, rename = "errorDetail")]
    pub error_detail: Option<ErrorDetail>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub progress: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl BuildMessage {
    pub fn stream(line: impl Into<String>) -> Self {
        Self {
            stream: Some(line.into()),
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stream_message() {
        let msg = BuildMessage::parse(r#"{"stream":"Step 1/2 : FROM alpine\n"}"#).unwrap();
        assert_eq!(msg.stream.as_deref(), Some("Step 1/2 : FROM alpine\n"));
        assert!(msg.error.is_none());
    }

    #[test]
    fn test_parse_error_message() {
        let msg = BuildMessage::parse(
            r#"{"error":"boom","errorDetail":{"code":1,"message":"boom"}}"#,
        )
        .unwrap();
        assert_eq!(msg.error.as_deref(), Some("boom"));
        assert_eq!(msg.error_detail.unwrap().code, Some(1));
    }

    #[test]
    fn test_parse_download_progress() {
        let msg = BuildMessage::parse(
            r#"{"status":"Downloading","id":"a1b2","progress":"[=> ] 1MB/9MB"}"#,
        )
        .unwrap();
        assert_eq!(msg.status.as_deref(), Some("Downloading"));
        assert_eq!(msg.id.as_deref(), Some("a1b2"));
    }

    #[test]
    fn test_unknown_fields_tolerated() {
        let msg =
            BuildMessage::parse(r#"{"stream":"ok\n","aux":{"ID":"sha256:x"},"new":true}"#).unwrap();
        assert_eq!(msg.stream.as_deref(), Some("ok\n"));
    }
}
