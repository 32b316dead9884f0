//! Wire types for the generation stream payload.
//!
//! Each SSE event carries one JSON document of this shape:
//! `{ "result": { "output": { "content": "...", "properties": { "finishReason": "STOP" } } } }`
//! Every field is optional on the wire; missing pieces simply yield no
//! fragment and no completion.

use serde::Deserialize;

/// The only finish reason that signals successful completion.
pub const FINISH_REASON_STOP: &str = "STOP";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub result: Option<GenerateResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateResult {
    #[serde(default)]
    pub output: Option<GenerateOutput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateOutput {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub properties: Option<OutputProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputProperties {
    #[serde(rename = "finishReason", default)]
    pub finish_reason: Option<String>,
}

impl GenerateResponse {
    /// Incremental text carried by this event, if any. Empty fragments are
    /// treated as absent.
    pub fn fragment(&self) -> Option<&str> {
        self.result
            .as_ref()?
            .output
            .as_ref()?
            .content
            .as_deref()
            .filter(|s| !s.is_empty())
    }

    /// True when this event carries the terminal marker.
    pub fn is_finished(&self) -> bool {
        self.result
            .as_ref()
            .and_then(|r| r.output.as_ref())
            .and_then(|o| o.properties.as_ref())
            .and_then(|p| p.finish_reason.as_deref())
            == Some(FINISH_REASON_STOP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_fragment_extraction() {
        let r = parse(r#"{"result":{"output":{"content":"Hi"}}}"#);
        assert_eq!(r.fragment(), Some("Hi"));
        assert!(!r.is_finished());
    }

    #[test]
    fn test_empty_fragment_is_none() {
        let r = parse(r#"{"result":{"output":{"content":""}}}"#);
        assert_eq!(r.fragment(), None);
    }

    #[test]
    fn test_finish_marker() {
        let r = parse(r#"{"result":{"output":{"properties":{"finishReason":"STOP"}}}}"#);
        assert!(r.is_finished());
        assert_eq!(r.fragment(), None);
    }

    #[test]
    fn test_other_finish_reason_is_not_terminal() {
        let r = parse(r#"{"result":{"output":{"properties":{"finishReason":"LENGTH"}}}}"#);
        assert!(!r.is_finished());
    }

    #[test]
    fn test_fragment_and_finish_in_one_event() {
        let r = parse(
            r#"{"result":{"output":{"content":"!","properties":{"finishReason":"STOP"}}}}"#,
        );
        assert_eq!(r.fragment(), Some("!"));
        assert!(r.is_finished());
    }

    #[test]
    fn test_missing_pieces_tolerated() {
        assert_eq!(parse("{}").fragment(), None);
        assert!(!parse(r#"{"result":{}}"#).is_finished());
        assert!(!parse(r#"{"result":{"output":{}}}"#).is_finished());
    }
}
