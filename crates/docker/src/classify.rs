//! Pure classification of build progress lines into typed stage events.
//! Knows nothing about streaming or the wire protocol.

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    From,
    Maintainer,
    Run,
    Cmd,
    Complete,
}

/// A classified progress line.
#[derive(Debug, Clone)]
pub struct StageEvent {
    pub stage: BuildStage,
    /// The full matched text.
    pub command: String,
    /// The captured value: base image reference, command text, or the
    /// built image id for `Complete`.
    pub value: String,
    /// The raw input line.
    pub input: String,
}

/// Ordered table of stage patterns, first match wins. The patterns are
/// mutually exclusive by construction, so ordering only settles ties that
/// cannot occur in practice.
pub struct StreamClassifier {
    patterns: Vec<(BuildStage, Regex)>,
}

impl StreamClassifier {
    pub fn new() -> Self {
        let patterns = vec![
            (
                BuildStage::From,
                Regex::new(r"FROM (.*)").expect("valid regex"),
            ),
            (
                BuildStage::Maintainer,
                Regex::new(r"MAINTAINER (.*)").expect("valid regex"),
            ),
            (
                BuildStage::Run,
                Regex::new(r"RUN (.*)").expect("valid regex"),
            ),
            (
                BuildStage::Cmd,
                Regex::new(r"CMD (.*)").expect("valid regex"),
            ),
            (
                BuildStage::Complete,
                Regex::new(r"Successfully built (.*)").expect("valid regex"),
            ),
        ];
        Self { patterns }
    }

    /// Classify one line. Unrecognized lines yield `None`; callers keep
    /// them in the raw output log but publish no event.
    pub fn classify(&self, line: &str) -> Option<StageEvent> {
        for (stage, regex) in &self.patterns {
            if let Some(caps) = regex.captures(line) {
                let command = caps
                    .get(0)
                    .map(|m| m.as_str().trim_end().to_string())
                    .unwrap_or_default();
                let value = caps
                    .get(1)
                    .map(|m| m.as_str().trim_end().to_string())
                    .unwrap_or_default();
                return Some(StageEvent {
                    stage: *stage,
                    command,
                    value,
                    input: line.to_string(),
                });
            }
        }
        None
    }
}

impl Default for StreamClassifier {
    fn default() -> Self {
        Self::new()
    }
}
