//! Per-frame text recognition output.
//!
//! The OCR engine runs on the host; each camera frame arrives here as an
//! ordered list of fragments.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFragment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl TextFragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }
}

/// Everything the recognizer read in one frame, in reading order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextReading {
    pub fragments: Vec<TextFragment>,
}

impl TextReading {
    pub fn new(fragments: Vec<TextFragment>) -> Self {
        Self { fragments }
    }

    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: texts.into_iter().map(TextFragment::new).collect(),
        }
    }

    /// Joined reading: non-blank fragments separated by a single space, trimmed.
    pub fn joined(&self) -> String {
        let mut joined = String::new();
        for fragment in &self.fragments {
            let text = fragment.text.trim();
            if text.is_empty() {
                continue;
            }
            if !joined.is_empty() {
                joined.push(' ');
            }
            joined.push_str(text);
        }
        joined
    }

    pub fn is_blank(&self) -> bool {
        self.fragments.iter().all(|f| f.text.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_skips_blank_fragments() {
        let reading = TextReading::from_texts(["  P<UTO ", "", "   ", "ERIKSSON"]);
        assert_eq!(reading.joined(), "P<UTO ERIKSSON");
        assert!(!reading.is_blank());
    }

    #[test]
    fn empty_and_whitespace_readings_are_blank() {
        assert!(TextReading::default().is_blank());
        assert!(TextReading::from_texts([" ", "\t"]).is_blank());
        assert_eq!(TextReading::from_texts([" ", "\t"]).joined(), "");
    }

    #[test]
    fn deserializes_host_frame_json() {
        let json = r#"{"fragments":[{"text":"ABC","confidence":0.9},{"text":"123"}]}"#;
        let reading: TextReading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.joined(), "ABC 123");
        assert_eq!(reading.fragments[0].confidence, Some(0.9));
    }
}
