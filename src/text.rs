/// Text control messages
///
/// Devices announce themselves and keep their session alive with short
/// free-form strings. There is no schema: a message is decoded with the first
/// encoding in an ordered chain that accepts it, then classified by
/// case-insensitive substring match against fixed indicator lists.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Substrings marking a heartbeat
pub const HEARTBEAT_INDICATORS: &[&str] = &[
    "heartbeat",
    "ping",
    "alive",
    "keep-alive",
    "heart_beat",
    "keepalive",
];

/// Substrings marking a registration
pub const REGISTRATION_INDICATORS: &[&str] = &[
    "register",
    "registration",
    "connect",
    "login",
    "device_info",
    "client_info",
];

/// Text encodings tried on non-binary datagrams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    Utf8,
    /// GBK, which also covers GB2312
    Gbk,
    Ascii,
    /// ISO-8859-1, accepts every byte sequence
    Latin1,
}

impl TextEncoding {
    /// Default decode order
    pub const DEFAULT_CHAIN: [TextEncoding; 4] = [
        TextEncoding::Utf8,
        TextEncoding::Gbk,
        TextEncoding::Ascii,
        TextEncoding::Latin1,
    ];

    /// Decode `data`, `None` if it is not valid in this encoding
    pub fn decode(&self, data: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(data).ok().map(str::to_owned),
            TextEncoding::Gbk => encoding_rs::GBK
                .decode_without_bom_handling_and_without_replacement(data)
                .map(|text| text.into_owned()),
            TextEncoding::Ascii => {
                if data.is_ascii() {
                    std::str::from_utf8(data).ok().map(str::to_owned)
                } else {
                    None
                }
            }
            TextEncoding::Latin1 => Some(data.iter().map(|&b| b as char).collect()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Gbk => "gbk",
            TextEncoding::Ascii => "ascii",
            TextEncoding::Latin1 => "latin1",
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a decoded text message is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextKind {
    Heartbeat,
    Registration,
    Unrecognized,
}

/// A successfully decoded text datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    pub text: String,
    pub encoding: TextEncoding,
    pub kind: TextKind,
}

/// Classify decoded text; heartbeat indicators win over registration ones
pub fn classify_text(text: &str) -> TextKind {
    let lowered = text.to_lowercase();
    if HEARTBEAT_INDICATORS.iter().any(|i| lowered.contains(i)) {
        TextKind::Heartbeat
    } else if REGISTRATION_INDICATORS.iter().any(|i| lowered.contains(i)) {
        TextKind::Registration
    } else {
        TextKind::Unrecognized
    }
}

/// Multi-encoding decoder and keyword classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextClassifier {
    encodings: Vec<TextEncoding>,
}

impl Default for TextClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TextClassifier {
    pub fn new() -> Self {
        Self {
            encodings: TextEncoding::DEFAULT_CHAIN.to_vec(),
        }
    }

    /// Classifier with a custom decode order
    ///
    /// Without [`TextEncoding::Latin1`] in the chain some datagrams become
    /// undecodable.
    pub fn with_encodings(encodings: Vec<TextEncoding>) -> Self {
        Self { encodings }
    }

    pub fn encodings(&self) -> &[TextEncoding] {
        &self.encodings
    }

    /// First successful decode in chain order
    pub fn decode(&self, data: &[u8]) -> Option<(String, TextEncoding)> {
        self.encodings
            .iter()
            .find_map(|encoding| encoding.decode(data).map(|text| (text, *encoding)))
    }

    /// Decode and classify a datagram, `None` if no encoding accepts it
    pub fn classify(&self, data: &[u8]) -> Option<TextMessage> {
        let (text, encoding) = self.decode(data)?;
        let kind = classify_text(&text);
        Some(TextMessage { text, encoding, kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive() {
        let classifier = TextClassifier::new();
        let upper = classifier.classify(b"HEARTBEAT from device A").unwrap();
        let lower = classifier.classify(b"heartbeat from device a").unwrap();
        assert_eq!(upper.kind, TextKind::Heartbeat);
        assert_eq!(upper.kind, lower.kind);
        assert_eq!(upper.encoding, TextEncoding::Utf8);
    }

    #[test]
    fn test_indicators() {
        assert_eq!(classify_text("PING"), TextKind::Heartbeat);
        assert_eq!(classify_text("node keep-alive 42"), TextKind::Heartbeat);
        assert_eq!(classify_text("heart_beat"), TextKind::Heartbeat);
        assert_eq!(classify_text("Register sensor-7"), TextKind::Registration);
        assert_eq!(classify_text("{\"client_info\": {}}"), TextKind::Registration);
        assert_eq!(classify_text("LOGIN admin"), TextKind::Registration);
        assert_eq!(classify_text("temperature 21.5"), TextKind::Unrecognized);
        assert_eq!(classify_text(""), TextKind::Unrecognized);
    }

    #[test]
    fn test_heartbeat_wins() {
        assert_eq!(classify_text("register; heartbeat"), TextKind::Heartbeat);
        // "alive" is a heartbeat indicator even inside a registration
        assert_eq!(classify_text("connect alive"), TextKind::Heartbeat);
    }

    #[test]
    fn test_gbk_fallback() {
        // "心跳 ping" in GBK, not valid UTF-8
        let data = [0xD0, 0xC4, 0xCC, 0xF8, b' ', b'p', b'i', b'n', b'g'];
        let message = TextClassifier::new().classify(&data).unwrap();
        assert_eq!(message.encoding, TextEncoding::Gbk);
        assert_eq!(message.text, "心跳 ping");
        assert_eq!(message.kind, TextKind::Heartbeat);
    }

    #[test]
    fn test_latin1_always_decodes() {
        let data = [0xFF, 0xFE, 0x80];
        let message = TextClassifier::new().classify(&data).unwrap();
        assert_eq!(message.encoding, TextEncoding::Latin1);
        assert_eq!(message.kind, TextKind::Unrecognized);
        assert_eq!(message.text.chars().count(), 3);
    }

    #[test]
    fn test_undecodable_without_latin1() {
        let classifier = TextClassifier::with_encodings(vec![
            TextEncoding::Utf8,
            TextEncoding::Gbk,
            TextEncoding::Ascii,
        ]);
        assert!(classifier.classify(&[0xFF, 0xFE, 0x80]).is_none());
        assert!(classifier.classify(b"ping").is_some());
    }

    #[test]
    fn test_empty_datagram() {
        let message = TextClassifier::new().classify(&[]).unwrap();
        assert_eq!(message.text, "");
        assert_eq!(message.kind, TextKind::Unrecognized);
    }

    #[test]
    fn test_ascii_encoding() {
        assert_eq!(TextEncoding::Ascii.decode(b"ping"), Some("ping".to_string()));
        assert_eq!(TextEncoding::Ascii.decode(&[0xC3, 0xA9]), None);
    }
}
