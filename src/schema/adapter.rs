//! Readers for recorded `gamepad-input` streams
//!
//! Recordings are NDJSON (one payload per line) or a single JSON array. Lines
//! that fail to parse are malformed events; like every other malformed event
//! they are skipped rather than failing the whole stream.

use crate::error::PlatterError;
use crate::schema::gamepad_event::{ControllerEvent, GamepadPayload, ValidationError};
use tracing::debug;

/// Result of reading a recorded stream
#[derive(Debug, Default)]
pub struct PayloadStream {
    pub payloads: Vec<GamepadPayload>,
    /// 1-based line numbers that could not be parsed
    pub skipped_lines: Vec<usize>,
}

/// A payload that parsed but failed validation
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadIssue {
    /// Position in the parsed payload list
    pub index: usize,
    pub error: ValidationError,
}

/// Reader for recorded controller event streams
pub struct PayloadReader;

impl PayloadReader {
    /// Parse a JSON array of payloads
    pub fn parse_array(json: &str) -> Result<Vec<GamepadPayload>, PlatterError> {
        let payloads: Vec<GamepadPayload> = serde_json::from_str(json)?;
        Ok(payloads)
    }

    /// Parse NDJSON, skipping blank and malformed lines
    pub fn parse_ndjson(ndjson: &str) -> PayloadStream {
        let mut stream = PayloadStream::default();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match GamepadPayload::from_json(trimmed) {
                Ok(payload) => stream.payloads.push(payload),
                Err(e) => {
                    debug!(line = line_num + 1, error = %e, "skipping malformed payload");
                    stream.skipped_lines.push(line_num + 1);
                }
            }
        }
        stream
    }

    /// Validate every payload, returning the ones the decoder would drop
    pub fn validate_payloads(payloads: &[GamepadPayload]) -> Vec<PayloadIssue> {
        payloads
            .iter()
            .enumerate()
            .filter_map(|(index, payload)| {
                ControllerEvent::try_from(payload)
                    .err()
                    .map(|error| PayloadIssue { index, error })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ndjson() {
        let ndjson = concat!(
            r#"{"type":"button","button":2,"pressed":true,"count":1}"#,
            "\n\n",
            r#"{"type":"scratch","axis":0,"direction":"right","count":2}"#,
            "\n",
            "not json\n",
            r#"{"button":1}"#,
            "\n"
        );

        let stream = PayloadReader::parse_ndjson(ndjson);
        assert_eq!(stream.payloads.len(), 2);
        assert_eq!(stream.payloads[0].kind, "button");
        assert_eq!(stream.payloads[1].kind, "scratch");
        assert_eq!(stream.skipped_lines, vec![4, 5]);
    }

    #[test]
    fn test_parse_array() {
        let json = r#"[
            {"type":"button","button":0,"pressed":true,"count":1},
            {"type":"button","button":0,"pressed":false,"count":1,"averageReleaseTime":95.5}
        ]"#;

        let payloads = PayloadReader::parse_array(json).unwrap();
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[1].average_release_time, Some(95.5));
    }

    #[test]
    fn test_validate_payloads_reports_rejected_events() {
        let payloads = vec![
            GamepadPayload::button(0, true, 1),
            GamepadPayload::button(7, true, 2),
            GamepadPayload {
                kind: "scratch".to_string(),
                axis: Some(0),
                ..Default::default()
            },
        ];

        let issues = PayloadReader::validate_payloads(&payloads);
        assert_eq!(
            issues,
            vec![
                PayloadIssue {
                    index: 1,
                    error: ValidationError::ButtonOutOfRange(7),
                },
                PayloadIssue {
                    index: 2,
                    error: ValidationError::MissingField("direction"),
                },
            ]
        );
    }

    #[test]
    fn test_parse_array_rejects_invalid_json() {
        assert!(matches!(
            PayloadReader::parse_array("[{"),
            Err(PlatterError::JsonError(_))
        ));
    }
}
