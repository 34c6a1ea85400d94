//! The intermediate-file record type and its self-delimited wire encoding.
//!
//! One JSON object per record, newline-separated. We use `serde_json` lines
//! because it's already on the dependency list for the tarpc transport and
//! keeps map and reduce sides using the same (de)serializer.

use crate::mr::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Encode as one self-delimited line (a JSON object followed by `\n`).
    pub fn encode_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)
            .map_err(|e| Error::malformed("<kv>", format!("failed to encode record: {e}")))?;
        line.push('\n');
        Ok(line)
    }

    /// Decode every record in the given newline-delimited JSON blob.
    ///
    /// Blank lines are skipped so an intentionally-empty intermediate file
    /// decodes to zero records rather than erroring.
    pub fn decode_all(path: &str, contents: &str) -> Result<Vec<KeyValue>> {
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .map_err(|e| Error::malformed(path, format!("bad record: {e}")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_lines() {
        let kvs = vec![
            KeyValue::new("the", "1"),
            KeyValue::new("cat", "1"),
            KeyValue::new("sat", "1"),
        ];
        let mut blob = String::new();
        for kv in &kvs {
            blob.push_str(&kv.encode_line().unwrap());
        }
        let decoded = KeyValue::decode_all("test", &blob).unwrap();
        assert_eq!(decoded, kvs);
    }

    #[test]
    fn tolerates_blank_lines() {
        let decoded = KeyValue::decode_all("test", "\n\n").unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn rejects_malformed_record() {
        let err = KeyValue::decode_all("test", "not json\n");
        assert!(err.is_err());
    }
}
