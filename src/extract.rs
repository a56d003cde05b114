use serde_json::Value as JsonValue;

use crate::error::MalformedPayload;

/// The structured payload pulled out of one response.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExtractedRecord {
    #[serde(rename = "url")]
    pub source_url: String,
    #[serde(rename = "body")]
    pub payload: JsonValue,
}

/// Decodes a JSON body and picks the value at a JSON Pointer path.
#[derive(Debug, Clone)]
pub struct Extractor {
    path: String,
}

impl Extractor {
    /// `path` is a JSON Pointer (`/data/items`); the empty string selects the
    /// whole document.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn extract(
        &self,
        source_url: &str,
        body: &[u8],
    ) -> Result<ExtractedRecord, MalformedPayload> {
        let document: JsonValue = serde_json::from_slice(body)
            .map_err(|err| MalformedPayload::InvalidJson(err.to_string()))?;
        let payload = match document.pointer(&self.path) {
            None | Some(JsonValue::Null) => {
                return Err(MalformedPayload::MissingValue {
                    path: self.path.clone(),
                })
            }
            Some(value) => value.clone(),
        };
        Ok(ExtractedRecord {
            source_url: source_url.to_string(),
            payload,
        })
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new("/data/items")
    }
}
