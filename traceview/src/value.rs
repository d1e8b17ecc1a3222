//! Classification of dynamic payload values
//!
//! A value is classified once, when it enters the renderer, into exactly one
//! [`DataValue`] variant. Objects carrying the `_type` discriminator are checked
//! for the special shapes first; anything unrecognized degrades to a record.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

// ── Discriminators ───────────────────────────────────────────────────────────

pub const TYPE_FIELD: &str = "_type";
pub const HTML_TYPE: &str = "$html";
pub const BLOB_TYPE: &str = "$blob";
pub const LEGACY_BLOB_TYPE: &str = "Blob";
pub const TRACEBACK_TYPE: &str = "$traceback";

/// Blob MIME types rendered as embedded images
pub const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

// ── Field keys ───────────────────────────────────────────────────────────────

/// Key of a record field or position of a sequence item
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldKey {
    Index(usize),
    Name(String),
}

impl FieldKey {
    /// Segment used in disclosure paths (JSON Pointer escaping)
    pub fn path_segment(&self) -> String {
        match self {
            FieldKey::Index(idx) => idx.to_string(),
            FieldKey::Name(name) => name.replace('~', "~0").replace('/', "~1"),
        }
    }
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKey::Index(idx) => write!(f, "{idx}"),
            FieldKey::Name(name) => f.write_str(name),
        }
    }
}

// ── Traceback frames ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracebackFrame {
    pub filename: String,
    pub lineno: i64,
    /// Function name
    pub name: String,
    /// Source text of the line; emphasized by presentation
    pub line: String,
}

fn parse_frame(frame: &Value) -> Option<TracebackFrame> {
    Some(TracebackFrame {
        filename: frame.get("filename").and_then(|v| v.as_str())?.to_string(),
        lineno: frame.get("lineno").and_then(|v| v.as_i64())?,
        name: frame.get("name").and_then(|v| v.as_str())?.to_string(),
        line: frame
            .get("line")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    })
}

/// `None` when the list is missing, empty, or any frame is malformed
fn parse_frames(frames: Option<&Value>) -> Option<Vec<TracebackFrame>> {
    let frames = frames?.as_array()?;
    if frames.is_empty() {
        return None;
    }
    frames.iter().map(parse_frame).collect()
}

// ── Classified values ────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum DataValue<'a> {
    Null,
    Bool(bool),
    Number(&'a Number),
    Text(&'a str),
    Blob { mime_type: &'a str, data: &'a str },
    Markup(&'a str),
    /// Frames of a stack trace; `None` when the frame list is invalid
    Stack(Option<Vec<TracebackFrame>>),
    /// Named fields in their own order, discriminator excluded
    Record(Vec<(FieldKey, &'a Value)>),
    Sequence(&'a [Value]),
}

impl<'a> DataValue<'a> {
    pub fn classify(value: &'a Value) -> Self {
        let fields = match value {
            Value::Null => return DataValue::Null,
            Value::Bool(flag) => return DataValue::Bool(*flag),
            Value::Number(number) => return DataValue::Number(number),
            Value::String(text) => return DataValue::Text(text),
            Value::Array(items) => return DataValue::Sequence(items),
            Value::Object(fields) => fields,
        };

        match fields.get(TYPE_FIELD).and_then(|v| v.as_str()) {
            Some(HTML_TYPE) => {
                if let Some(html) = fields.get("html").and_then(|v| v.as_str()) {
                    return DataValue::Markup(html);
                }
            }
            Some(BLOB_TYPE) | Some(LEGACY_BLOB_TYPE) => {
                let mime_type = fields.get("mime_type").and_then(|v| v.as_str());
                let data = fields.get("data").and_then(|v| v.as_str());
                if let (Some(mime_type), Some(data)) = (mime_type, data) {
                    if is_image_mime(mime_type) && is_base64(data) {
                        return DataValue::Blob { mime_type, data };
                    }
                }
            }
            Some(TRACEBACK_TYPE) => {
                return DataValue::Stack(parse_frames(fields.get("frames")));
            }
            _ => {}
        }

        DataValue::Record(
            fields
                .iter()
                .filter(|(key, _)| key.as_str() != TYPE_FIELD)
                .map(|(key, value)| (FieldKey::Name(key.clone()), value))
                .collect(),
        )
    }

    /// Name of the variant, for logging
    pub fn shape(&self) -> &'static str {
        match self {
            DataValue::Null => "null",
            DataValue::Bool(_) => "bool",
            DataValue::Number(_) => "number",
            DataValue::Text(_) => "text",
            DataValue::Blob { .. } => "blob",
            DataValue::Markup(_) => "markup",
            DataValue::Stack(_) => "stack",
            DataValue::Record(_) => "record",
            DataValue::Sequence(_) => "sequence",
        }
    }
}

pub fn is_image_mime(mime_type: &str) -> bool {
    IMAGE_MIME_TYPES.contains(&mime_type)
}

fn is_base64(data: &str) -> bool {
    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primitives() {
        assert_eq!(DataValue::classify(&Value::Null), DataValue::Null);
        assert_eq!(DataValue::classify(&json!(false)), DataValue::Bool(false));
        assert_eq!(DataValue::classify(&json!("hi")), DataValue::Text("hi"));
        assert_eq!(DataValue::classify(&json!(3)).shape(), "number");
        assert_eq!(DataValue::classify(&json!([1, 2])).shape(), "sequence");
    }

    #[test]
    fn test_markup_requires_html_field() {
        let value = json!({"_type": "$html", "html": "<b>x</b>"});
        assert_eq!(DataValue::classify(&value), DataValue::Markup("<b>x</b>"));

        let value = json!({"_type": "$html", "body": "<b>x</b>"});
        assert_eq!(DataValue::classify(&value).shape(), "record");
    }

    #[test]
    fn test_blob_mime_allow_list() {
        let png = json!({"_type": "$blob", "mime_type": "image/png", "data": "aGVsbG8="});
        assert_eq!(
            DataValue::classify(&png),
            DataValue::Blob {
                mime_type: "image/png",
                data: "aGVsbG8="
            }
        );

        let legacy = json!({"_type": "Blob", "mime_type": "image/jpeg", "data": "aGVsbG8="});
        assert_eq!(DataValue::classify(&legacy).shape(), "blob");

        let pdf = json!({"_type": "$blob", "mime_type": "application/pdf", "data": "aGVsbG8="});
        match DataValue::classify(&pdf) {
            DataValue::Record(fields) => {
                let keys: Vec<String> = fields.iter().map(|(k, _)| k.to_string()).collect();
                assert_eq!(keys, vec!["mime_type", "data"]);
            }
            other => panic!("expected record fallback, got {other:?}"),
        }
    }

    #[test]
    fn test_blob_with_corrupt_payload_falls_back() {
        let value = json!({"_type": "$blob", "mime_type": "image/png", "data": "not base64!"});
        assert_eq!(DataValue::classify(&value).shape(), "record");
    }

    #[test]
    fn test_traceback_frames() {
        let value = json!({"_type": "$traceback", "frames": [
            {"filename": "main.py", "lineno": 3, "name": "run", "line": "x = 1 / 0"},
            {"filename": "lib.py", "lineno": 10, "name": "helper", "line": null}
        ]});
        match DataValue::classify(&value) {
            DataValue::Stack(Some(frames)) => {
                assert_eq!(frames.len(), 2);
                assert_eq!(frames[0].line, "x = 1 / 0");
                assert_eq!(frames[1].line, "");
            }
            other => panic!("expected stack, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_traceback_is_still_a_stack() {
        for value in [
            json!({"_type": "$traceback"}),
            json!({"_type": "$traceback", "frames": []}),
            json!({"_type": "$traceback", "frames": "oops"}),
            json!({"_type": "$traceback", "frames": [{"filename": "a.py"}]}),
        ] {
            assert_eq!(DataValue::classify(&value), DataValue::Stack(None));
        }
    }

    #[test]
    fn test_unknown_discriminator_is_a_record() {
        let value = json!({"_type": "ValueError", "message": "bad"});
        match DataValue::classify(&value) {
            DataValue::Record(fields) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].0, FieldKey::Name("message".to_string()));
            }
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[test]
    fn test_path_segment_escaping() {
        assert_eq!(FieldKey::Name("a/b~c".to_string()).path_segment(), "a~1b~0c");
        assert_eq!(FieldKey::Index(4).path_segment(), "4");
    }
}
