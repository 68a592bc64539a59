//! # Recording Payload
//!
//! Typed view of one key-mapped recording descriptor.
//!
//! Recording servers are loose about JSON types, so decoding is lenient:
//! numbers may arrive as strings, `published` as `"true"`, metadata contents
//! as any scalar, and `playback.format` as either one object or a list.
//! Keys this type does not know are kept in [`RecordingPayload::extra`].

use crate::{Result, SyncError};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One key-mapped recording descriptor
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecordingPayload {
    /// String or number; any other type fails the descriptor
    #[serde(default, deserialize_with = "record_key")]
    pub recordid: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub meetingid: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient_bool")]
    pub published: Option<bool>,

    #[serde(default, deserialize_with = "lenient_i64")]
    pub start_time: Option<i64>,

    #[serde(default, deserialize_with = "lenient_i64")]
    pub end_time: Option<i64>,

    /// Size in bytes
    #[serde(default, deserialize_with = "lenient_i64")]
    pub size: Option<i64>,

    /// Desired metadata set; `None` leaves stored metadata untouched
    #[serde(default, deserialize_with = "metadata_map")]
    pub metadata: Option<BTreeMap<String, String>>,

    /// Desired playback formats; `None` leaves stored formats untouched
    #[serde(default, deserialize_with = "playback_formats")]
    pub playback: Option<Vec<PlaybackFormatPayload>>,

    /// Every other key of the descriptor
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One desired playback variant
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackFormatPayload {
    /// Playback type identifier ("presentation", "video", ...)
    pub format_type: String,
    pub url: String,
    /// Duration in minutes
    pub length: f64,
}

impl RecordingPayload {
    /// Decode a key-mapped descriptor
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidPayload`] when a known field carries a
    /// value that cannot be interpreted.
    pub fn from_map(mapped: Map<String, Value>) -> Result<Self> {
        let record_id = mapped
            .get("recordid")
            .map(scalar_to_string)
            .unwrap_or_default();

        serde_json::from_value(Value::Object(mapped)).map_err(|e| SyncError::InvalidPayload {
            record_id,
            message: e.to_string(),
        })
    }

    /// The record id, trimmed and non-empty
    pub fn record_id(&self) -> Option<&str> {
        self.recordid
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Record id of a key-mapped descriptor, read without decoding the rest
///
/// Used to account for descriptors whose other fields fail to decode.
/// Accepts exactly the ids [`RecordingPayload::record_id`] can yield, so a
/// descriptor that reconciles is always in the seen set.
pub fn descriptor_record_id(mapped: &Map<String, Value>) -> Option<String> {
    mapped
        .get("recordid")
        .and_then(record_key_of)
        .filter(|id| !id.is_empty())
}

fn record_key_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn record_key<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        other => record_key_of(&other)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected a string or number id, got {}", other))),
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(de::Error::custom(format!("expected a string, got {}", other))),
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b)),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(Some(false)),
            Some(1) => Ok(Some(true)),
            _ => Err(de::Error::custom(format!("expected a boolean, got {}", n))),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            _ => Err(de::Error::custom(format!("expected a boolean, got {:?}", s))),
        },
        other => Err(de::Error::custom(format!("expected a boolean, got {}", other))),
    }
}

fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected an integer, got {}", n))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected an integer, got {:?}", s))),
        other => Err(de::Error::custom(format!("expected an integer, got {}", other))),
    }
}

fn lenient_f64(value: &Value) -> std::result::Result<f64, String> {
    match value {
        Value::Null => Ok(0.0),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("expected a number, got {}", n)),
        Value::String(s) if s.trim().is_empty() => Ok(0.0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("expected a number, got {:?}", s)),
        other => Err(format!("expected a number, got {}", other)),
    }
}

fn metadata_map<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<BTreeMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Object(entries) => Ok(Some(
            entries
                .into_iter()
                .map(|(name, content)| (name, scalar_to_string(&content)))
                .collect(),
        )),
        other => Err(de::Error::custom(format!(
            "metadata must be an object, got {}",
            other
        ))),
    }
}

fn playback_formats<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Vec<PlaybackFormatPayload>>, D::Error>
where
    D: Deserializer<'de>,
{
    let playback = match Value::deserialize(deserializer)? {
        Value::Null => return Ok(None),
        Value::Object(playback) => playback,
        other => {
            return Err(de::Error::custom(format!(
                "playback must be an object, got {}",
                other
            )))
        }
    };

    let formats = match playback.get("format") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
    };

    formats
        .into_iter()
        .map(playback_format)
        .collect::<std::result::Result<Vec<_>, String>>()
        .map(Some)
        .map_err(de::Error::custom)
}

fn playback_format(value: &Value) -> std::result::Result<PlaybackFormatPayload, String> {
    let format = value
        .as_object()
        .ok_or_else(|| format!("playback format must be an object, got {}", value))?;

    let format_type = format
        .get("type")
        .map(scalar_to_string)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| "playback format has no type".to_string())?;

    let url = format.get("url").map(scalar_to_string).unwrap_or_default();
    let length = format.get("length").map(lenient_f64).transpose()?.unwrap_or(0.0);

    Ok(PlaybackFormatPayload {
        format_type,
        url,
        length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> Result<RecordingPayload> {
        RecordingPayload::from_map(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_decodes_typed_fields() {
        let payload = decode(json!({
            "recordid": "r-1",
            "meetingid": "m-1",
            "name": "Weekly",
            "published": true,
            "start_time": 1000,
            "end_time": "2000",
            "size": 4096,
        }))
        .unwrap();

        assert_eq!(payload.record_id(), Some("r-1"));
        assert_eq!(payload.meetingid.as_deref(), Some("m-1"));
        assert_eq!(payload.published, Some(true));
        assert_eq!(payload.start_time, Some(1000));
        assert_eq!(payload.end_time, Some(2000));
        assert_eq!(payload.size, Some(4096));
        assert!(payload.metadata.is_none());
        assert!(payload.playback.is_none());
        assert!(payload.extra.is_empty());
    }

    #[test]
    fn test_lenient_scalars() {
        let payload = decode(json!({
            "recordid": 42,
            "published": "false",
            "size": "",
            "metadata": { "count": 3, "flag": true, "title": "T" },
        }))
        .unwrap();

        assert_eq!(payload.record_id(), Some("42"));
        assert_eq!(payload.published, Some(false));
        assert_eq!(payload.size, None);

        let metadata = payload.metadata.unwrap();
        assert_eq!(metadata["count"], "3");
        assert_eq!(metadata["flag"], "true");
        assert_eq!(metadata["title"], "T");
    }

    #[test]
    fn test_playback_single_object_or_list() {
        let single = decode(json!({
            "recordid": "r",
            "playback": { "format": { "type": "presentation", "url": "https://p", "length": 12 } },
        }))
        .unwrap();
        let formats = single.playback.unwrap();
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].format_type, "presentation");
        assert_eq!(formats[0].length, 12.0);

        let list = decode(json!({
            "recordid": "r",
            "playback": { "format": [
                { "type": "presentation", "url": "https://p", "length": "2.5" },
                { "type": "video", "url": "https://v" },
            ] },
        }))
        .unwrap();
        let formats = list.playback.unwrap();
        assert_eq!(formats.len(), 2);
        assert_eq!(formats[0].length, 2.5);
        assert_eq!(formats[1].length, 0.0);
    }

    #[test]
    fn test_playback_without_format_is_empty_set() {
        let payload = decode(json!({ "recordid": "r", "playback": {} })).unwrap();
        assert_eq!(payload.playback, Some(Vec::new()));
    }

    #[test]
    fn test_unknown_keys_are_kept() {
        let payload = decode(json!({ "recordid": "r", "state": "processed", "rawSize": 9 })).unwrap();
        assert_eq!(payload.extra["state"], "processed");
        assert_eq!(payload.extra["rawSize"], 9);
    }

    #[test]
    fn test_invalid_values_name_the_record() {
        let err = decode(json!({ "recordid": "r-9", "start_time": "yesterday" })).unwrap_err();
        assert!(matches!(err, SyncError::InvalidPayload { ref record_id, .. } if record_id == "r-9"));

        let err = decode(json!({ "recordid": "r-9", "playback": { "format": { "url": "x" } } }))
            .unwrap_err();
        assert!(err.to_string().contains("no type"));
    }

    #[test]
    fn test_blank_record_id_is_missing() {
        let payload = decode(json!({ "recordid": "   " })).unwrap();
        assert_eq!(payload.record_id(), None);
    }

    #[test]
    fn test_descriptor_record_id_survives_bad_fields() {
        let mapped = json!({ "recordid": " r-9 ", "size": [1] });
        let mapped = mapped.as_object().unwrap();
        assert_eq!(descriptor_record_id(mapped).as_deref(), Some("r-9"));

        let numeric = json!({ "recordid": 42 });
        assert_eq!(descriptor_record_id(numeric.as_object().unwrap()).as_deref(), Some("42"));

        let blank = json!({ "recordid": "" });
        assert!(descriptor_record_id(blank.as_object().unwrap()).is_none());
    }

    #[test]
    fn test_boolean_record_id_is_rejected() {
        let mapped = json!({ "recordid": true, "name": "flagged" });
        assert!(descriptor_record_id(mapped.as_object().unwrap()).is_none());

        let err = decode(mapped).unwrap_err();
        assert!(matches!(err, SyncError::InvalidPayload { .. }));
    }
}
