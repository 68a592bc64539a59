//! # Key Mapper
//!
//! Renames the recording server's field names to the local schema's names.
//! Only four keys are renamed; everything else passes through untouched and
//! missing keys stay missing.

use serde_json::{Map, Value};

/// External field name → local field name
pub const KEY_MAP: [(&str, &str); 4] = [
    ("recordID", "recordid"),
    ("meetingID", "meetingid"),
    ("startTime", "start_time"),
    ("endTime", "end_time"),
];

/// Translate the external field names of a descriptor
///
/// ```
/// use core_sync::key_mapper::map_keys;
/// use serde_json::json;
///
/// let external = json!({ "recordID": "r-1", "name": "Weekly" });
/// let mapped = map_keys(external.as_object().unwrap().clone());
///
/// assert_eq!(mapped["recordid"], "r-1");
/// assert_eq!(mapped["name"], "Weekly");
/// assert!(!mapped.contains_key("recordID"));
/// ```
pub fn map_keys(external: Map<String, Value>) -> Map<String, Value> {
    external
        .into_iter()
        .map(|(key, value)| (internal_name(&key).map(str::to_string).unwrap_or(key), value))
        .collect()
}

fn internal_name(key: &str) -> Option<&'static str> {
    KEY_MAP
        .iter()
        .find(|(external, _)| *external == key)
        .map(|(_, internal)| *internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_renames_all_four_keys() {
        let mapped = map_keys(object(json!({
            "recordID": "r",
            "meetingID": "m",
            "startTime": 1,
            "endTime": 2,
        })));

        assert_eq!(
            Value::Object(mapped),
            json!({ "recordid": "r", "meetingid": "m", "start_time": 1, "end_time": 2 })
        );
    }

    #[test]
    fn test_other_keys_pass_through() {
        let mapped = map_keys(object(json!({
            "recordID": "r",
            "metadata": { "startTime": "nested keys are not renamed" },
            "size": 10,
        })));

        assert_eq!(mapped["metadata"]["startTime"], "nested keys are not renamed");
        assert_eq!(mapped["size"], 10);
    }

    #[test]
    fn test_missing_keys_are_not_defaulted() {
        let mapped = map_keys(object(json!({ "name": "only a name" })));
        assert_eq!(mapped.len(), 1);
        assert!(!mapped.contains_key("recordid"));
        assert!(!mapped.contains_key("start_time"));
    }
}
