//! Device model construction and validation.

use crate::parser::{parse_rows, ParameterRow};
use crate::ModelError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hierarchical path separator; object paths carry it as a trailing suffix.
const SEPARATOR: char = '.';

/// One entry of the device model.
///
/// The shape is fully determined by whether the path denotes an object
/// (internal node) or a leaf parameter; no other shape is valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterEntry {
    /// An internal node of the parameter tree.
    Object { writable: bool },

    /// A leaf parameter with an optional value and value type.
    Leaf {
        writable: bool,
        value: Option<String>,
        value_type: Option<String>,
    },
}

impl ParameterEntry {
    /// Whether this entry is an object node.
    pub fn is_object(&self) -> bool {
        matches!(self, ParameterEntry::Object { .. })
    }

    /// Whether the parameter is writable.
    pub fn writable(&self) -> bool {
        match self {
            ParameterEntry::Object { writable } => *writable,
            ParameterEntry::Leaf { writable, .. } => *writable,
        }
    }

    /// Leaf value, if any.
    pub fn value(&self) -> Option<&str> {
        match self {
            ParameterEntry::Object { .. } => None,
            ParameterEntry::Leaf { value, .. } => value.as_deref(),
        }
    }
}

/// Serialized entry shape for the pre-structured (JSON) model format.
#[derive(Debug, Serialize, Deserialize)]
struct RawEntry {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    object: bool,
    writable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    value_type: Option<String>,
}

impl From<RawEntry> for ParameterEntry {
    fn from(raw: RawEntry) -> Self {
        if raw.object {
            ParameterEntry::Object {
                writable: raw.writable,
            }
        } else {
            ParameterEntry::Leaf {
                writable: raw.writable,
                value: raw.value,
                value_type: raw.value_type,
            }
        }
    }
}

impl From<&ParameterEntry> for RawEntry {
    fn from(entry: &ParameterEntry) -> Self {
        match entry {
            ParameterEntry::Object { writable } => RawEntry {
                object: true,
                writable: *writable,
                value: None,
                value_type: None,
            },
            ParameterEntry::Leaf {
                writable,
                value,
                value_type,
            } => RawEntry {
                object: false,
                writable: *writable,
                value: value.clone(),
                value_type: value_type.clone(),
            },
        }
    }
}

/// The immutable parameter map of one simulated endpoint.
///
/// Built once per worker process and shared read-only by every worker in
/// that process; no writes occur after construction, so concurrent reads
/// need no synchronization. Keys are parameter paths; object paths are
/// suffixed with the separator to distinguish them from leaf paths sharing
/// a prefix. Iteration order is the insertion order of the source, and a
/// later row for the same path overwrites the earlier one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceModel {
    params: IndexMap<String, ParameterEntry>,
}

impl DeviceModel {
    /// Load a model file, dispatching on its extension.
    ///
    /// A `.csv` extension selects the tabular format; anything else is
    /// parsed as the pre-structured JSON format.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_tabular = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_tabular {
            Self::from_tabular(&text)
        } else {
            Self::from_json(&text)
        }
    }

    /// Build a model from tabular text (format A).
    pub fn from_tabular(input: &str) -> Result<Self, ModelError> {
        Self::from_rows(parse_rows(input)?)
    }

    /// Reduce an ordered row sequence into a validated model.
    ///
    /// Duplicate paths are last-write-wins by policy, not an error.
    pub fn from_rows(rows: Vec<ParameterRow>) -> Result<Self, ModelError> {
        let mut params = IndexMap::with_capacity(rows.len());
        for row in rows {
            let (key, entry) = if row.is_object {
                let key = if row.path.ends_with(SEPARATOR) {
                    row.path
                } else {
                    format!("{}{}", row.path, SEPARATOR)
                };
                (
                    key,
                    ParameterEntry::Object {
                        writable: row.writable,
                    },
                )
            } else {
                (
                    row.path,
                    ParameterEntry::Leaf {
                        writable: row.writable,
                        value: row.value,
                        value_type: row.value_type,
                    },
                )
            };
            params.insert(key, entry);
        }
        Self::validated(params)
    }

    /// Build a model from its pre-structured JSON serialization (format B).
    pub fn from_json(input: &str) -> Result<Self, ModelError> {
        let raw: IndexMap<String, RawEntry> = serde_json::from_str(input)?;
        let params = raw
            .into_iter()
            .map(|(key, entry)| (key, ParameterEntry::from(entry)))
            .collect();
        Self::validated(params)
    }

    /// Serialize back to the format-B JSON shape.
    pub fn to_json(&self) -> Result<String, ModelError> {
        let raw: IndexMap<&str, RawEntry> = self
            .params
            .iter()
            .map(|(key, entry)| (key.as_str(), RawEntry::from(entry)))
            .collect();
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    /// Validate the finished map: non-empty, and every entry's shape must
    /// agree with its path form (trailing separator if and only if the
    /// entry is an object).
    fn validated(params: IndexMap<String, ParameterEntry>) -> Result<Self, ModelError> {
        if params.is_empty() {
            return Err(ModelError::Empty);
        }
        for (path, entry) in &params {
            if path.ends_with(SEPARATOR) != entry.is_object() {
                return Err(ModelError::ShapeMismatch { path: path.clone() });
            }
        }
        Ok(Self { params })
    }

    /// Look up a parameter by its full path.
    pub fn get(&self, path: &str) -> Option<&ParameterEntry> {
        self.params.get(path)
    }

    /// Number of parameters in the model.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate over (path, entry) pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterEntry)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
Parameter,Object,Writable,Value,Value type
Device.,true,false,,
Device.DeviceInfo.,true,false,,
Device.DeviceInfo.Manufacturer,false,false,fleetsim,xsd:string
Device.DeviceInfo.UpTime,false,false,50,xsd:unsignedInt
";

    #[test]
    fn test_object_paths_get_separator_suffix() {
        let model = DeviceModel::from_tabular(SAMPLE).unwrap();
        assert!(model.get("Device.").unwrap().is_object());
        assert!(model.get("Device.DeviceInfo.").unwrap().is_object());
        assert_eq!(
            model.get("Device.DeviceInfo.Manufacturer").unwrap().value(),
            Some("fleetsim")
        );
    }

    #[test]
    fn test_parse_is_deterministic() {
        let a = DeviceModel::from_tabular(SAMPLE).unwrap();
        let b = DeviceModel::from_tabular(SAMPLE).unwrap();
        assert_eq!(a, b);
        let order_a: Vec<_> = a.iter().map(|(k, _)| k.to_string()).collect();
        let order_b: Vec<_> = b.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(order_a, order_b);
    }

    #[test]
    fn test_duplicate_path_last_write_wins() {
        let input = "\
Parameter,Object,Writable,Value,Value type
Device.X,false,true,first,xsd:string
Device.X,false,true,second,xsd:string
";
        let model = DeviceModel::from_tabular(input).unwrap();
        assert_eq!(model.len(), 1);
        assert_eq!(model.get("Device.X").unwrap().value(), Some("second"));
    }

    #[test]
    fn test_format_b_matches_format_a() {
        let json = r#"{
            "Device.": { "object": true, "writable": false },
            "Device.DeviceInfo.": { "object": true, "writable": false },
            "Device.DeviceInfo.Manufacturer": { "writable": false, "value": "fleetsim", "type": "xsd:string" },
            "Device.DeviceInfo.UpTime": { "writable": false, "value": "50", "type": "xsd:unsignedInt" }
        }"#;
        let from_a = DeviceModel::from_tabular(SAMPLE).unwrap();
        let from_b = DeviceModel::from_json(json).unwrap();
        assert_eq!(from_a, from_b);
    }

    #[test]
    fn test_json_round_trip() {
        let model = DeviceModel::from_tabular(SAMPLE).unwrap();
        let json = model.to_json().unwrap();
        assert_eq!(DeviceModel::from_json(&json).unwrap(), model);
    }

    #[test]
    fn test_empty_model_rejected() {
        let input = "Parameter,Object,Writable\n";
        assert!(matches!(
            DeviceModel::from_tabular(input),
            Err(ModelError::Empty)
        ));
    }

    #[test]
    fn test_shape_mismatch_in_json() {
        // Leaf-shaped entry under an object-form path.
        let json = r#"{ "Device.IP.": { "writable": true, "value": "x" } }"#;
        match DeviceModel::from_json(json).unwrap_err() {
            ModelError::ShapeMismatch { path } => assert_eq!(path, "Device.IP."),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();

        let csv_path = dir.path().join("model.csv");
        let mut f = std::fs::File::create(&csv_path).unwrap();
        f.write_all(SAMPLE.as_bytes()).unwrap();
        let from_csv = DeviceModel::load(&csv_path).unwrap();

        let json_path = dir.path().join("model.json");
        let mut f = std::fs::File::create(&json_path).unwrap();
        f.write_all(from_csv.to_json().unwrap().as_bytes()).unwrap();
        let from_json = DeviceModel::load(&json_path).unwrap();

        assert_eq!(from_csv, from_json);
    }

    #[test]
    fn test_load_missing_file() {
        let err = DeviceModel::load(Path::new("/nonexistent/model.csv")).unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }
}
