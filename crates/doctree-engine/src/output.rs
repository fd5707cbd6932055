//! Compiled engine document and its JSON rendering.
//!
//! Two keys vary between consumers: the key nesting child heads inside an
//! item (`childs` or `data`) and the top-level data key (`data` or `dados`).
//! Everything else is fixed.

use std::fmt;
use std::str::FromStr;

use doctree_catalog::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};

#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub path: String,
    pub field_type: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaUpdate {
    pub doctype: String,
    pub fieldname: String,
}

/// A formula anchored at the path of the field it updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaRef {
    pub path: String,
    pub value: String,
    pub update: FormulaUpdate,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineItem {
    pub id: Option<String>,
    pub creation: Option<String>,
    pub fields: Vec<FieldValue>,
    pub children: Vec<EngineHead>,
}

impl EngineItem {
    pub fn is_placeholder(&self) -> bool {
        self.id.is_none() && self.creation.is_none()
    }
}

/// One entity node visit: its formulas and one item per record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineHead {
    pub path: String,
    pub formulas: Vec<FormulaRef>,
    pub data: Vec<EngineItem>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledDocument {
    /// Code → path, in code order.
    pub references: IndexMap<String, String>,
    pub data: Vec<EngineHead>,
}

// ============================================================================
// Output keys
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildKey {
    #[default]
    Childs,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKey {
    #[default]
    Data,
    Dados,
}

impl ChildKey {
    pub fn as_str(self) -> &'static str {
        match self {
            ChildKey::Childs => "childs",
            ChildKey::Data => "data",
        }
    }
}

impl DocumentKey {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKey::Data => "data",
            DocumentKey::Dados => "dados",
        }
    }
}

impl FromStr for ChildKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "childs" => Ok(ChildKey::Childs),
            "data" => Ok(ChildKey::Data),
            other => Err(format!("unknown children key `{other}` (expected childs or data)")),
        }
    }
}

impl FromStr for DocumentKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data" => Ok(DocumentKey::Data),
            "dados" => Ok(DocumentKey::Dados),
            other => Err(format!("unknown document key `{other}` (expected data or dados)")),
        }
    }
}

impl fmt::Display for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputKeys {
    #[serde(default)]
    pub children: ChildKey,
    #[serde(default)]
    pub document: DocumentKey,
}

// ============================================================================
// JSON rendering
// ============================================================================

impl FieldValue {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "path": self.path,
            "type": self.field_type,
            "value": self.value.to_json(),
        })
    }
}

impl EngineItem {
    pub fn to_json(&self, keys: OutputKeys) -> serde_json::Value {
        let mut map = Map::new();
        map.insert("id".into(), json!(self.id));
        map.insert("creation".into(), json!(self.creation));
        map.insert(
            "fields".into(),
            self.fields.iter().map(FieldValue::to_json).collect(),
        );
        map.insert(
            keys.children.as_str().into(),
            self.children.iter().map(|h| h.to_json(keys)).collect(),
        );
        serde_json::Value::Object(map)
    }
}

impl EngineHead {
    pub fn to_json(&self, keys: OutputKeys) -> serde_json::Value {
        json!({
            "path": self.path,
            "formulas": self.formulas,
            "data": self.data.iter().map(|i| i.to_json(keys)).collect::<Vec<_>>(),
        })
    }

    /// Heads in document order, this one first.
    pub fn walk(&self) -> Vec<&EngineHead> {
        let mut out = vec![self];
        let mut i = 0;
        while i < out.len() {
            let head = out[i];
            for item in &head.data {
                out.extend(item.children.iter());
            }
            i += 1;
        }
        out
    }
}

impl CompiledDocument {
    pub fn to_json(&self, keys: OutputKeys) -> serde_json::Value {
        let mut map = Map::new();
        map.insert("referencia".into(), json!(self.references));
        map.insert(
            keys.document.as_str().into(),
            self.data.iter().map(|h| h.to_json(keys)).collect(),
        );
        serde_json::Value::Object(map)
    }

    pub fn head_count(&self) -> usize {
        self.data.iter().map(|h| h.walk().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head() -> EngineHead {
        EngineHead {
            path: "e00001v".into(),
            formulas: vec![FormulaRef {
                path: "e00003v".into(),
                value: "e00002v * 2".into(),
                update: FormulaUpdate {
                    doctype: "Contract".into(),
                    fieldname: "total".into(),
                },
            }],
            data: vec![EngineItem {
                id: Some("CT-1".into()),
                creation: None,
                fields: vec![FieldValue {
                    path: "e00002v".into(),
                    field_type: "numeric".into(),
                    value: Value::Int(10),
                }],
                children: vec![EngineHead {
                    path: "e00004v".into(),
                    ..EngineHead::default()
                }],
            }],
        }
    }

    #[test]
    fn children_key_is_configurable() {
        let keys = OutputKeys {
            children: ChildKey::Data,
            document: DocumentKey::Dados,
        };
        let doc = CompiledDocument {
            references: IndexMap::from([("e00001v".to_string(), "contract".to_string())]),
            data: vec![head()],
        };
        let json = doc.to_json(keys);

        assert_eq!(json["referencia"]["e00001v"], "contract");
        let item = &json["dados"][0]["data"][0];
        assert_eq!(item["id"], "CT-1");
        assert_eq!(item["creation"], serde_json::Value::Null);
        assert_eq!(item["fields"][0]["type"], "numeric");
        assert_eq!(item["data"][0]["path"], "e00004v");
        assert!(item.get("childs").is_none());
    }

    #[test]
    fn default_keys_are_childs_and_data() {
        let json = head().to_json(OutputKeys::default());
        let item = &json["data"][0];
        assert_eq!(item["childs"][0]["path"], "e00004v");
        assert_eq!(json["formulas"][0]["update"]["fieldname"], "total");
    }

    #[test]
    fn keys_parse_from_text() {
        assert_eq!("data".parse::<ChildKey>(), Ok(ChildKey::Data));
        assert_eq!("dados".parse::<DocumentKey>(), Ok(DocumentKey::Dados));
        assert!("children".parse::<ChildKey>().is_err());
    }

    #[test]
    fn walk_visits_nested_heads() {
        assert_eq!(head().walk().len(), 2);
    }
}
