//! Typed record collections.
//!
//! Upstream records are loosely shaped JSON objects. They are read once into
//! `Record`/`Value` so the compiler never indexes untyped maps; date and time
//! values are carried as `Value::Text` exactly as the source formatted them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Number};

// ============================================================================
// Value
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Embedded child records (a `Table` field's rows).
    Table(Vec<Record>),
    /// Any other JSON shape, passed through untouched.
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Table(rows) => {
                serde_json::Value::Array(rows.iter().map(Record::to_json).collect())
            }
            Value::Json(v) => v.clone(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n
                    .as_f64()
                    .map(Value::Float)
                    .unwrap_or(Value::Json(serde_json::Value::Number(n))),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) if items.iter().all(|v| v.is_object()) => {
                Value::Table(
                    items
                        .into_iter()
                        .filter_map(|v| match v {
                            serde_json::Value::Object(map) => Some(Record::from_map(map)),
                            _ => None,
                        })
                        .collect(),
                )
            }
            other => Value::Json(other),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        value.to_json()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// ============================================================================
// Record
// ============================================================================

/// One upstream record: identity, creation stamp and remaining fields in
/// source order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub struct Record {
    pub name: Option<String>,
    pub creation: Option<String>,
    pub fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn with_creation(mut self, creation: &str) -> Self {
        self.creation = Some(creation.to_string());
        self
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn from_map(mut map: Map<String, serde_json::Value>) -> Self {
        let name = match map.remove("name") {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let creation = match map.remove("creation") {
            Some(serde_json::Value::String(s)) => Some(s),
            _ => None,
        };
        let fields = map.into_iter().map(|(k, v)| (k, Value::from(v))).collect();
        Self {
            name,
            creation,
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Value of `field`, including the `name` and `creation` columns. Absent
    /// fields read as `Null`.
    pub fn value_of(&self, field: &str) -> Value {
        let text = |v: &Option<String>| v.clone().map(Value::Text).unwrap_or_default();
        match field {
            "name" => text(&self.name),
            "creation" => text(&self.creation),
            _ => self.fields.get(field).cloned().unwrap_or_default(),
        }
    }

    /// Embedded rows under `field`; empty when missing or not a table.
    pub fn table(&self, field: &str) -> &[Record] {
        match self.fields.get(field) {
            Some(Value::Table(rows)) => rows,
            _ => &[],
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut map = Map::new();
        if let Some(name) = &self.name {
            map.insert("name".into(), name.clone().into());
        }
        if let Some(creation) = &self.creation {
            map.insert("creation".into(), creation.clone().into());
        }
        for (k, v) in &self.fields {
            map.insert(k.clone(), v.to_json());
        }
        serde_json::Value::Object(map)
    }
}

impl TryFrom<serde_json::Value> for Record {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Object(map) => Ok(Record::from_map(map)),
            other => Err(format!("expected a record object, found {other}")),
        }
    }
}

impl From<Record> for serde_json::Value {
    fn from(record: Record) -> Self {
        record.to_json()
    }
}

// ============================================================================
// RecordStore
// ============================================================================

/// Entity-type name → records, in the order the source delivered them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct RecordStore {
    collections: IndexMap<String, Vec<Record>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: impl Into<String>, records: Vec<Record>) {
        self.collections.insert(entity.into(), records);
    }

    pub fn extend(&mut self, entity: &str, records: impl IntoIterator<Item = Record>) {
        self.collections
            .entry(entity.to_string())
            .or_default()
            .extend(records);
    }

    pub fn with(mut self, entity: &str, records: Vec<Record>) -> Self {
        self.insert(entity, records);
        self
    }

    /// Records for `entity`; empty when the source delivered none.
    pub fn get(&self, entity: &str) -> &[Record] {
        self.collections.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.collections.contains_key(entity)
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> + '_ {
        self.collections.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }
}

fn records_from(entity: &str, value: serde_json::Value) -> Result<Vec<Record>, String> {
    match value {
        serde_json::Value::Array(items) => items.into_iter().map(Record::try_from).collect(),
        serde_json::Value::Null => Ok(Vec::new()),
        other => Err(format!("records for `{entity}` must be an array, found {other}")),
    }
}

impl TryFrom<serde_json::Value> for RecordStore {
    type Error = String;

    /// Accepts `{entity: [records]}` or `[{entity: [records]}, ...]`; repeated
    /// entities in the list form are concatenated.
    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let mut store = RecordStore::new();
        match value {
            serde_json::Value::Object(map) => {
                for (entity, records) in map {
                    let records = records_from(&entity, records)?;
                    store.extend(&entity, records);
                }
            }
            serde_json::Value::Array(chunks) => {
                for chunk in chunks {
                    let serde_json::Value::Object(map) = chunk else {
                        return Err("record store chunks must be objects".to_string());
                    };
                    for (entity, records) in map {
                        let records = records_from(&entity, records)?;
                        store.extend(&entity, records);
                    }
                }
            }
            other => return Err(format!("expected a record store, found {other}")),
        }
        Ok(store)
    }
}

impl Serialize for RecordStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.collections.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_splits_identity_from_fields() {
        let record: Record = serde_json::from_value(json!({
            "name": "CT-001",
            "creation": "2024-03-01 10:00:00.000000",
            "amount": 1500.5,
            "qty": 3,
            "posting_date": "2024-03-01",
            "items": [{"name": "I-1", "qty": 2}]
        }))
        .unwrap();

        assert_eq!(record.name.as_deref(), Some("CT-001"));
        assert_eq!(record.value_of("qty"), Value::Int(3));
        assert_eq!(record.value_of("amount"), Value::Float(1500.5));
        assert_eq!(record.value_of("posting_date"), Value::Text("2024-03-01".into()));
        assert_eq!(record.value_of("missing"), Value::Null);
        assert_eq!(record.table("items").len(), 1);
        assert_eq!(record.table("qty").len(), 0);
        assert!(!record.fields.contains_key("name"));
    }

    #[test]
    fn mixed_arrays_stay_opaque() {
        let value = Value::from(json!([1, {"a": 2}]));
        assert!(matches!(value, Value::Json(_)));

        let empty = Value::from(json!([]));
        assert_eq!(empty, Value::Table(vec![]));
    }

    #[test]
    fn non_finite_floats_render_as_null() {
        assert_eq!(Value::Float(f64::NAN).to_json(), serde_json::Value::Null);
    }

    #[test]
    fn store_accepts_list_of_chunks() {
        let store: RecordStore = serde_json::from_value(json!([
            {"Contract": [{"name": "A"}]},
            {"Contract Item": [{"name": "I"}]},
            {"Contract": [{"name": "B"}]}
        ]))
        .unwrap();

        let names: Vec<_> = store
            .get("Contract")
            .iter()
            .filter_map(|r| r.name.as_deref())
            .collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(store.get("Unknown").len(), 0);
        assert_eq!(store.record_count(), 3);
    }

    #[test]
    fn record_json_keeps_field_order() {
        let record = Record::new("X").with("b", 1i64).with("a", "t");
        let rendered = serde_json::to_string(&record).unwrap();
        assert_eq!(rendered, r#"{"name":"X","b":1,"a":"t"}"#);
    }
}
