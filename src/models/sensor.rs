use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Key under which a record's numeric index is published.
pub const ID_KEY: &str = "Id";

/// Value of a single store entry, passed through to JSON as read.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    Number(u64),
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<u32> for RawValue {
    fn from(value: u32) -> Self {
        RawValue::Number(value as u64)
    }
}

impl From<u64> for RawValue {
    fn from(value: u64) -> Self {
        RawValue::Number(value)
    }
}

/// A flat `(name, value)` pair as enumerated from a sensor store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub name: String,
    pub value: RawValue,
}

impl RawEntry {
    pub fn new(name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Parsed form of an entry name such as `Label12`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryKey {
    pub property: String,
    pub index: u32,
}

/// One sensor's properties, grouped by the numeric suffix of their entry names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorRecord {
    pub id: u32,
    pub properties: IndexMap<String, RawValue>,
}

impl SensorRecord {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            properties: IndexMap::new(),
        }
    }

    /// Sets `property`, replacing any earlier value in place.
    pub fn insert(&mut self, property: impl Into<String>, value: RawValue) {
        self.properties.insert(property.into(), value);
    }

    pub fn get(&self, property: &str) -> Option<&RawValue> {
        self.properties.get(property)
    }
}

// Serialized as a flat object: every property plus `Id`. A stored `Id`
// property is shadowed by the record id.
impl Serialize for SensorRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        for (property, value) in self.properties.iter().filter(|(k, _)| *k != ID_KEY) {
            map.serialize_entry(property, value)?;
        }
        map.serialize_entry(ID_KEY, &self.id)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_serializes_flat_with_id() {
        let mut record = SensorRecord::new(3);
        record.insert("Label", "CPU".into());
        record.insert("Temp", 45u32.into());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"Label": "CPU", "Temp": 45, "Id": 3}));
    }

    #[test]
    fn test_stored_id_property_is_shadowed() {
        let mut record = SensorRecord::new(7);
        record.insert("Id", "bogus".into());

        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(text, r#"{"Id":7}"#);
    }

    #[test]
    fn test_insert_keeps_last_value() {
        let mut record = SensorRecord::new(0);
        record.insert("Value", "1".into());
        record.insert("Value", "2".into());

        assert_eq!(record.properties.len(), 1);
        assert_eq!(record.get("Value"), Some(&RawValue::Text("2".to_string())));
    }
}
