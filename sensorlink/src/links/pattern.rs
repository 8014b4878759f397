use crate::array::codec::AT_IOT_NAVIGATION_LINK;
use crate::model::EntityType;
use serde_json::Value;
use std::collections::HashMap;

/// Marker closing a reference key, `sensor.Datastream@iot.id`.
pub const REFERENCE_MARKER: &str = "@iot.id";
/// Accepted short form, `sensor.Datastream@id`.
pub const SHORT_REFERENCE_MARKER: &str = "@id";

/// Result of matching a reference key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkMatch<'k> {
    pub local_name: &'k str,
    pub entity_type: EntityType,
}

/// `(local name, entity type, id)` recovered from a reference key and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkToken {
    pub local_name: String,
    pub entity_type: EntityType,
    pub id: Value,
}

impl LinkToken {
    /// `local.Type`, the key an expanded related entity would sit under.
    pub fn item_key(&self) -> String {
        format!("{}.{}", self.local_name, self.entity_type.entity_name())
    }

    /// `local.Type@iot.navigationLink`.
    pub fn navigation_link_key(&self) -> String {
        format!("{}{}", self.item_key(), AT_IOT_NAVIGATION_LINK)
    }
}

/// Recognizes `<local>.<EntityType>@iot.id` keys for a fixed set of entity types.
#[derive(Debug, Clone)]
pub struct LinkPattern {
    types: HashMap<&'static str, EntityType>,
}

impl Default for LinkPattern {
    fn default() -> Self {
        LinkPattern::new(EntityType::ALL)
    }
}

impl LinkPattern {
    pub fn new(types: impl IntoIterator<Item = EntityType>) -> Self {
        LinkPattern { types: types.into_iter().map(|t| (t.entity_name(), t)).collect() }
    }

    pub fn matches<'k>(&self, key: &'k str) -> Option<LinkMatch<'k>> {
        let stem = key
            .strip_suffix(REFERENCE_MARKER)
            .or_else(|| key.strip_suffix(SHORT_REFERENCE_MARKER))?;
        let (local_name, type_name) = stem.rsplit_once('.')?;
        if local_name.is_empty() || !local_name.chars().all(is_local_name_char) {
            return None;
        }
        let entity_type = *self.types.get(type_name)?;
        Some(LinkMatch { local_name, entity_type })
    }

    /// Only numeric and string values can reference an entity.
    pub fn token(&self, key: &str, value: &Value) -> Option<LinkToken> {
        if !matches!(value, Value::Number(_) | Value::String(_)) {
            return None;
        }
        self.matches(key).map(|m| LinkToken {
            local_name: m.local_name.to_string(),
            entity_type: m.entity_type,
            id: value.clone(),
        })
    }

    /// Entity type named by the last dot-separated segment of `name.Type`.
    pub fn type_for_custom_link_name(&self, name: &str) -> Option<EntityType> {
        let (_, last) = name.rsplit_once('.')?;
        self.types.get(last).copied()
    }
}

fn is_local_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matches_reference_keys() {
        let pattern = LinkPattern::default();
        let m = pattern.matches("sensor.Datastream@iot.id").unwrap();
        assert_eq!((m.local_name, m.entity_type), ("sensor", EntityType::Datastream));
        let m = pattern.matches("my.nested-name_1.Thing@id").unwrap();
        assert_eq!((m.local_name, m.entity_type), ("my.nested-name_1", EntityType::Thing));
    }

    #[test]
    fn rejects_near_misses() {
        let pattern = LinkPattern::default();
        for key in [
            "Datastream@iot.id",
            ".Datastream@iot.id",
            "sensor.datastream@iot.id",
            "sensor.Datastreams@iot.id",
            "sensor.Datastream@iot.idx",
            "sensor.Datastream@iot.navigationLink",
            "sensor.Datastream",
            "sen sor.Datastream@iot.id",
            "sensor/x.Datastream@iot.id",
            "sensor.Stream@iot.id",
        ] {
            assert!(pattern.matches(key).is_none(), "{} should not match", key);
        }
    }

    #[test]
    fn restricted_catalog_only_knows_its_types() {
        let pattern = LinkPattern::new([EntityType::Thing]);
        assert!(pattern.matches("a.Thing@iot.id").is_some());
        assert!(pattern.matches("a.Sensor@iot.id").is_none());
    }

    #[test]
    fn tokens_need_scalar_values() {
        let pattern = LinkPattern::default();
        let token = pattern.token("sensor.Datastream@iot.id", &json!(7)).unwrap();
        assert_eq!(token.item_key(), "sensor.Datastream");
        assert_eq!(token.navigation_link_key(), "sensor.Datastream@iot.navigationLink");
        assert!(pattern.token("sensor.Datastream@iot.id", &json!("x")).is_some());
        assert!(pattern.token("sensor.Datastream@iot.id", &json!([7])).is_none());
        assert!(pattern.token("sensor.Datastream@iot.id", &json!({"a": 1})).is_none());
        assert!(pattern.token("sensor.Datastream@iot.id", &json!(true)).is_none());
        assert!(pattern.token("sensor.Datastream@iot.id", &json!(null)).is_none());
    }

    #[test]
    fn custom_link_name_type_lookup() {
        let pattern = LinkPattern::default();
        assert_eq!(pattern.type_for_custom_link_name("parent.Thing"), Some(EntityType::Thing));
        assert_eq!(pattern.type_for_custom_link_name("a.b.Location"), Some(EntityType::Location));
        assert_eq!(pattern.type_for_custom_link_name("Thing"), None);
        assert_eq!(pattern.type_for_custom_link_name("parent.Unknown"), None);
    }
}
