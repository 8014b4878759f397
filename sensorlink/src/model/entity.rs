use crate::model::entity_type::EntityType;
use crate::model::id::Id;
use crate::model::time::{TimeInstant, TimeInterval, TimeValue};
use serde::{Serialize, Serializer};
use serde::ser::SerializeMap;
use serde_json::{Map, Value};

/// Reference to a foreign entity by identifier alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub id: Id,
}

impl EntityRef {
    pub fn new(entity_type: EntityType, id: Id) -> Self {
        EntityRef { entity_type, id }
    }
}

impl Serialize for EntityRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("@iot.id", &self.id)?;
        map.end()
    }
}

/// Capability of entities that carry an open-ended property document.
pub trait PropertyBag {
    fn property_bag_mut(&mut self) -> Option<&mut Map<String, Value>>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(rename = "@iot.id", skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phenomenon_time: Option<TimeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_time: Option<TimeInstant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_quality: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_time: Option<TimeInterval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
    #[serde(rename = "FeatureOfInterest", skip_serializing_if = "Option::is_none")]
    pub feature_of_interest: Option<EntityRef>,
    #[serde(rename = "Datastream", skip_serializing_if = "Option::is_none")]
    pub datastream: Option<EntityRef>,
    #[serde(rename = "MultiDatastream", skip_serializing_if = "Option::is_none")]
    pub multi_datastream: Option<EntityRef>,
}

impl Observation {
    /// Links the observation to the stream it belongs to; other parent kinds are ignored.
    pub fn set_parent(&mut self, parent: EntityRef) {
        match parent.entity_type {
            EntityType::Datastream => self.datastream = Some(parent),
            EntityType::MultiDatastream => self.multi_datastream = Some(parent),
            _ => {}
        }
    }
}

impl PropertyBag for Observation {
    fn property_bag_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.parameters.as_mut()
    }
}

/// Any named kind (Thing, Datastream, Sensor, ...) with a `properties` document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedEntity {
    #[serde(skip)]
    pub entity_type: EntityType,
    #[serde(rename = "@iot.id", skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

impl NamedEntity {
    pub fn new(entity_type: EntityType, name: impl Into<String>) -> Self {
        NamedEntity { entity_type, id: None, name: name.into(), description: None, properties: None }
    }

    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = Some(properties);
        self
    }
}

impl PropertyBag for NamedEntity {
    fn property_bag_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.properties.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn observation_serializes_sparse_fields() {
        let mut obs = Observation { id: Some(Id::Long(1)), result: Some(json!(48)), ..Default::default() };
        obs.feature_of_interest = Some(EntityRef::new(EntityType::FeatureOfInterest, Id::Long(9)));
        let value = serde_json::to_value(&obs).unwrap();
        assert_eq!(value, json!({"@iot.id": 1, "result": 48, "FeatureOfInterest": {"@iot.id": 9}}));
    }

    #[test]
    fn set_parent_routes_by_stream_kind() {
        let mut obs = Observation::default();
        obs.set_parent(EntityRef::new(EntityType::MultiDatastream, Id::Long(3)));
        obs.set_parent(EntityRef::new(EntityType::Thing, Id::Long(4)));
        assert!(obs.datastream.is_none());
        assert_eq!(obs.multi_datastream.as_ref().map(|r| &r.id), Some(&Id::Long(3)));
    }

    #[test]
    fn property_bag_points_at_the_right_document() {
        let mut obs = Observation::default();
        assert!(obs.property_bag_mut().is_none());
        obs.parameters = Some(Map::new());
        assert!(obs.property_bag_mut().is_some());

        let mut thing = NamedEntity::new(EntityType::Thing, "weather station");
        assert!(thing.property_bag_mut().is_none());
        let mut props = Map::new();
        props.insert("height".into(), json!(12));
        thing = thing.with_properties(props);
        assert_eq!(thing.property_bag_mut().unwrap().get("height"), Some(&json!(12)));
    }
}
