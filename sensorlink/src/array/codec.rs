use crate::array::registry::{Handler, Registry, AT_IOT_ID};
use crate::error::AppError;
use crate::model::{EntityRef, EntityType, Id, Observation};
use crate::debug;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub const AT_IOT_COUNT: &str = "@iot.count";
pub const AT_IOT_NEXT_LINK: &str = "@iot.nextLink";
pub const AT_IOT_NAVIGATION_LINK: &str = "@iot.navigationLink";
pub const VALUE: &str = "value";
pub const COMPONENTS: &str = "components";
pub const DATA_ARRAY: &str = "dataArray";
pub const DATA_ARRAY_COUNT: &str = "dataArray@iot.count";

/// The entity a group of rows hangs off.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentRef {
    pub entity_type: EntityType,
    pub navigation_link: Option<String>,
    pub id: Option<Id>,
}

impl ParentRef {
    pub fn linked(entity_type: EntityType, navigation_link: impl Into<String>) -> Self {
        ParentRef { entity_type, navigation_link: Some(navigation_link.into()), id: None }
    }

    pub fn with_id(entity_type: EntityType, id: Id) -> Self {
        ParentRef { entity_type, navigation_link: None, id: Some(id) }
    }

    pub fn navigation_link_key(&self) -> String {
        format!("{}{}", self.entity_type.entity_name(), AT_IOT_NAVIGATION_LINK)
    }

    pub fn entity_ref(&self) -> Option<EntityRef> {
        self.id.clone().map(|id| EntityRef::new(self.entity_type, id))
    }
}

/// One parent's rows, positionally aligned with `components`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArrayValue {
    pub parent: ParentRef,
    pub components: Vec<String>,
    data_array: Vec<Vec<Value>>,
}

impl DataArrayValue {
    pub fn new(parent: ParentRef, components: Vec<String>) -> Self {
        DataArrayValue { parent, components, data_array: Vec::new() }
    }

    pub fn add_row(&mut self, row: Vec<Value>) -> Result<&mut Self, AppError> {
        if row.len() != self.components.len() {
            return Err(AppError::RowLength {
                group: 0,
                row: self.data_array.len(),
                expected: self.components.len(),
                actual: row.len(),
            });
        }
        self.data_array.push(row);
        Ok(self)
    }

    /// Builds rows by reading each component back out of the observations, in order.
    pub fn from_observations<'o, I>(parent: ParentRef, components: Vec<String>, observations: I, registry: &Registry) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = &'o Observation>,
    {
        let handlers = resolve_all(registry, &components)?;
        let data_array: Vec<Vec<Value>> = observations
            .into_iter()
            .map(|obs| handlers.iter().map(|h| h.extract(obs)).collect::<Vec<Value>>())
            .collect();
        Ok(DataArrayValue { parent, components, data_array })
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.data_array
    }

    pub fn row_count(&self) -> usize {
        self.data_array.len()
    }
}

impl Serialize for DataArrayValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(link) = &self.parent.navigation_link {
            map.serialize_entry(&self.parent.navigation_link_key(), link)?;
        } else if let Some(id) = &self.parent.id {
            let mut parent = Map::new();
            parent.insert(AT_IOT_ID.to_string(), id.to_json());
            map.serialize_entry(self.parent.entity_type.entity_name(), &parent)?;
        }
        map.serialize_entry(COMPONENTS, &self.components)?;
        map.serialize_entry(DATA_ARRAY_COUNT, &self.data_array.len())?;
        map.serialize_entry(DATA_ARRAY, &self.data_array)?;
        map.end()
    }
}

/// A page of groups. Groups are kept exactly as given, never merged or reordered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataArrayResult {
    pub count: Option<u64>,
    pub next_link: Option<String>,
    pub value: Vec<DataArrayValue>,
}

impl Serialize for DataArrayResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(count) = self.count {
            map.serialize_entry(AT_IOT_COUNT, &count)?;
        }
        if let Some(next_link) = &self.next_link {
            map.serialize_entry(AT_IOT_NEXT_LINK, next_link)?;
        }
        map.serialize_entry(VALUE, &self.value)?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGroup {
    pub parent: ParentRef,
    pub observations: Vec<Observation>,
}

pub struct ArrayCodec<'r> {
    registry: &'r Registry,
}

impl<'r> ArrayCodec<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        ArrayCodec { registry }
    }

    pub fn encode(&self, result: &DataArrayResult) -> Result<Value, AppError> {
        Ok(serde_json::to_value(result)?)
    }

    /// Parses the wire shape, either a paged object or a bare array of groups.
    /// Row lengths are not checked here, `decode` does that.
    pub fn read(&self, doc: &Value) -> Result<DataArrayResult, AppError> {
        match doc {
            Value::Array(groups) => Ok(DataArrayResult { count: None, next_link: None, value: self.read_groups(groups)? }),
            Value::Object(page) => {
                let count = match page.get(AT_IOT_COUNT) {
                    None | Some(Value::Null) => None,
                    Some(v) => Some(v.as_u64().ok_or_else(|| AppError::Malformed(format!("{} must be a non-negative integer", AT_IOT_COUNT)))?),
                };
                let next_link = match page.get(AT_IOT_NEXT_LINK) {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(_) => return Err(AppError::Malformed(format!("{} must be a string", AT_IOT_NEXT_LINK))),
                };
                let groups = page
                    .get(VALUE)
                    .and_then(Value::as_array)
                    .ok_or_else(|| AppError::Malformed(format!("missing {} array", VALUE)))?;
                Ok(DataArrayResult { count, next_link, value: self.read_groups(groups)? })
            }
            _ => Err(AppError::Malformed("expected an object or an array of groups".to_string())),
        }
    }

    fn read_groups(&self, groups: &[Value]) -> Result<Vec<DataArrayValue>, AppError> {
        groups.iter().enumerate().map(|(index, group)| self.read_group(index, group)).collect()
    }

    fn read_group(&self, index: usize, group: &Value) -> Result<DataArrayValue, AppError> {
        let group = group.as_object().ok_or_else(|| AppError::Malformed(format!("group {} is not an object", index)))?;
        let parent = self.read_parent(index, group)?;
        let components = group
            .get(COMPONENTS)
            .and_then(Value::as_array)
            .ok_or_else(|| AppError::Malformed(format!("group {} has no {} array", index, COMPONENTS)))?
            .iter()
            .map(|c| c.as_str().map(str::to_string).ok_or_else(|| AppError::Malformed(format!("group {} has a non-string component {}", index, c))))
            .collect::<Result<Vec<String>, AppError>>()?;
        let data_array = group
            .get(DATA_ARRAY)
            .and_then(Value::as_array)
            .ok_or_else(|| AppError::Malformed(format!("group {} has no {} array", index, DATA_ARRAY)))?
            .iter()
            .enumerate()
            .map(|(row, r)| r.as_array().cloned().ok_or_else(|| AppError::Malformed(format!("row {} of group {} is not an array", row, index))))
            .collect::<Result<Vec<Vec<Value>>, AppError>>()?;
        Ok(DataArrayValue { parent, components, data_array })
    }

    fn read_parent(&self, index: usize, group: &Map<String, Value>) -> Result<ParentRef, AppError> {
        let mut parent: Option<ParentRef> = None;
        for (key, value) in group {
            if let Some(type_name) = key.strip_suffix(AT_IOT_NAVIGATION_LINK) {
                if let (Some(entity_type), Some(link)) = (EntityType::from_name(type_name), value.as_str()) {
                    parent_of(index, &mut parent, entity_type)?.navigation_link = Some(link.to_string());
                }
            } else if let Some(entity_type) = EntityType::from_name(key) {
                if let Some(raw_id) = value.as_object().and_then(|o| o.get(AT_IOT_ID)) {
                    let id = self.registry.id_manager().parse_json_id(raw_id)?;
                    parent_of(index, &mut parent, entity_type)?.id = Some(id);
                }
            }
        }
        parent.ok_or_else(|| AppError::Malformed(format!("group {} has no parent reference", index)))
    }

    /// Turns every row into its own observation. The first error aborts the whole call.
    pub fn decode(&self, result: &DataArrayResult) -> Result<Vec<DecodedGroup>, AppError> {
        let groups = result
            .value
            .iter()
            .enumerate()
            .map(|(index, group)| self.decode_group(index, group))
            .collect::<Result<Vec<DecodedGroup>, AppError>>()?;
        debug!(
            "Decoded {} observations in {} groups",
            groups.iter().map(|g| g.observations.len()).sum::<usize>(),
            groups.len()
        );
        Ok(groups)
    }

    pub fn decode_json(&self, doc: &Value) -> Result<Vec<DecodedGroup>, AppError> {
        self.decode(&self.read(doc)?)
    }

    fn decode_group(&self, index: usize, group: &DataArrayValue) -> Result<DecodedGroup, AppError> {
        let expected = group.components.len();
        if let Some((row, r)) = group.data_array.iter().enumerate().find(|(_, r)| r.len() != expected) {
            return Err(AppError::RowLength { group: index, row, expected, actual: r.len() });
        }
        let handlers = resolve_all(self.registry, &group.components)?;
        let parent = group.parent.entity_ref();
        let observations = group
            .data_array
            .iter()
            .map(|row| -> Result<Observation, AppError> {
                let mut obs = Observation::default();
                for (handler, value) in handlers.iter().zip(row) {
                    handler.handle(value, &mut obs)?;
                }
                if let Some(parent) = &parent {
                    obs.set_parent(parent.clone());
                }
                Ok(obs)
            })
            .collect::<Result<Vec<Observation>, AppError>>()?;
        Ok(DecodedGroup { parent: group.parent.clone(), observations })
    }
}

/// A group hangs off exactly one parent, its link and id keys must agree on the type.
fn parent_of(index: usize, parent: &mut Option<ParentRef>, entity_type: EntityType) -> Result<&mut ParentRef, AppError> {
    let p = parent.get_or_insert(ParentRef { entity_type, navigation_link: None, id: None });
    if p.entity_type != entity_type {
        return Err(AppError::Malformed(format!(
            "group {} references both {} and {} as parent",
            index, p.entity_type, entity_type
        )));
    }
    Ok(p)
}

fn resolve_all<'r>(registry: &'r Registry, components: &[String]) -> Result<Vec<Handler<'r>>, AppError> {
    components
        .iter()
        .map(|c| registry.resolve(c).ok_or_else(|| AppError::UnknownComponent(c.clone())))
        .collect()
}
